//! Cache keys.
//!
//! A key is the resource kind plus the parameters that identify one upstream
//! response. Posts pages carry the pagination cursor; the first page is
//! always keyed without one, whatever spelling the caller used for it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::hash::compute_cache_key;

/// Subject used by the reserved diagnostic key.
const DIAGNOSTIC_SUBJECT: &str = "connection-test";

/// The kind of upstream resource a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// `user/info` response for a username.
    Profile,
    /// One `user/posts` page for a username and cursor.
    VideoPage,
    /// `video/info` response for a video id.
    VideoDetail,
    /// Reserved for the cache connection self-test. Never fetched upstream.
    Diagnostic,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::VideoPage => "videos",
            ResourceKind::VideoDetail => "video",
            ResourceKind::Diagnostic => "diagnostic",
        }
    }

    /// Inverse of [`ResourceKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(ResourceKind::Profile),
            "videos" => Some(ResourceKind::VideoPage),
            "video" => Some(ResourceKind::VideoDetail),
            "diagnostic" => Some(ResourceKind::Diagnostic),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalize a caller-supplied cursor.
///
/// `None`, `""` and `"0"` all mean "first page" and map to `None`. Any other
/// token is passed through byte for byte.
pub fn normalize_cursor(cursor: Option<&str>) -> Option<String> {
    match cursor {
        None | Some("") | Some("0") => None,
        Some(token) => Some(token.to_string()),
    }
}

/// Identity of one cached upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    kind: ResourceKind,
    subject: String,
    cursor: Option<String>,
}

impl CacheKey {
    pub fn profile(username: impl Into<String>) -> Self {
        Self { kind: ResourceKind::Profile, subject: username.into(), cursor: None }
    }

    pub fn video_page(username: impl Into<String>, cursor: Option<&str>) -> Self {
        Self { kind: ResourceKind::VideoPage, subject: username.into(), cursor: normalize_cursor(cursor) }
    }

    pub fn video_detail(video_id: impl Into<String>) -> Self {
        Self { kind: ResourceKind::VideoDetail, subject: video_id.into(), cursor: None }
    }

    /// The reserved key used by the cache connection self-test.
    pub fn diagnostic() -> Self {
        Self { kind: ResourceKind::Diagnostic, subject: DIAGNOSTIC_SUBJECT.to_string(), cursor: None }
    }

    /// Rebuild a key from its stored parts.
    pub fn from_parts(kind: ResourceKind, subject: String, cursor: Option<String>) -> Self {
        let cursor = match kind {
            ResourceKind::VideoPage => normalize_cursor(cursor.as_deref()),
            _ => None,
        };
        Self { kind, subject, cursor }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Username for profile and video-page keys, video id for video-detail keys.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_first_page(&self) -> bool {
        self.kind == ResourceKind::VideoPage && self.cursor.is_none()
    }

    /// SHA-256 hex digest used as the SQLite primary key.
    pub fn digest(&self) -> String {
        compute_cache_key(self.kind.as_str(), &self.subject, self.cursor.as_deref())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cursor {
            Some(cursor) => write!(f, "{}:{}:{}", self.kind, self.subject, cursor),
            None => write!(f, "{}:{}", self.kind, self.subject),
        }
    }
}
