//! Upstream request types.

use reelcache_core::{CacheKey, ResourceKind};

/// One logical upstream operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRequest {
    /// `GET /user/info?unique_id=…`
    UserInfo { username: String },
    /// `GET /user/posts?unique_id=…&count=…[&cursor=…]`
    UserPosts { username: String, cursor: Option<String>, count: u8 },
    /// `GET /video/info?video_id=…`
    VideoInfo { video_id: String },
}

impl UpstreamRequest {
    /// The request that fills the cache entry for `key`.
    ///
    /// Returns `None` for the diagnostic key, which is never fetched.
    pub fn for_key(key: &CacheKey, page_size: u8) -> Option<Self> {
        match key.kind() {
            ResourceKind::Profile => Some(UpstreamRequest::UserInfo { username: key.subject().to_string() }),
            ResourceKind::VideoPage => Some(UpstreamRequest::UserPosts {
                username: key.subject().to_string(),
                cursor: key.cursor().map(str::to_string),
                count: page_size,
            }),
            ResourceKind::VideoDetail => Some(UpstreamRequest::VideoInfo { video_id: key.subject().to_string() }),
            ResourceKind::Diagnostic => None,
        }
    }

    /// Short operation name for diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            UpstreamRequest::UserInfo { .. } => "user_info",
            UpstreamRequest::UserPosts { .. } => "user_posts",
            UpstreamRequest::VideoInfo { .. } => "video_info",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            UpstreamRequest::UserInfo { .. } => "/user/info",
            UpstreamRequest::UserPosts { .. } => "/user/posts",
            UpstreamRequest::VideoInfo { .. } => "/video/info",
        }
    }

    /// Username or video id the request is about.
    pub fn subject(&self) -> &str {
        match self {
            UpstreamRequest::UserInfo { username } | UpstreamRequest::UserPosts { username, .. } => username,
            UpstreamRequest::VideoInfo { video_id } => video_id,
        }
    }

    /// Query parameters. A first-page posts request carries no cursor.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            UpstreamRequest::UserInfo { username } => vec![("unique_id", username.clone())],
            UpstreamRequest::UserPosts { username, cursor, count } => {
                let mut query = vec![("unique_id", username.clone()), ("count", count.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("cursor", cursor.clone()));
                }
                query
            }
            UpstreamRequest::VideoInfo { video_id } => vec![("video_id", video_id.clone())],
        }
    }
}
