use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{CommentError, GatewayError};
use crate::gateway::RemoteDataGateway;
use crate::models::{Comment, LikeState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentCacheEntry {
    pub comments: Vec<Comment>,
    pub loading: bool,
    pub error: Option<String>,
    /// `None` until the first successful fetch, and again after a failed one.
    pub last_fetched_at: Option<Instant>,
}

impl CommentCacheEntry {
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        self.last_fetched_at
            .is_some_and(|fetched| now.saturating_duration_since(fetched) < ttl)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CommentCacheEntry>,
    // Loads still waiting on the gateway, per post. `loading` is true while non-zero.
    in_flight: HashMap<String, u32>,
    // Bumped by clear() so requests started before a logout cannot write back.
    epoch: u64,
}

/// Per-post comment lists with time-based freshness.
///
/// Concurrent loads of the same post are not coalesced; each one hits the
/// gateway and the last to finish wins. An entry reports `loading` until all
/// of them have completed.
pub struct CommentCache {
    gateway: Arc<dyn RemoteDataGateway>,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl CommentCache {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub async fn load(&self, post_id: &str, force_refresh: bool) -> Result<Vec<Comment>, CommentError> {
        let epoch = {
            let mut state = self.state.write().await;
            let epoch = state.epoch;
            let entry = state.entries.entry(post_id.to_string()).or_default();
            if !force_refresh && entry.is_fresh(self.ttl, Instant::now()) {
                debug!(%post_id, "comment cache hit");
                return Ok(entry.comments.clone());
            }
            entry.loading = true;
            *state.in_flight.entry(post_id.to_string()).or_default() += 1;
            epoch
        };

        let fetched = self.fetch(post_id).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(%post_id, "cache cleared during load, dropping result");
            return fetched.map_err(CommentError::from);
        }
        let remaining = match state.in_flight.get_mut(post_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            state.in_flight.remove(post_id);
        }
        let entry = state.entries.entry(post_id.to_string()).or_default();
        entry.loading = remaining > 0;
        match fetched {
            Ok(comments) => {
                debug!(%post_id, count = comments.len(), "comments loaded");
                entry.comments = comments.clone();
                entry.error = None;
                entry.last_fetched_at = Some(Instant::now());
                Ok(comments)
            }
            Err(e) => {
                warn!(%post_id, error = %e, "failed to load comments");
                entry.error = Some(e.to_string());
                entry.last_fetched_at = None;
                Err(e.into())
            }
        }
    }

    /// Persists a comment and puts it at the front of the post's cached list.
    pub async fn create(
        &self,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<Comment, CommentError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CommentError::EmptyContent);
        }
        let epoch = self.state.read().await.epoch;

        let record = self
            .gateway
            .create_comment(post_id, content, parent_comment_id)
            .await
            .inspect_err(|e| warn!(%post_id, error = %e, "failed to create comment"))?;
        let comment = Comment::try_from(record)?;

        let mut state = self.state.write().await;
        if state.epoch == epoch {
            let entry = state.entries.entry(post_id.to_string()).or_default();
            entry.comments.insert(0, comment.clone());
            entry.last_fetched_at = Some(Instant::now());
        }
        Ok(comment)
    }

    /// Toggles a like server-side and patches the cached comment with the
    /// authoritative result. The cache is not touched on failure.
    pub async fn toggle_like(&self, comment_id: &str, post_id: &str) -> Result<LikeState, CommentError> {
        let record = self
            .gateway
            .toggle_comment_like(comment_id)
            .await
            .inspect_err(|e| warn!(%comment_id, error = %e, "failed to toggle comment like"))?;
        let like = LikeState::try_from(record)?;

        let mut state = self.state.write().await;
        let cached = state
            .entries
            .get_mut(post_id)
            .and_then(|entry| entry.comments.iter_mut().find(|c| c.id == comment_id));
        match cached {
            Some(comment) => {
                comment.is_liked_by_user = like.is_liked;
                comment.like_count = like.like_count;
            }
            None => debug!(%comment_id, %post_id, "liked comment is not cached"),
        }
        Ok(like)
    }

    /// Snapshot of a post's entry; posts never loaded yield an empty entry.
    pub async fn entry(&self, post_id: &str) -> CommentCacheEntry {
        self.state
            .read()
            .await
            .entries
            .get(post_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_fresh(&self, post_id: &str) -> bool {
        self.state
            .read()
            .await
            .entries
            .get(post_id)
            .is_some_and(|entry| entry.is_fresh(self.ttl, Instant::now()))
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.in_flight.clear();
        state.epoch += 1;
    }

    async fn fetch(&self, post_id: &str) -> Result<Vec<Comment>, GatewayError> {
        self.gateway
            .get_post_comments(post_id)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }
}
