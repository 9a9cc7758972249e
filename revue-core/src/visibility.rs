use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::RemoteDataGateway;
use crate::models::{FeedItem, HiddenReason};

/// Post ids the viewer has hidden or reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSet {
    posts: HashMap<String, HiddenReason>,
}

impl HiddenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, post_id: impl Into<String>, reason: HiddenReason) {
        self.posts.insert(post_id.into(), reason);
    }

    pub fn remove(&mut self, post_id: &str) -> Option<HiddenReason> {
        self.posts.remove(post_id)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.posts.contains_key(post_id)
    }

    pub fn reason(&self, post_id: &str) -> Option<&HiddenReason> {
        self.posts.get(post_id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn clear(&mut self) {
        self.posts.clear();
    }
}

impl<S: Into<String>> FromIterator<(S, HiddenReason)> for HiddenSet {
    fn from_iter<I: IntoIterator<Item = (S, HiddenReason)>>(iter: I) -> Self {
        Self {
            posts: iter
                .into_iter()
                .map(|(id, reason)| (id.into(), reason))
                .collect(),
        }
    }
}

/// Keeps the posts whose id is not in `hidden`, in their original order.
pub fn filter_visible(posts: Vec<FeedItem>, hidden: &HiddenSet) -> Vec<FeedItem> {
    if hidden.is_empty() {
        return posts;
    }
    posts
        .into_iter()
        .filter(|post| !hidden.contains(&post.id))
        .collect()
}

/// Session-scoped owner of the viewer's [`HiddenSet`].
///
/// Mutations go to the backend first; the local set only changes once the
/// backend accepted them, and only if no `clear()` happened in between.
#[derive(Debug, Clone, Default)]
pub struct HiddenPostStore {
    inner: Arc<RwLock<HiddenState>>,
}

#[derive(Debug, Default)]
struct HiddenState {
    set: HiddenSet,
    // Bumped by clear() so requests started before a logout cannot write back.
    epoch: u64,
}

impl HiddenPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, gateway: &dyn RemoteDataGateway) -> Result<usize, GatewayError> {
        let epoch = self.epoch().await;
        let records = gateway.get_user_hidden_posts().await?;
        let set = records
            .into_iter()
            .map(|record| record.into_entry())
            .collect::<Result<HiddenSet, _>>()?;
        let count = set.len();
        if !self.apply(epoch, |current| *current = set).await {
            debug!("store cleared during load, dropping hidden posts");
            return Ok(0);
        }
        info!(count, "loaded hidden posts");
        Ok(count)
    }

    pub async fn hide(
        &self,
        gateway: &dyn RemoteDataGateway,
        post_id: &str,
    ) -> Result<(), GatewayError> {
        let epoch = self.epoch().await;
        gateway.hide_post(post_id).await.inspect_err(|e| {
            warn!(%post_id, error = %e, "failed to hide post");
        })?;
        self.apply(epoch, |set| set.insert(post_id, HiddenReason::Hidden))
            .await;
        Ok(())
    }

    pub async fn unhide(
        &self,
        gateway: &dyn RemoteDataGateway,
        post_id: &str,
    ) -> Result<(), GatewayError> {
        gateway.unhide_post(post_id).await.inspect_err(|e| {
            warn!(%post_id, error = %e, "failed to unhide post");
        })?;
        if self.inner.write().await.set.remove(post_id).is_none() {
            debug!(%post_id, "unhid a post that was not hidden locally");
        }
        Ok(())
    }

    pub async fn report(
        &self,
        gateway: &dyn RemoteDataGateway,
        post_id: &str,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let epoch = self.epoch().await;
        gateway.report_post(post_id, reason).await.inspect_err(|e| {
            warn!(%post_id, error = %e, "failed to report post");
        })?;
        let reason = Some(reason.trim().to_string()).filter(|r| !r.is_empty());
        self.apply(epoch, |set| {
            set.insert(post_id, HiddenReason::Reported(reason))
        })
        .await;
        Ok(())
    }

    pub async fn contains(&self, post_id: &str) -> bool {
        self.inner.read().await.set.contains(post_id)
    }

    pub async fn snapshot(&self) -> HiddenSet {
        self.inner.read().await.set.clone()
    }

    pub async fn filter(&self, posts: Vec<FeedItem>) -> Vec<FeedItem> {
        filter_visible(posts, &self.inner.read().await.set)
    }

    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        state.set.clear();
        state.epoch += 1;
    }

    async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Runs `update` unless the store was cleared since `epoch` was read.
    async fn apply(&self, epoch: u64, update: impl FnOnce(&mut HiddenSet)) -> bool {
        let mut state = self.inner.write().await;
        if state.epoch != epoch {
            return false;
        }
        update(&mut state.set);
        true
    }
}
