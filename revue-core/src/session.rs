use std::sync::Arc;

use tracing::{info, warn};

use crate::comments::CommentCache;
use crate::config::RevueConfig;
use crate::error::{CommentError, GatewayError};
use crate::gateway::RemoteDataGateway;
use crate::models::{Comment, FeedItem, ToggleState};
use crate::optimistic::OptimisticToggle;
use crate::paginator::FeedPaginator;
use crate::visibility::HiddenPostStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostToggle {
    Like,
    Bookmark,
}

impl PostToggle {
    fn read(self, item: &FeedItem) -> (bool, u32) {
        match self {
            PostToggle::Like => (item.is_liked, item.like_count),
            // Bookmarks have no public counter.
            PostToggle::Bookmark => (item.is_bookmarked, 0),
        }
    }

    fn apply(self, item: &mut FeedItem, view: ToggleState) {
        match self {
            PostToggle::Like => {
                item.is_liked = view.active;
                item.like_count = view.count;
            }
            PostToggle::Bookmark => item.is_bookmarked = view.active,
        }
    }
}

/// Everything scoped to one signed-in viewer.
///
/// The hidden set, feed pages and comment cache all share one gateway and are
/// emptied together by [`Session::logout`].
pub struct Session {
    gateway: Arc<dyn RemoteDataGateway>,
    hidden: HiddenPostStore,
    feeds: FeedPaginator,
    comments: CommentCache,
}

impl Session {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>, config: &RevueConfig) -> Self {
        let hidden = HiddenPostStore::new();
        Self {
            feeds: FeedPaginator::new(gateway.clone(), hidden.clone(), config.feed.clone()),
            comments: CommentCache::new(gateway.clone(), config.comments.ttl()),
            hidden,
            gateway,
        }
    }

    pub fn feeds(&self) -> &FeedPaginator {
        &self.feeds
    }

    pub fn comments(&self) -> &CommentCache {
        &self.comments
    }

    pub fn hidden(&self) -> &HiddenPostStore {
        &self.hidden
    }

    /// Loads the viewer's hidden posts. Call before the first feed load.
    pub async fn start(&self) -> Result<usize, GatewayError> {
        self.hidden.load(self.gateway.as_ref()).await
    }

    pub async fn logout(&self) {
        self.feeds.clear().await;
        self.comments.clear().await;
        self.hidden.clear().await;
        info!("session state cleared");
    }

    pub async fn hide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.hidden.hide(self.gateway.as_ref(), post_id).await?;
        self.feeds.remove_item(post_id).await;
        Ok(())
    }

    pub async fn report_post(&self, post_id: &str, reason: &str) -> Result<(), GatewayError> {
        self.hidden
            .report(self.gateway.as_ref(), post_id, reason)
            .await?;
        self.feeds.remove_item(post_id).await;
        Ok(())
    }

    /// The post reappears on the next refresh of its tab.
    pub async fn unhide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.hidden.unhide(self.gateway.as_ref(), post_id).await
    }

    pub async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<Comment, CommentError> {
        let comment = self
            .comments
            .create(post_id, content, parent_comment_id)
            .await?;
        self.feeds
            .patch_item(post_id, |item| {
                item.comment_count = item.comment_count.saturating_add(1)
            })
            .await;
        Ok(comment)
    }

    pub async fn toggle_post_like(&self, post_id: &str) -> OptimisticToggle {
        self.toggle(post_id, PostToggle::Like).await
    }

    pub async fn toggle_bookmark(&self, post_id: &str) -> OptimisticToggle {
        self.toggle(post_id, PostToggle::Bookmark).await
    }

    async fn toggle(&self, post_id: &str, kind: PostToggle) -> OptimisticToggle {
        let (active, count) = self
            .feeds
            .find_item(post_id)
            .await
            .map(|item| kind.read(&item))
            .unwrap_or((false, 0));
        let pending = OptimisticToggle::begin(active, count);
        self.feeds
            .patch_item(post_id, |item| kind.apply(item, pending.view()))
            .await;

        let result = match kind {
            PostToggle::Like => self.gateway.toggle_post_like(post_id).await,
            PostToggle::Bookmark => self.gateway.toggle_bookmark(post_id).await,
        }
        .and_then(ToggleState::try_from);
        if let Err(e) = &result {
            warn!(%post_id, ?kind, error = %e, "toggle failed, reverting");
        }

        let settled = pending.settle(&result);
        self.feeds
            .patch_item(post_id, |item| kind.apply(item, settled.view()))
            .await;
        settled
    }
}
