//! Paged, deduplicated feed tabs.
//!
//! Each [`FeedTab`] owns one [`FeedPage`]. `load_initial` and `refresh`
//! replace a page wholesale, `load_more` appends the next server page after
//! filtering hidden posts and dropping ids that are already present.
//!
//! A page carries a generation number that every reset bumps. A `load_more`
//! that started before a reset sees a different generation when it completes
//! and is discarded. A `load_more` requested while a reset is in flight is
//! skipped, since the offset it would use belongs to the page being replaced.
//!
//! Hidden posts are filtered while the page lock is held, so a post hidden
//! concurrently is either filtered here or removed by `remove_item` afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::GatewayError;
use crate::gateway::RemoteDataGateway;
use crate::models::{FeedItem, FeedTab};
use crate::visibility::HiddenPostStore;

/// Snapshot of one tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub has_more: bool,
    pub loading_more: bool,
    /// Set while `load_initial` or `refresh` is in flight; appends wait for it.
    pub refreshing: bool,
    /// Last failure for this tab; cleared by the next successful load.
    pub error: Option<String>,
    raw_offset: usize,
    generation: u64,
}

impl FeedPage {
    /// Number of raw records received since the last reset, used as the next offset.
    pub fn raw_offset(&self) -> usize {
        self.raw_offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EndOfFeed,
    Throttled,
    InFlight,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { added: usize, has_more: bool },
    /// Preconditions did not hold; nothing was requested.
    Skipped(SkipReason),
    /// The tab was reset or cleared while the request was in flight.
    Stale,
    Failed(GatewayError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Vertical scroll position reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset_y: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

/// True when the bottom of the viewport is within `threshold_px` of the content end.
pub fn should_load_more(metrics: ScrollMetrics, threshold_px: f64) -> bool {
    metrics.offset_y + metrics.viewport_height >= metrics.content_height - threshold_px
}

#[derive(Debug, Default)]
struct PaginatorState {
    pages: HashMap<FeedTab, FeedPage>,
    // Shared by every tab.
    last_load_time: Option<Instant>,
    next_generation: u64,
}

pub struct FeedPaginator {
    gateway: Arc<dyn RemoteDataGateway>,
    hidden: HiddenPostStore,
    config: FeedConfig,
    state: RwLock<PaginatorState>,
}

impl FeedPaginator {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>, hidden: HiddenPostStore, config: FeedConfig) -> Self {
        Self {
            gateway,
            hidden,
            config: config.normalized(),
            state: RwLock::new(PaginatorState::default()),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub async fn load_initial(&self, tab: &FeedTab) -> LoadOutcome {
        self.reset(tab, "load_initial").await
    }

    pub async fn refresh(&self, tab: &FeedTab) -> LoadOutcome {
        self.reset(tab, "refresh").await
    }

    pub async fn load_more(&self, tab: &FeedTab) -> LoadOutcome {
        let (generation, offset) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let now = Instant::now();
            let page = match state.pages.get_mut(tab) {
                Some(page) if page.has_more => page,
                _ => return LoadOutcome::Skipped(SkipReason::EndOfFeed),
            };
            if page.loading_more || page.refreshing {
                return LoadOutcome::Skipped(SkipReason::InFlight);
            }
            if let Some(last) = state.last_load_time {
                if now.duration_since(last) < self.config.load_more_throttle() {
                    debug!(%tab, "load_more throttled");
                    return LoadOutcome::Skipped(SkipReason::Throttled);
                }
            }
            state.last_load_time = Some(now);
            page.loading_more = true;
            (page.generation, page.raw_offset)
        };

        let fetched = self.fetch(tab, offset).await;

        let mut state = self.state.write().await;
        let fetched = match fetched {
            Ok((raw_count, items)) => Ok((raw_count, self.hidden.filter(items).await)),
            Err(e) => Err(e),
        };
        let page = match state.pages.get_mut(tab) {
            Some(page) if page.generation == generation => page,
            _ => {
                debug!(%tab, offset, "discarding load_more result for a reset tab");
                return LoadOutcome::Stale;
            }
        };
        page.loading_more = false;

        match fetched {
            Ok((raw_count, visible)) => {
                let mut seen: HashSet<String> = page.items.iter().map(|i| i.id.clone()).collect();
                let before = page.items.len();
                page.items
                    .extend(visible.into_iter().filter(|item| seen.insert(item.id.clone())));
                let added = page.items.len() - before;
                page.raw_offset += raw_count;
                page.has_more = raw_count >= self.config.page_size;
                page.error = None;
                debug!(%tab, offset, raw_count, added, has_more = page.has_more, "loaded more posts");
                LoadOutcome::Loaded {
                    added,
                    has_more: page.has_more,
                }
            }
            Err(e) => {
                warn!(%tab, offset, error = %e, "failed to load more posts");
                page.error = Some(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    pub async fn current_items(&self, tab: &FeedTab) -> Vec<FeedItem> {
        self.state
            .read()
            .await
            .pages
            .get(tab)
            .map(|page| page.items.clone())
            .unwrap_or_default()
    }

    pub async fn has_more(&self, tab: &FeedTab) -> bool {
        self.state
            .read()
            .await
            .pages
            .get(tab)
            .map(|page| page.has_more)
            .unwrap_or(false)
    }

    pub async fn page(&self, tab: &FeedTab) -> Option<FeedPage> {
        self.state.read().await.pages.get(tab).cloned()
    }

    pub fn should_load_more(&self, metrics: ScrollMetrics) -> bool {
        should_load_more(metrics, self.config.scroll_threshold_px)
    }

    /// First copy of `post_id` found in any tab.
    pub async fn find_item(&self, post_id: &str) -> Option<FeedItem> {
        let state = self.state.read().await;
        state
            .pages
            .values()
            .flat_map(|page| page.items.iter())
            .find(|item| item.id == post_id)
            .cloned()
    }

    /// Applies a local edit to every tab holding `post_id`. Returns how many copies changed.
    pub async fn patch_item(&self, post_id: &str, patch: impl Fn(&mut FeedItem)) -> usize {
        let mut state = self.state.write().await;
        let mut patched = 0;
        for item in state
            .pages
            .values_mut()
            .flat_map(|page| page.items.iter_mut())
            .filter(|item| item.id == post_id)
        {
            patch(item);
            patched += 1;
        }
        patched
    }

    /// Drops `post_id` from every tab without refetching.
    pub async fn remove_item(&self, post_id: &str) -> usize {
        let mut state = self.state.write().await;
        let mut removed = 0;
        for page in state.pages.values_mut() {
            let before = page.items.len();
            page.items.retain(|item| item.id != post_id);
            removed += before - page.items.len();
        }
        removed
    }

    pub async fn reset_throttle(&self) {
        self.state.write().await.last_load_time = None;
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.pages.clear();
        state.last_load_time = None;
    }

    async fn reset(&self, tab: &FeedTab, op: &'static str) -> LoadOutcome {
        let generation = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            state.next_generation += 1;
            let page = state.pages.entry(tab.clone()).or_default();
            page.generation = state.next_generation;
            page.loading_more = false;
            page.refreshing = true;
            state.next_generation
        };

        let fetched = self.fetch(tab, 0).await;

        let mut state = self.state.write().await;
        let fetched = match fetched {
            Ok((raw_count, items)) => Ok((raw_count, self.hidden.filter(items).await)),
            Err(e) => Err(e),
        };
        let page = match state.pages.get_mut(tab) {
            Some(page) if page.generation == generation => page,
            _ => {
                debug!(%tab, op, "discarding result superseded by a newer reset");
                return LoadOutcome::Stale;
            }
        };
        page.refreshing = false;

        match fetched {
            Ok((raw_count, visible)) => {
                let mut seen = HashSet::with_capacity(visible.len());
                page.items = visible
                    .into_iter()
                    .filter(|item| seen.insert(item.id.clone()))
                    .collect();
                page.raw_offset = raw_count;
                page.has_more = raw_count >= self.config.page_size;
                page.error = None;
                info!(%tab, op, raw_count, shown = page.items.len(), has_more = page.has_more, "feed loaded");
                LoadOutcome::Loaded {
                    added: page.items.len(),
                    has_more: page.has_more,
                }
            }
            Err(e) => {
                warn!(%tab, op, error = %e, "failed to load feed");
                page.error = Some(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    async fn fetch(&self, tab: &FeedTab, offset: usize) -> Result<(usize, Vec<FeedItem>), GatewayError> {
        let limit = self.config.page_size;
        let records = match tab {
            FeedTab::ForYou => self.gateway.get_for_you_feed(limit, offset).await?,
            FeedTab::Friends => self.gateway.get_friends_feed(limit, offset).await?,
            FeedTab::Profile(user_id) => self.gateway.get_user_posts(user_id, limit, offset).await?,
        };
        let raw_count = records.len();
        let items = records
            .into_iter()
            .map(FeedItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((raw_count, items))
    }
}
