pub mod comments;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod optimistic;
pub mod paginator;
pub mod records;
pub mod session;
pub mod visibility;

pub use comments::{CommentCache, CommentCacheEntry};
pub use config::{BackendConfig, CommentConfig, FeedConfig, RevueConfig};
pub use error::{CommentError, ConfigError, GatewayError};
pub use gateway::{HttpGateway, RemoteDataGateway};
pub use models::{Author, Comment, FeedItem, FeedTab, HiddenReason, LikeState, MediaKind, MediaRef, ToggleState};
pub use optimistic::{OptimisticState, OptimisticToggle};
pub use paginator::{should_load_more, FeedPage, FeedPaginator, LoadOutcome, ScrollMetrics, SkipReason};
pub use records::{CommentLikeRecord, CommentRecord, HiddenPostRecord, PostRecord, ToggleRecord};
pub use session::Session;
pub use visibility::{filter_visible, HiddenPostStore, HiddenSet};
