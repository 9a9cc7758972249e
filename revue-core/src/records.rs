//! Raw records as they cross the gateway boundary.
//!
//! Every endpoint has its own flat record type. Conversion into the domain
//! types in [`crate::models`] validates ids, counts and timestamps so that a
//! malformed payload surfaces as [`GatewayError::Malformed`] instead of
//! leaking half-formed data into the paginator or the comment cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::models::{
    Author, Comment, FeedItem, HiddenReason, LikeState, MediaKind, MediaRef, ToggleState,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media_title: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_poster_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiddenPostRecord {
    pub post_id: String,
    /// `"hidden"` or `"reported"`; anything else is treated as hidden.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub report_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub is_liked_by_user: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeRecord {
    #[serde(alias = "is_liked")]
    pub is_liked: bool,
    #[serde(alias = "like_count")]
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ToggleRecord {
    #[serde(alias = "isLiked", alias = "isBookmarked", alias = "is_liked", alias = "is_bookmarked")]
    pub active: bool,
    #[serde(default, alias = "likeCount", alias = "like_count")]
    pub count: i64,
}

fn required(entity: &'static str, field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::malformed(entity, format!("missing {field}")));
    }
    Ok(())
}

fn count(entity: &'static str, field: &str, value: i64) -> Result<u32, GatewayError> {
    u32::try_from(value)
        .map_err(|_| GatewayError::malformed(entity, format!("{field} out of range: {value}")))
}

fn timestamp(entity: &'static str, value: &str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatewayError::malformed(entity, format!("bad created_at {value:?}: {e}")))
}

fn author(
    user_id: String,
    username: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
) -> Author {
    Author {
        id: user_id,
        username,
        display_name: display_name.filter(|name| !name.trim().is_empty()),
        avatar_url: avatar_url.filter(|url| !url.trim().is_empty()),
    }
}

impl TryFrom<PostRecord> for FeedItem {
    type Error = GatewayError;

    fn try_from(record: PostRecord) -> Result<Self, Self::Error> {
        const ENTITY: &str = "post";
        required(ENTITY, "id", &record.id)?;
        required(ENTITY, "user_id", &record.user_id)?;

        let media = match record.media_id {
            Some(media_id) if !media_id.trim().is_empty() => {
                let title = record.media_title.unwrap_or_default();
                required(ENTITY, "media_title", &title)?;
                Some(MediaRef {
                    id: media_id,
                    title,
                    kind: record
                        .media_type
                        .as_deref()
                        .map(MediaKind::parse)
                        .unwrap_or(MediaKind::Other),
                    poster_url: record.media_poster_url,
                })
            }
            _ => None,
        };

        let rating = match record.rating {
            Some(value) if !value.is_finite() => {
                return Err(GatewayError::malformed(ENTITY, "rating is not a number"));
            }
            other => other.map(|value| value as f32),
        };

        Ok(Self {
            like_count: count(ENTITY, "like_count", record.like_count)?,
            comment_count: count(ENTITY, "comment_count", record.comment_count)?,
            created_at: timestamp(ENTITY, &record.created_at)?,
            author: author(
                record.user_id,
                record.username,
                record.display_name,
                record.avatar_url,
            ),
            id: record.id,
            media,
            content: record.content.unwrap_or_default(),
            rating,
            is_liked: record.is_liked,
            is_bookmarked: record.is_bookmarked,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = GatewayError;

    fn try_from(record: CommentRecord) -> Result<Self, Self::Error> {
        const ENTITY: &str = "comment";
        required(ENTITY, "id", &record.id)?;
        required(ENTITY, "post_id", &record.post_id)?;
        required(ENTITY, "user_id", &record.user_id)?;

        Ok(Self {
            like_count: count(ENTITY, "like_count", record.like_count)?,
            created_at: timestamp(ENTITY, &record.created_at)?,
            author: author(
                record.user_id,
                record.username,
                record.display_name,
                record.avatar_url,
            ),
            id: record.id,
            post_id: record.post_id,
            content: record.content,
            parent_comment_id: record.parent_comment_id.filter(|id| !id.is_empty()),
            is_liked_by_user: record.is_liked_by_user,
        })
    }
}

impl HiddenPostRecord {
    pub fn into_entry(self) -> Result<(String, HiddenReason), GatewayError> {
        required("hidden post", "post_id", &self.post_id)?;
        let reason = match self.reason.as_deref() {
            Some("reported") => HiddenReason::Reported(self.report_reason),
            _ => HiddenReason::Hidden,
        };
        Ok((self.post_id, reason))
    }
}

impl TryFrom<CommentLikeRecord> for LikeState {
    type Error = GatewayError;

    fn try_from(record: CommentLikeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            is_liked: record.is_liked,
            like_count: count("comment like", "like_count", record.like_count)?,
        })
    }
}

impl TryFrom<ToggleRecord> for ToggleState {
    type Error = GatewayError;

    fn try_from(record: ToggleRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            active: record.active,
            count: count("toggle", "count", record.count)?,
        })
    }
}
