use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the independent post streams a viewer can page through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedTab {
    ForYou,
    Friends,
    /// Posts authored by a single user, as shown on their profile.
    Profile(String),
}

impl fmt::Display for FeedTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedTab::ForYou => f.write_str("forYou"),
            FeedTab::Friends => f.write_str("friends"),
            FeedTab::Profile(user_id) => write!(f, "profile:{user_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Book,
    Album,
    Game,
    Other,
}

impl MediaKind {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "movie" | "film" => MediaKind::Movie,
            "show" | "tv" | "series" => MediaKind::Show,
            "book" => MediaKind::Book,
            "album" | "music" => MediaKind::Album,
            "game" => MediaKind::Game,
            _ => MediaKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub poster_url: Option<String>,
}

/// A review post as displayed in a feed.
///
/// Only the interaction flags and counts change after the item is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub author: Author,
    pub media: Option<MediaRef>,
    pub content: String,
    pub rating: Option<f32>,
    pub like_count: u32,
    pub comment_count: u32,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub content: String,
    pub parent_comment_id: Option<String>,
    pub like_count: u32,
    pub is_liked_by_user: bool,
    pub created_at: DateTime<Utc>,
}

/// Server-authoritative like state returned after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub like_count: u32,
}

/// Server-authoritative state of a post-level toggle (like or bookmark).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    pub active: bool,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiddenReason {
    Hidden,
    Reported(Option<String>),
}

impl From<LikeState> for ToggleState {
    fn from(like: LikeState) -> Self {
        Self {
            active: like.is_liked,
            count: like.like_count,
        }
    }
}
