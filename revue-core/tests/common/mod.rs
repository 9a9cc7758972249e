#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use revue_core::{
    CommentLikeRecord, CommentRecord, GatewayError, HiddenPostRecord, PostRecord,
    RemoteDataGateway, ToggleRecord,
};

pub fn post(id: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        user_id: "author-1".into(),
        username: "critic".into(),
        content: Some(format!("review {id}")),
        like_count: 2,
        created_at: "2024-10-21T07:28:00Z".into(),
        ..Default::default()
    }
}

pub fn posts(prefix: &str, range: std::ops::Range<usize>) -> Vec<PostRecord> {
    range.map(|n| post(&format!("{prefix}{n}"))).collect()
}

pub fn comment(id: &str, post_id: &str, content: &str) -> CommentRecord {
    CommentRecord {
        id: id.to_string(),
        post_id: post_id.to_string(),
        user_id: "viewer".into(),
        username: "viewer".into(),
        content: content.to_string(),
        created_at: "2024-10-21T08:00:00Z".into(),
        ..Default::default()
    }
}

pub fn backend_down() -> GatewayError {
    GatewayError::Status {
        status: 503,
        body: "unavailable".into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCall {
    pub feed: String,
    pub limit: usize,
    pub offset: usize,
}

/// In-memory gateway with queued feed pages and call counters.
#[derive(Default)]
pub struct ScriptedGateway {
    feed_pages: Mutex<HashMap<String, VecDeque<Result<Vec<PostRecord>, GatewayError>>>>,
    feed_calls: Mutex<Vec<FeedCall>>,
    feed_gate: Mutex<Option<oneshot::Receiver<()>>>,
    hidden: Mutex<Vec<HiddenPostRecord>>,
    hidden_calls: AtomicUsize,
    hidden_gate: Mutex<Option<oneshot::Receiver<()>>>,
    comments: Mutex<HashMap<String, Vec<CommentRecord>>>,
    comment_calls: AtomicUsize,
    comment_gate: Mutex<Option<oneshot::Receiver<()>>>,
    created: AtomicUsize,
    comment_likes: Mutex<HashMap<String, CommentLikeRecord>>,
    post_likes: Mutex<HashMap<String, ToggleRecord>>,
    moderation_calls: Mutex<Vec<String>>,
    moderation_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub fail_comments: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_hidden: AtomicBool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// `feed` is `"for_you"`, `"friends"` or `"user:<id>"`.
    pub fn push_page(&self, feed: &str, page: Vec<PostRecord>) {
        self.push_result(feed, Ok(page));
    }

    pub fn push_result(&self, feed: &str, result: Result<Vec<PostRecord>, GatewayError>) {
        self.feed_pages
            .lock()
            .unwrap()
            .entry(feed.to_string())
            .or_default()
            .push_back(result);
    }

    /// The next feed call blocks until the returned sender fires.
    pub fn hold_next_feed_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.feed_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The next hidden-posts call blocks until the returned sender fires.
    pub fn hold_next_hidden_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hidden_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The next comments call blocks until the returned sender fires.
    pub fn hold_next_comments_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.comment_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The next hide or report call blocks until the returned sender fires.
    pub fn hold_next_moderation_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.moderation_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn hidden_calls(&self) -> usize {
        self.hidden_calls.load(Ordering::SeqCst)
    }

    pub fn feed_calls(&self) -> Vec<FeedCall> {
        self.feed_calls.lock().unwrap().clone()
    }

    pub fn set_hidden(&self, records: Vec<HiddenPostRecord>) {
        *self.hidden.lock().unwrap() = records;
    }

    pub fn set_comments(&self, post_id: &str, records: Vec<CommentRecord>) {
        self.comments
            .lock()
            .unwrap()
            .insert(post_id.to_string(), records);
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn set_comment_like(&self, comment_id: &str, is_liked: bool, like_count: i64) {
        self.comment_likes.lock().unwrap().insert(
            comment_id.to_string(),
            CommentLikeRecord {
                is_liked,
                like_count,
            },
        );
    }

    pub fn set_post_toggle(&self, post_id: &str, active: bool, count: i64) {
        self.post_likes
            .lock()
            .unwrap()
            .insert(post_id.to_string(), ToggleRecord { active, count });
    }

    pub fn moderation_calls(&self) -> Vec<String> {
        self.moderation_calls.lock().unwrap().clone()
    }

    async fn next_page(
        &self,
        feed: String,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.feed_calls.lock().unwrap().push(FeedCall {
            feed: feed.clone(),
            limit,
            offset,
        });
        let gate = self.feed_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.feed_pages
            .lock()
            .unwrap()
            .get_mut(&feed)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn moderate(&self, call: String) -> Result<(), GatewayError> {
        self.write_guard()?;
        self.moderation_calls.lock().unwrap().push(call);
        let gate = self.moderation_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(())
    }

    fn write_guard(&self) -> Result<(), GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(backend_down())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteDataGateway for ScriptedGateway {
    async fn get_for_you_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.next_page("for_you".into(), limit, offset).await
    }

    async fn get_friends_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.next_page("friends".into(), limit, offset).await
    }

    async fn get_user_posts(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.next_page(format!("user:{user_id}"), limit, offset)
            .await
    }

    async fn get_user_hidden_posts(&self) -> Result<Vec<HiddenPostRecord>, GatewayError> {
        self.hidden_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.hidden_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_hidden.load(Ordering::SeqCst) {
            return Err(backend_down());
        }
        Ok(self.hidden.lock().unwrap().clone())
    }

    async fn get_post_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, GatewayError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.comment_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(backend_down());
        }
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<CommentRecord, GatewayError> {
        self.write_guard()?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let mut record = comment(&format!("new-{n}"), post_id, content);
        record.parent_comment_id = parent_comment_id.map(str::to_string);
        Ok(record)
    }

    async fn toggle_comment_like(
        &self,
        comment_id: &str,
    ) -> Result<CommentLikeRecord, GatewayError> {
        self.write_guard()?;
        Ok(self
            .comment_likes
            .lock()
            .unwrap()
            .get(comment_id)
            .copied()
            .unwrap_or(CommentLikeRecord {
                is_liked: true,
                like_count: 1,
            }))
    }

    async fn toggle_post_like(&self, post_id: &str) -> Result<ToggleRecord, GatewayError> {
        self.write_guard()?;
        Ok(self
            .post_likes
            .lock()
            .unwrap()
            .get(post_id)
            .copied()
            .unwrap_or(ToggleRecord {
                active: true,
                count: 1,
            }))
    }

    async fn toggle_bookmark(&self, post_id: &str) -> Result<ToggleRecord, GatewayError> {
        self.toggle_post_like(post_id).await
    }

    async fn hide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.moderate(format!("hide:{post_id}")).await
    }

    async fn unhide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.write_guard()?;
        self.moderation_calls
            .lock()
            .unwrap()
            .push(format!("unhide:{post_id}"));
        Ok(())
    }

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<(), GatewayError> {
        self.moderate(format!("report:{post_id}:{reason}")).await
    }
}
