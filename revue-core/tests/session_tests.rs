mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use revue_core::{
    filter_visible, FeedItem, FeedTab, HiddenPostRecord, HiddenPostStore, HiddenReason, OptimisticState, RevueConfig, Session,
    ToggleState,
};

use common::{comment, posts, ScriptedGateway};

fn session(gateway: &Arc<ScriptedGateway>) -> Session {
    Session::new(gateway.clone(), &RevueConfig::default())
}

#[tokio::test]
async fn start_loads_hidden_posts_that_filter_the_feed() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.set_hidden(vec![
        HiddenPostRecord {
            post_id: "a1".into(),
            reason: Some("hidden".into()),
            ..Default::default()
        },
        HiddenPostRecord {
            post_id: "a2".into(),
            reason: Some("reported".into()),
            report_reason: Some("spoilers".into()),
            ..Default::default()
        },
    ]);
    gateway.push_page("for_you", posts("a", 0..4));
    let session = session(&gateway);

    assert_eq!(session.start().await.unwrap(), 2);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    let ids: Vec<_> = session
        .feeds()
        .current_items(&FeedTab::ForYou)
        .await
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids, vec!["a0", "a3"]);
    assert_eq!(
        session.hidden().snapshot().await.reason("a2"),
        Some(&HiddenReason::Reported(Some("spoilers".into())))
    );
}

#[tokio::test]
async fn failed_hidden_load_is_reported() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.fail_hidden.store(true, Ordering::SeqCst);
    let session = session(&gateway);

    assert!(session.start().await.is_err());
    assert!(session.hidden().snapshot().await.is_empty());
}

#[tokio::test]
async fn logout_clears_feeds_comments_and_hidden_posts() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.set_hidden(vec![HiddenPostRecord {
        post_id: "a0".into(),
        ..Default::default()
    }]);
    gateway.push_page("for_you", posts("a", 0..3));
    gateway.set_comments("a1", vec![comment("c1", "a1", "nice")]);
    let session = session(&gateway);

    session.start().await.unwrap();
    session.feeds().load_initial(&FeedTab::ForYou).await;
    session.comments().load("a1", false).await.unwrap();

    session.logout().await;

    assert!(session.feeds().current_items(&FeedTab::ForYou).await.is_empty());
    assert!(session.comments().entry("a1").await.comments.is_empty());
    let hidden = session.hidden().snapshot().await;
    assert!(hidden.is_empty());
    let everything: Vec<FeedItem> = posts("a", 0..3)
        .into_iter()
        .map(|record| FeedItem::try_from(record).unwrap())
        .collect();
    assert_eq!(filter_visible(everything, &hidden).len(), 3);

    session.comments().load("a1", false).await.unwrap();
    assert_eq!(gateway.comment_calls(), 2);
}

#[tokio::test]
async fn hidden_posts_arriving_after_logout_are_dropped() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.set_hidden(vec![HiddenPostRecord {
        post_id: "a0".into(),
        ..Default::default()
    }]);
    let session = Arc::new(session(&gateway));

    let release = gateway.hold_next_hidden_call();
    let starting = {
        let session = session.clone();
        tokio::spawn(async move { session.start().await })
    };
    while gateway.hidden_calls() < 1 {
        tokio::task::yield_now().await;
    }

    session.logout().await;
    release.send(()).unwrap();
    assert_eq!(starting.await.unwrap().unwrap(), 0);
    assert!(session.hidden().snapshot().await.is_empty());

    // The next session picks the set up again.
    assert_eq!(session.start().await.unwrap(), 1);
    assert!(session.hidden().contains("a0").await);
}

#[tokio::test]
async fn hide_confirmed_after_logout_is_not_remembered() {
    let gateway = Arc::new(ScriptedGateway::new());
    let hidden = HiddenPostStore::new();

    let release = gateway.hold_next_moderation_call();
    let hiding = {
        let hidden = hidden.clone();
        let gateway = gateway.clone();
        tokio::spawn(async move { hidden.hide(gateway.as_ref(), "a1").await })
    };
    while gateway.moderation_calls().is_empty() {
        tokio::task::yield_now().await;
    }

    hidden.clear().await;
    release.send(()).unwrap();
    hiding.await.unwrap().unwrap();
    assert!(!hidden.contains("a1").await);

    hidden.report(gateway.as_ref(), "a2", "spam").await.unwrap();
    assert_eq!(
        hidden.snapshot().await.reason("a2"),
        Some(&HiddenReason::Reported(Some("spam".into())))
    );
}

#[tokio::test]
async fn hiding_and_reporting_remove_posts_from_loaded_tabs() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_page("for_you", posts("a", 0..4));
    let session = session(&gateway);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    session.hide_post("a1").await.unwrap();
    session.report_post("a2", "spam").await.unwrap();

    let items = session.feeds().current_items(&FeedTab::ForYou).await;
    assert_eq!(items.len(), 2);
    assert!(session.hidden().contains("a1").await);
    assert_eq!(
        gateway.moderation_calls(),
        vec!["hide:a1".to_string(), "report:a2:spam".to_string()]
    );

    session.unhide_post("a1").await.unwrap();
    assert!(!session.hidden().contains("a1").await);
}

#[tokio::test]
async fn rejected_hide_changes_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_page("for_you", posts("a", 0..2));
    let session = session(&gateway);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    gateway.fail_writes.store(true, Ordering::SeqCst);
    assert!(session.hide_post("a0").await.is_err());
    assert!(!session.hidden().contains("a0").await);
    assert_eq!(session.feeds().current_items(&FeedTab::ForYou).await.len(), 2);
}

#[tokio::test]
async fn post_like_is_confirmed_with_server_count() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_page("for_you", posts("a", 0..2));
    gateway.set_post_toggle("a0", true, 10);
    let session = session(&gateway);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    let toggle = session.toggle_post_like("a0").await;
    assert_eq!(toggle.state(), OptimisticState::Confirmed);
    assert_eq!(toggle.original(), ToggleState { active: false, count: 2 });

    let item = session.feeds().find_item("a0").await.unwrap();
    assert!(item.is_liked);
    assert_eq!(item.like_count, 10);
}

#[tokio::test]
async fn failed_bookmark_is_reverted() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_page("for_you", posts("a", 0..2));
    let session = session(&gateway);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    gateway.fail_writes.store(true, Ordering::SeqCst);
    let toggle = session.toggle_bookmark("a1").await;
    assert_eq!(toggle.state(), OptimisticState::Reverted);
    assert!(!session.feeds().find_item("a1").await.unwrap().is_bookmarked);
}

#[tokio::test]
async fn new_comment_bumps_the_post_comment_count() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_page("for_you", posts("a", 0..1));
    let session = session(&gateway);
    session.feeds().load_initial(&FeedTab::ForYou).await;

    session.create_comment("a0", "great take", None).await.unwrap();

    assert_eq!(session.feeds().find_item("a0").await.unwrap().comment_count, 1);
    assert_eq!(
        session.comments().entry("a0").await.comments[0].content,
        "great take"
    );
}
