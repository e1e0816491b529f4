//! End-to-end board scenarios: gateway call, store merge, notification.

mod common;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use bloglist_sync::{
    Error,
    board::Board,
    gateway::Gateway,
    notification::Kind,
    resource::{Anecdote, AnecdoteDraft, Blog, BlogDraft},
    session::Session,
};
use common::{NOTIFY_DELAY, TestBackend, dead_url};
use tokio::time::sleep;

fn draft(title: &str, author: &str) -> BlogDraft {
    BlogDraft {
        title: title.into(),
        author: author.into(),
        url: "U".into(),
    }
}

#[tokio::test]
async fn create_adds_record_and_posts_expiring_success() -> Result<()> {
    let backend = TestBackend::start().await?;
    let board: Board<Blog> = backend.board();
    board.login("alice", "wonderland").await?;
    board.initialize().await?;

    let blog = board.create(draft("T", "A")).await?;

    let records = board.store().snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, blog.id);
    assert_eq!(records[0].likes, 0);

    let notification = board.notifier().current().expect("notification shown");
    assert_eq!(notification.kind, Kind::Success);
    assert!(notification.message.contains('T'));
    assert!(notification.message.contains('A'));

    sleep(NOTIFY_DELAY + Duration::from_millis(100)).await;
    assert_eq!(board.notifier().current(), None);

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn like_of_vanished_record_leaves_store_unchanged() -> Result<()> {
    let backend = TestBackend::start().await?;
    let writer: Board<Blog> = backend.board();
    writer.login("alice", "wonderland").await?;
    let blog = writer.create(draft("Gone soon", "A")).await?;

    let reader: Board<Blog> = backend.board();
    reader.initialize().await?;
    let before = reader.store().snapshot();
    assert_eq!(before.len(), 1);

    writer.remove(&blog.id).await?;

    let result = reader.like(&blog.id).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(reader.store().snapshot(), before);
    let notification = reader.notifier().current().expect("failure shown");
    assert_eq!(notification.kind, Kind::Failure);

    // The board keeps working after the failure.
    reader.login("bob", "builder").await?;
    reader.create(draft("Still here", "B")).await?;
    assert_eq!(reader.store().len(), 2);

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn like_of_unknown_local_id_fails_without_touching_store() -> Result<()> {
    let backend = TestBackend::start().await?;
    let board: Board<Blog> = backend.board();
    board.initialize().await?;

    assert!(matches!(board.like("5").await, Err(Error::NotFound(_))));
    assert!(board.store().is_empty());
    assert_eq!(
        board.notifier().current().map(|n| n.kind),
        Some(Kind::Failure)
    );

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn likes_reorder_the_list() -> Result<()> {
    let backend = TestBackend::start().await?;
    let board: Board<Blog> = backend.board();
    board.login("alice", "wonderland").await?;
    let first = board.create(draft("First", "A")).await?;
    let second = board.create(draft("Second", "A")).await?;

    let liked = board.like(&second.id).await?;
    assert_eq!(liked.likes, 1);

    let order: Vec<String> = board.store().snapshot().into_iter().map(|b| b.id).collect();
    assert_eq!(order, vec![second.id.clone(), first.id.clone()]);

    let fresh: Board<Blog> = backend.board();
    fresh.initialize().await?;
    assert_eq!(fresh.store().get(&second.id).map(|b| b.likes), Some(1));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn non_owner_cannot_delete() -> Result<()> {
    let backend = TestBackend::start().await?;
    let alice: Board<Blog> = backend.board();
    alice.login("alice", "wonderland").await?;
    let blog = alice.create(draft("Mine", "Alice")).await?;
    assert!(alice.can_remove(&blog));

    let bob: Board<Blog> = backend.board();
    bob.login("bob", "builder").await?;
    bob.initialize().await?;
    let seen = bob.store().get(&blog.id).expect("bob sees the blog");
    assert!(!bob.can_remove(&seen));

    let before = bob.store().snapshot();
    assert!(matches!(bob.remove(&blog.id).await, Err(Error::Auth(_))));
    assert_eq!(bob.store().snapshot(), before);
    assert_eq!(bob.notifier().current().map(|n| n.kind), Some(Kind::Failure));

    let anonymous: Board<Blog> = backend.board();
    assert!(!anonymous.can_remove(&seen));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failed_initialize_leaves_empty_store_and_reports_once() -> Result<()> {
    let session = Arc::new(Session::new());
    let gateway: Gateway<Blog> =
        Gateway::new(reqwest::Client::new(), dead_url().await?, session.clone());
    let board = Board::new(gateway, session).with_notification_delay(NOTIFY_DELAY);
    let mut notifications = board.notifier().subscribe();

    assert!(matches!(board.initialize().await, Err(Error::Network(_))));
    assert!(board.store().is_empty());

    notifications.changed().await?;
    let shown = notifications.borrow_and_update().clone();
    assert_eq!(shown.map(|n| n.kind), Some(Kind::Failure));
    assert!(!notifications.has_changed()?);
    Ok(())
}

#[tokio::test]
async fn anecdote_votes_and_filter() -> Result<()> {
    let backend = TestBackend::start().await?;
    let board: Board<Anecdote> = backend.board();
    board.initialize().await?;

    let hurts = board
        .create(AnecdoteDraft {
            content: "If it hurts, do it more often".into(),
        })
        .await?;
    board
        .create(AnecdoteDraft {
            content: "Adding manpower to a late software project makes it later".into(),
        })
        .await?;

    board.like(&hurts.id).await?;
    board.like(&hurts.id).await?;
    assert_eq!(board.store().get(&hurts.id).map(|a| a.votes), Some(2));
    assert_eq!(
        board.notifier().current().map(|n| n.message),
        Some("you voted 'If it hurts, do it more often'".to_string())
    );

    board.set_filter("MANPOWER");
    let visible = board.visible();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].content.contains("manpower"));

    board.set_filter("");
    assert_eq!(board.visible().len(), 2);

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn logout_drops_the_credential() -> Result<()> {
    let backend = TestBackend::start().await?;
    let board: Board<Blog> = backend.board();
    board.login("alice", "wonderland").await?;
    assert!(board.session().is_logged_in());

    board.logout().await?;
    assert!(!board.session().is_logged_in());
    assert!(matches!(
        board.create(draft("T", "A")).await,
        Err(Error::Auth(_))
    ));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn remove_cannot_reach_another_collection() -> Result<()> {
    let backend = TestBackend::start().await?;
    let anecdotes: Board<Anecdote> = backend.board();
    let anecdote = anecdotes
        .create(AnecdoteDraft {
            content: "Any fool can write code that a computer can understand".into(),
        })
        .await?;

    let blogs: Board<Blog> = backend.board();
    blogs.login("alice", "wonderland").await?;
    let result = blogs.remove(&format!("../anecdotes/{}", anecdote.id)).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(
        blogs.notifier().current().map(|n| n.kind),
        Some(Kind::Failure)
    );

    let fresh: Board<Anecdote> = backend.board();
    fresh.initialize().await?;
    assert_eq!(fresh.store().snapshot(), vec![anecdote]);

    backend.shutdown().await;
    Ok(())
}
