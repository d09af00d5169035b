use std::sync::Arc;

use krlife_console::events::StoreEvent;
use krlife_console::models::*;
use krlife_console::seed::SeedBackend;
use krlife_console::storage::MemoryStore;
use krlife_console::views::{self, ReviewQuery};
use krlife_console::{Console, ConsoleError};

fn console_over(backend: &SeedBackend) -> Console {
    Console::new(Arc::new(backend.clone()), Arc::new(MemoryStore::new()))
}

async fn editor() -> (SeedBackend, Console) {
    let backend = SeedBackend::seeded();
    let console = console_over(&backend);
    console.session.login("editor@kr-life.ru", "editor123").await.unwrap();
    (backend, console)
}

#[tokio::test]
async fn review_queue_holds_unpublished_posts_newest_first() {
    let (_, console) = editor().await;
    let posts = console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    assert_eq!(posts.len(), 3);

    let queue = views::sort_by_recent(views::review_queue(&posts, &ReviewQuery::default()));
    let ids: Vec<_> = queue.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["post-1", "post-2"]);

    let today = queue[0].activity_at().date_naive();
    let groups = views::group_by_day(&queue, today);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label, "Today");
}

#[tokio::test]
async fn history_only_grows_through_the_workflow() {
    let (_, console) = editor().await;
    console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    let before = console.content.post("post-1").unwrap().history;

    let mut previous = before.clone();
    for (status, action) in [
        (PostStatus::Editing, HistoryAction::Edited),
        (PostStatus::Approved, HistoryAction::Approved),
        (PostStatus::Published, HistoryAction::Published),
    ] {
        let post = console.content.move_to_status("post-1", status, Some(format!("to {status}"))).await.unwrap();
        assert_eq!(post.history.len(), previous.len() + 1);
        assert_eq!(&post.history[..previous.len()], &previous[..]);
        let last = post.history.last().unwrap();
        assert_eq!(last.action, action);
        assert_eq!(last.author, "Maria");
        previous = post.history;
    }

    let published = console.content.post("post-1").unwrap();
    assert!(published.published_at.is_some());
    assert_eq!(published.history[0], before[0]);
}

#[tokio::test]
async fn editing_a_post_appends_an_edit_entry() {
    let (_, console) = editor().await;
    let upd = UpdatePost { title: "Sharper headline".into(), content: "New text".into(), tags: views::parse_tags("ai, news ,") };
    let post = console.content.update_post("post-2", upd).await.unwrap();
    assert_eq!(post.tags, vec!["ai", "news"]);
    assert_eq!(post.history.len(), 3);
    assert_eq!(post.history[2].action, HistoryAction::Edited);
    assert_eq!(post.editor.as_deref(), Some("Maria"));
}

#[tokio::test]
async fn filtering_by_absent_status_is_empty() {
    let (_, console) = editor().await;
    let filter = PostFilter { status: Some(PostStatus::Scheduled), ..Default::default() };
    assert!(console.content.fetch_posts(&filter).await.unwrap().is_empty());

    let query = PostFilter { query: Some("QUARTER".into()), ..Default::default() };
    let found = console.content.fetch_posts(&query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "post-3");
}

#[tokio::test]
async fn ingested_posts_show_up_in_review() {
    let (backend, console) = editor().await;
    let ingested = backend.ingest_post("tg-tech", "Funding round", "A startup raised a seed round").unwrap();
    let posts = console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    assert_eq!(posts[0].id, ingested.id);
    assert_eq!(posts[0].history[0].action, HistoryAction::Created);

    assert!(backend.ingest_post("missing", "x", "y").is_err());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let backend = SeedBackend::seeded();
    let console = console_over(&backend);
    let err = console.session.register("Owner@kr-life.ru", "pw", "Impostor").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(console.session.token().is_none());

    let user = console.session.register("fresh@kr-life.ru", "pw", "Fresh").await.unwrap();
    assert_eq!(user.role, Role::Editor);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let backend = SeedBackend::seeded();
    let console = console_over(&backend);
    let err = console.session.login("owner@kr-life.ru", "nope").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(console.session.error().as_deref(), Some("Invalid email or password"));
}

#[tokio::test]
async fn owner_promotes_editor() {
    let backend = SeedBackend::seeded();
    let console = console_over(&backend);
    console.session.login("owner@kr-life.ru", "owner").await.unwrap();
    let users = console.session.fetch_users().await.unwrap();
    assert_eq!(views::count_role(&users, Role::Editor), 1);

    let promoted = console.session.update_user_role("user-editor", Role::Admin).await.unwrap();
    assert_eq!(promoted.role, Role::Admin);
    assert_eq!(views::count_role(&console.session.users(), Role::Editor), 0);

    let missing = console.session.update_user_role("ghost", Role::Admin).await.unwrap_err();
    assert_eq!(missing.status(), Some(404));
}

#[tokio::test]
async fn restore_after_restart_reuses_token() {
    let backend = SeedBackend::seeded();
    let storage = Arc::new(MemoryStore::new());
    let first = Console::new(Arc::new(backend.clone()), storage.clone());
    first.session.login("admin@kr-life.ru", "admin123").await.unwrap();

    let second = Console::new(Arc::new(backend), storage);
    let user = second.session.restore().await.unwrap().unwrap();
    assert_eq!(user.id, "user-admin");
}

#[tokio::test]
async fn source_changes_are_broadcast() {
    let (_, console) = editor().await;
    let mut events = console.content.subscribe();
    console.content.fetch_sources().await.unwrap();

    let source = console.content.toggle_source_status("site-analytics").await.unwrap();
    assert_eq!(source.status, SourceStatus::Active);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&StoreEvent::SourcesReplaced));
    assert_eq!(seen.last(), Some(&StoreEvent::SourceChanged("site-analytics".into())));

    let err = console.content.update_source_status("nope", SourceStatus::Paused).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Api { status: 404, .. }));
}
