use std::sync::Arc;

use krlife_console::backend::HttpBackend;
use krlife_console::client::ApiClient;
use krlife_console::models::*;
use krlife_console::storage::MemoryStore;
use krlife_console::{Console, ConsoleError};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Source {id}"),
        "handle": format!("@{id}"),
        "type": "telegram",
        "status": status,
        "createdAt": "2026-10-01T08:00:00Z",
        "filterPrompt": "",
        "formatPrompt": ""
    })
}

fn post_json(id: &str, status: &str, history: Value) -> Value {
    json!({
        "id": id,
        "sourceId": "s1",
        "title": format!("Post {id}"),
        "content": "body",
        "originalContent": "body",
        "status": status,
        "tags": ["news"],
        "history": history,
        "createdAt": "2026-10-10T08:00:00Z",
        "updatedAt": "2026-10-10T09:00:00Z",
        "author": "System"
    })
}

fn created_entry() -> Value {
    json!({"id": "h1", "timestamp": "2026-10-10T08:00:00Z", "author": "System", "action": "created", "comment": "Imported"})
}

async fn signed_in() -> (MockServer, Console) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok",
            "user": {"id": "ed", "email": "editor@kr-life.ru", "name": "Maria", "role": "editor"}
        })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(ApiClient::new(format!("{}/api/v1", server.uri())));
    let console = Console::new(Arc::new(backend), Arc::new(MemoryStore::new()));
    console.session.login("editor@kr-life.ru", "pw").await.unwrap();
    (server, console)
}

#[tokio::test]
async fn calls_without_session_are_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let backend = HttpBackend::new(ApiClient::new(format!("{}/api/v1", server.uri())));
    let console = Console::new(Arc::new(backend), Arc::new(MemoryStore::new()));
    assert!(matches!(console.content.fetch_sources().await, Err(ConsoleError::Unauthenticated)));
    assert!(matches!(console.content.fetch_posts(&PostFilter::default()).await, Err(ConsoleError::Unauthenticated)));
}

#[tokio::test]
async fn fetch_replaces_collections() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([source_json("s1", "active"), source_json("s2", "paused")])))
        .mount(&server)
        .await;

    let sources = console.content.fetch_sources().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(console.content.sources().len(), 2);
    assert!(!console.content.is_loading_sources());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([source_json("s3", "active")])))
        .mount(&server)
        .await;
    console.content.fetch_sources().await.unwrap();
    let ids: Vec<_> = console.content.sources().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["s3"]);
}

#[tokio::test]
async fn post_filter_becomes_query_params() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("status", "published"))
        .and(query_param("sourceId", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json("p1", "published", json!([]))])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = PostFilter { status: Some(PostStatus::Published), source_id: Some("s1".into()), query: None };
    let posts = console.content.fetch_posts(&filter).await.unwrap();
    assert_eq!(posts[0].status, PostStatus::Published);
}

#[tokio::test]
async fn pause_then_resume_restores_status() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([source_json("s1", "active")])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/sources/s1"))
        .and(body_json(json!({"status": "paused"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_json("s1", "paused")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/sources/s1"))
        .and(body_json(json!({"status": "active"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_json("s1", "active")))
        .mount(&server)
        .await;

    console.content.fetch_sources().await.unwrap();
    let paused = console.content.toggle_source_status("s1").await.unwrap();
    assert_eq!(paused.status, SourceStatus::Paused);
    assert_eq!(console.content.source("s1").unwrap().status, SourceStatus::Paused);

    let active = console.content.update_source_status("s1", SourceStatus::Active).await.unwrap();
    assert_eq!(active.status, SourceStatus::Active);
    assert_eq!(console.content.sources().len(), 1);
}

#[tokio::test]
async fn add_source_validates_and_prepends() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([source_json("s1", "active")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sources"))
        .and(body_json(json!({
            "title": "Fresh", "handle": "@fresh", "type": "telegram", "status": "active",
            "filterPrompt": "", "formatPrompt": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(source_json("s9", "active")))
        .expect(1)
        .mount(&server)
        .await;

    console.content.fetch_sources().await.unwrap();
    let blank = NewSource {
        title: "  ".into(),
        handle: "@x".into(),
        kind: SourceType::Telegram,
        status: SourceStatus::Active,
        filter_prompt: String::new(),
        format_prompt: String::new(),
    };
    assert!(matches!(console.content.add_source(blank.clone()).await, Err(ConsoleError::Validation(_))));

    let fresh = NewSource { title: " Fresh ".into(), handle: "@fresh ".into(), ..blank };
    console.content.add_source(fresh).await.unwrap();
    let ids: Vec<_> = console.content.sources().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["s9", "s1"]);
}

#[tokio::test]
async fn move_to_status_uses_server_history() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json("p1", "new", json!([created_entry()]))])))
        .mount(&server)
        .await;
    let approved = json!({"id": "h2", "timestamp": "2026-10-10T10:00:00Z", "author": "Maria", "action": "approved", "comment": "Looks good"});
    Mock::given(method("POST"))
        .and(path("/api/v1/posts/p1/status"))
        .and(body_json(json!({"status": "approved", "comment": "Looks good"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(post_json("p1", "approved", json!([created_entry(), approved]))))
        .expect(1)
        .mount(&server)
        .await;

    console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    let moved = console
        .content
        .move_to_status("p1", PostStatus::Approved, Some("Looks good".into()))
        .await
        .unwrap();
    assert_eq!(moved.history.len(), 2);
    assert_eq!(moved.history[0].id, "h1");

    let cached = console.content.post("p1").unwrap();
    assert_eq!(cached.status, PostStatus::Approved);
    assert_eq!(cached.history[1].action, HistoryAction::Approved);
}

#[tokio::test]
async fn blank_comment_is_not_sent() {
    let (server, console) = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/posts/p1/status"))
        .and(body_json(json!({"status": "rejected"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(post_json("p1", "rejected", json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    console.content.move_to_status("p1", PostStatus::Rejected, Some("   ".into())).await.unwrap();
    // absent from the cache before, spliced in at the front
    assert_eq!(console.content.posts()[0].id, "p1");
}

#[tokio::test]
async fn rejected_mutation_leaves_state_untouched() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json("p1", "new", json!([created_entry()]))])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/posts/p1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Session expired"})))
        .mount(&server)
        .await;

    console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    let upd = UpdatePost { title: "Changed".into(), content: "x".into(), tags: vec![] };
    let err = console.content.update_post("p1", upd).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Session expired");
    assert_eq!(console.content.post("p1").unwrap().title, "Post p1");
}

#[tokio::test]
async fn filters_and_settings_merge_partial_updates() {
    let (_server, console) = signed_in().await;
    let filters = console.content.update_filters(FilterUpdate {
        query: Some("ai".into()),
        source_status: Some(Selection::Only(SourceStatus::Paused)),
        ..Default::default()
    });
    assert_eq!(filters.query, "ai");
    assert_eq!(filters.source_type, Selection::All);

    let settings = console.content.update_settings(SettingsUpdate { auto_publish_enabled: Some(true), ..Default::default() });
    assert!(settings.auto_publish_enabled);
    assert_eq!(settings.default_language, Language::Ru);
    assert!(settings.parser_enabled);

    console.logout().unwrap();
    assert_eq!(console.content.filters().query, "");
    assert!(!console.content.settings().auto_publish_enabled);
}

#[tokio::test]
async fn prompts_are_replaced_together() {
    let (server, console) = signed_in().await;
    let mut updated = source_json("s1", "active");
    updated["filterPrompt"] = json!("Only AI news");
    updated["formatPrompt"] = json!("Three bullets");
    Mock::given(method("PUT"))
        .and(path("/api/v1/sources/s1"))
        .and(body_json(json!({"filterPrompt": "Only AI news", "formatPrompt": "Three bullets"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let prompts = SourcePrompts { filter_prompt: "Only AI news".into(), format_prompt: "Three bullets".into() };
    let source = console.content.update_source_prompts("s1", prompts).await.unwrap();
    assert_eq!(source.filter_prompt, "Only AI news");
    assert_eq!(console.content.source("s1").unwrap().format_prompt, "Three bullets");
}

#[tokio::test]
async fn unauthorized_mutations_leave_collections_untouched() {
    let (server, console) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([source_json("s1", "active")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json("p1", "new", json!([created_entry()]))])))
        .mount(&server)
        .await;
    let expired = ResponseTemplate::new(401).set_body_json(json!({"error": "Session expired"}));
    for (verb, route) in [
        ("POST", "/api/v1/sources"),
        ("PUT", "/api/v1/sources/s1"),
        ("POST", "/api/v1/posts/p1/status"),
    ] {
        Mock::given(method(verb)).and(path(route)).respond_with(expired.clone()).mount(&server).await;
    }

    console.content.fetch_sources().await.unwrap();
    console.content.fetch_posts(&PostFilter::default()).await.unwrap();
    let sources = console.content.sources();
    let posts = console.content.posts();

    let new = NewSource {
        title: "Fresh".into(),
        handle: "@fresh".into(),
        kind: SourceType::Telegram,
        status: SourceStatus::Active,
        filter_prompt: String::new(),
        format_prompt: String::new(),
    };
    let prompts = SourcePrompts { filter_prompt: "f".into(), format_prompt: "g".into() };
    let errors = [
        console.content.add_source(new).await.unwrap_err(),
        console.content.update_source_status("s1", SourceStatus::Paused).await.unwrap_err(),
        console.content.update_source_prompts("s1", prompts).await.unwrap_err(),
        console.content.move_to_status("p1", PostStatus::Approved, Some("ok".into())).await.unwrap_err(),
    ];
    for err in &errors {
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Session expired");
    }
    assert_eq!(console.content.sources(), sources);
    assert_eq!(console.content.posts(), posts);
}
