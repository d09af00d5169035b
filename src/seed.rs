//! In-memory backend seeded with demo data.
//!
//! Emulates the console API without a network: tokens map to users, ids are
//! random UUIDs and history entries are appended here, the way the server
//! appends them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::backend::{AuthBackend, PostBackend, SourceBackend};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::*;

const SYSTEM_AUTHOR: &str = "System";

#[derive(Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    sessions: HashMap<String, Id>, // token -> user id
    sources: Vec<Source>,
    posts: Vec<Post>,
}

#[derive(Clone, Default)]
pub struct SeedBackend {
    state: Arc<RwLock<State>>,
}

fn new_id() -> Id {
    Uuid::new_v4().to_string()
}

fn event(at: DateTime<Utc>, author: &str, action: HistoryAction, comment: &str) -> PostHistoryEvent {
    PostHistoryEvent {
        id: new_id(),
        timestamp: at,
        author: author.to_string(),
        action,
        comment: Some(comment.to_string()),
    }
}

fn not_found(what: &str, id: &str) -> ConsoleError {
    ConsoleError::api(404, format!("{what} '{id}' not found"))
}

impl SeedBackend {
    /// Backend with no users, sources or posts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backend holding the demo team, three sources and three posts.
    pub fn seeded() -> Self {
        let backend = Self::empty();
        {
            let mut s = backend.write();
            s.accounts = seed_accounts();
            s.sources = seed_sources(Utc::now());
            s.posts = seed_posts(Utc::now());
        }
        backend
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a post as the ingestion pipeline would, with a `created` entry.
    pub fn ingest_post(&self, source_id: &str, title: &str, content: &str) -> ConsoleResult<Post> {
        let mut s = self.write();
        let source = s.sources.iter().find(|src| src.id == source_id).ok_or_else(|| not_found("source", source_id))?;
        let now = Utc::now();
        let post = Post {
            id: new_id(),
            source_id: source.id.clone(),
            source_title: Some(source.title.clone()),
            source_handle: Some(source.handle.clone()),
            title: title.to_string(),
            content: content.to_string(),
            original_content: content.to_string(),
            status: PostStatus::New,
            scheduled_for: None,
            published_at: None,
            tags: Vec::new(),
            history: vec![event(now, SYSTEM_AUTHOR, HistoryAction::Created, &format!("Received from {}", source.handle))],
            created_at: now,
            updated_at: now,
            author: SYSTEM_AUTHOR.to_string(),
            editor: None,
        };
        s.posts.insert(0, post.clone());
        Ok(post)
    }

    fn session_user(s: &State, token: &str) -> ConsoleResult<User> {
        s.sessions
            .get(token)
            .and_then(|uid| s.accounts.iter().find(|a| &a.user.id == uid))
            .map(|a| a.user.clone())
            .ok_or_else(|| ConsoleError::api(401, "Authorization required"))
    }

    fn open_session(s: &mut State, user: &User) -> AuthResponse {
        let token = new_id();
        s.sessions.insert(token.clone(), user.id.clone());
        AuthResponse { token, user: user.clone() }
    }

    fn update_account(&self, token: &str, id: &str, apply: impl FnOnce(&mut User)) -> ConsoleResult<User> {
        let mut s = self.write();
        Self::session_user(&s, token)?;
        let account = s.accounts.iter_mut().find(|a| a.user.id == id).ok_or_else(|| not_found("user", id))?;
        apply(&mut account.user);
        Ok(account.user.clone())
    }

    fn update_source(&self, token: &str, id: &str, apply: impl FnOnce(&mut Source)) -> ConsoleResult<Source> {
        let mut s = self.write();
        Self::session_user(&s, token)?;
        let source = s.sources.iter_mut().find(|src| src.id == id).ok_or_else(|| not_found("source", id))?;
        apply(source);
        source.updated_at = Some(Utc::now());
        Ok(source.clone())
    }
}

#[async_trait]
impl AuthBackend for SeedBackend {
    async fn login(&self, req: &LoginRequest) -> ConsoleResult<AuthResponse> {
        let mut s = self.write();
        let email = req.email.trim().to_lowercase();
        let user = s
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == req.password)
            .map(|a| a.user.clone())
            .ok_or_else(|| ConsoleError::api(401, "Invalid email or password"))?;
        Ok(Self::open_session(&mut s, &user))
    }

    async fn register(&self, req: &RegisterRequest) -> ConsoleResult<AuthResponse> {
        let mut s = self.write();
        let email = req.email.trim().to_lowercase();
        if s.accounts.iter().any(|a| a.user.email == email) {
            return Err(ConsoleError::api(409, "A user with this email already exists"));
        }
        let user = User { id: new_id(), email, name: req.name.trim().to_string(), role: Role::Editor };
        s.accounts.push(Account { user: user.clone(), password: req.password.clone() });
        Ok(Self::open_session(&mut s, &user))
    }

    async fn me(&self, token: &str) -> ConsoleResult<User> {
        Self::session_user(&self.read(), token)
    }

    async fn list_users(&self, token: &str) -> ConsoleResult<Vec<User>> {
        let s = self.read();
        Self::session_user(&s, token)?;
        Ok(s.accounts.iter().map(|a| a.user.clone()).collect())
    }

    async fn update_user_role(&self, token: &str, id: &str, upd: &UpdateUserRole) -> ConsoleResult<User> {
        let caller = Self::session_user(&self.read(), token)?;
        if caller.role != Role::Owner {
            return Err(ConsoleError::api(403, "Only the owner can change roles"));
        }
        let role = upd.role;
        self.update_account(token, id, |u| u.role = role)
    }

    async fn update_profile(&self, token: &str, id: &str, upd: &UpdateProfile) -> ConsoleResult<User> {
        let caller = Self::session_user(&self.read(), token)?;
        if caller.id != id && caller.role != Role::Owner {
            return Err(ConsoleError::api(403, "Cannot edit another user's profile"));
        }
        let name = upd.name.trim().to_string();
        self.update_account(token, id, |u| u.name = name)
    }
}

#[async_trait]
impl SourceBackend for SeedBackend {
    async fn list_sources(&self, token: &str) -> ConsoleResult<Vec<Source>> {
        let s = self.read();
        Self::session_user(&s, token)?;
        Ok(s.sources.clone())
    }

    async fn create_source(&self, token: &str, new: &NewSource) -> ConsoleResult<Source> {
        let mut s = self.write();
        let caller = Self::session_user(&s, token)?;
        let source = Source {
            id: new_id(),
            title: new.title.clone(),
            handle: new.handle.clone(),
            kind: new.kind,
            status: new.status,
            created_at: Utc::now(),
            updated_at: None,
            owner_id: Some(caller.id),
            filter_prompt: new.filter_prompt.clone(),
            format_prompt: new.format_prompt.clone(),
        };
        s.sources.insert(0, source.clone()); // newest first
        Ok(source)
    }

    async fn update_source_status(&self, token: &str, id: &str, upd: &UpdateSourceStatus) -> ConsoleResult<Source> {
        let status = upd.status;
        self.update_source(token, id, |src| src.status = status)
    }

    async fn update_source_prompts(&self, token: &str, id: &str, prompts: &SourcePrompts) -> ConsoleResult<Source> {
        self.update_source(token, id, |src| {
            src.filter_prompt = prompts.filter_prompt.clone();
            src.format_prompt = prompts.format_prompt.clone();
        })
    }
}

#[async_trait]
impl PostBackend for SeedBackend {
    async fn list_posts(&self, token: &str, filter: &PostFilter) -> ConsoleResult<Vec<Post>> {
        let s = self.read();
        Self::session_user(&s, token)?;
        let needle = filter.query.as_deref().map(str::to_lowercase).filter(|q| !q.is_empty());
        Ok(s.posts
            .iter()
            .filter(|p| filter.status.map_or(true, |st| p.status == st))
            .filter(|p| filter.source_id.as_deref().map_or(true, |sid| p.source_id == sid))
            .filter(|p| {
                needle.as_deref().map_or(true, |q| {
                    p.title.to_lowercase().contains(q) || p.content.to_lowercase().contains(q)
                })
            })
            .cloned()
            .collect())
    }

    async fn update_post(&self, token: &str, id: &str, upd: &UpdatePost) -> ConsoleResult<Post> {
        let mut s = self.write();
        let caller = Self::session_user(&s, token)?;
        let post = s.posts.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found("post", id))?;
        let now = Utc::now();
        post.title = upd.title.clone();
        post.content = upd.content.clone();
        post.tags = upd.tags.clone();
        post.updated_at = now;
        post.editor = Some(caller.name.clone());
        post.history.push(PostHistoryEvent {
            id: new_id(),
            timestamp: now,
            author: caller.name,
            action: HistoryAction::Edited,
            comment: None,
        });
        Ok(post.clone())
    }

    async fn change_post_status(&self, token: &str, id: &str, change: &StatusChange) -> ConsoleResult<Post> {
        let mut s = self.write();
        let caller = Self::session_user(&s, token)?;
        let post = s.posts.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found("post", id))?;
        let now = Utc::now();
        post.status = change.status;
        post.updated_at = now;
        if change.status == PostStatus::Published {
            post.published_at = Some(now);
        }
        post.history.push(PostHistoryEvent {
            id: new_id(),
            timestamp: now,
            author: caller.name,
            action: HistoryAction::for_status(change.status),
            comment: change.comment.clone(),
        });
        Ok(post.clone())
    }
}

// ---------------- Demo data ------------------------------------------

fn seed_accounts() -> Vec<Account> {
    let account = |id: &str, email: &str, name: &str, role: Role, password: &str| Account {
        user: User { id: id.to_string(), email: email.to_string(), name: name.to_string(), role },
        password: password.to_string(),
    };
    vec![
        account("owner", "owner@kr-life.ru", "Irina", Role::Owner, "owner"),
        account("user-admin", "admin@kr-life.ru", "Alexey", Role::Admin, "admin123"),
        account("user-editor", "editor@kr-life.ru", "Maria", Role::Editor, "editor123"),
    ]
}

fn seed_sources(now: DateTime<Utc>) -> Vec<Source> {
    let source = |id: &str, title: &str, handle: &str, kind, status, filter: &str, format: &str| Source {
        id: id.to_string(),
        title: title.to_string(),
        handle: handle.to_string(),
        kind,
        status,
        created_at: now,
        updated_at: None,
        owner_id: None,
        filter_prompt: filter.to_string(),
        format_prompt: format.to_string(),
    };
    vec![
        source(
            "tg-kr-life",
            "KR Life News",
            "@kr_life_news",
            SourceType::Telegram,
            SourceStatus::Active,
            "Keep only KR Life material, analysis and key regional events.",
            "Headline, a short lead and three key points as a list.",
        ),
        source(
            "tg-tech",
            "Tech Digest",
            "@tech_digest",
            SourceType::Telegram,
            SourceStatus::Active,
            "Pick news about AI, startups and technology investment.",
            "A short digest with emoji and links at the end.",
        ),
        source(
            "site-analytics",
            "KR Analytics",
            "https://analytics.kr-life.ru",
            SourceType::Website,
            SourceStatus::Paused,
            "Parse only analytical articles on regional finance and economy.",
            "Keep the analytical tone, add a block of key metrics.",
        ),
    ]
}

fn seed_posts(now: DateTime<Utc>) -> Vec<Post> {
    let earlier = now - Duration::hours(2);
    vec![
        Post {
            id: "post-1".into(),
            source_id: "tg-kr-life".into(),
            source_title: Some("KR Life News".into()),
            source_handle: Some("@kr_life_news".into()),
            title: "Key trends of the week".into(),
            content: "Refreshed the key trends of the week. Check the emphasis before publishing.".into(),
            original_content: "Key trends of the week, original text".into(),
            status: PostStatus::New,
            scheduled_for: None,
            published_at: None,
            tags: vec!["trends".into(), "review".into()],
            history: vec![event(now, SYSTEM_AUTHOR, HistoryAction::Created, "Received from @kr_life_news")],
            created_at: now,
            updated_at: now,
            author: SYSTEM_AUTHOR.into(),
            editor: None,
        },
        Post {
            id: "post-2".into(),
            source_id: "tg-tech".into(),
            source_title: Some("Tech Digest".into()),
            source_handle: Some("@tech_digest".into()),
            title: "AI updates".into(),
            content: "Collected AI industry updates. Add a CTA and check the links.".into(),
            original_content: "Original text about AI".into(),
            status: PostStatus::Editing,
            scheduled_for: None,
            published_at: None,
            tags: vec!["ai".into()],
            history: vec![
                event(earlier, SYSTEM_AUTHOR, HistoryAction::Created, "Imported from @tech_digest"),
                event(now, "Maria", HistoryAction::Edited, "Added current market growth figures."),
            ],
            created_at: earlier,
            updated_at: now,
            author: SYSTEM_AUTHOR.into(),
            editor: Some("Maria".into()),
        },
        Post {
            id: "post-3".into(),
            source_id: "site-analytics".into(),
            source_title: Some("KR Analytics".into()),
            source_handle: Some("https://analytics.kr-life.ru".into()),
            title: "Quarter results".into(),
            content: "Ready to publish. Check link formatting.".into(),
            original_content: "Quarter results, original text".into(),
            status: PostStatus::Published,
            scheduled_for: None,
            published_at: Some(now),
            tags: vec!["finance".into()],
            history: vec![
                event(earlier, SYSTEM_AUTHOR, HistoryAction::Created, "Loaded from analytics.kr-life.ru"),
                event(earlier, "Ivan", HistoryAction::Approved, "Ready to publish"),
                event(now, "Ivan", HistoryAction::Published, "Sent to Telegram"),
            ],
            created_at: earlier,
            updated_at: now,
            author: "Ivan".into(),
            editor: None,
        },
    ]
}
