//! Client-side cache of sources and posts plus the moderation operations.
//!
//! Every mutating call issues exactly one backend request and only then
//! splices the returned record into local state. A failed call leaves the
//! collections untouched and hands the error back to the caller.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{ConsoleError, ConsoleResult};
use crate::events::{EventBus, StoreEvent};
use crate::models::*;
use crate::session::SessionStore;

#[derive(Debug, Clone, Default)]
pub struct ContentState {
    pub sources: Vec<Source>,
    pub posts: Vec<Post>,
    pub filters: FilterState,
    pub settings: ContentSettings,
    pub is_loading_sources: bool,
    pub is_loading_posts: bool,
}

pub struct ContentStore {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    state: RwLock<ContentState>,
    events: EventBus,
}

// Replaces the record with the same id, or puts a new one at the front.
fn splice<T, F>(items: &mut Vec<T>, record: T, same: F)
where
    F: Fn(&T, &T) -> bool,
{
    match items.iter_mut().find(|existing| same(existing, &record)) {
        Some(existing) => *existing = record,
        None => items.insert(0, record),
    }
}

fn require(value: &str, what: &str) -> ConsoleResult<()> {
    if value.trim().is_empty() {
        return Err(ConsoleError::Validation(format!("{what} is required")));
    }
    Ok(())
}

impl ContentStore {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>) -> Self {
        Self { backend, session, state: RwLock::new(ContentState::default()), events: EventBus::new() }
    }

    fn read(&self) -> RwLockReadGuard<'_, ContentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ContentState {
        self.read().clone()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.read().sources.clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.read().posts.clone()
    }

    pub fn source(&self, id: &str) -> Option<Source> {
        self.read().sources.iter().find(|s| s.id == id).cloned()
    }

    pub fn post(&self, id: &str) -> Option<Post> {
        self.read().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn filters(&self) -> FilterState {
        self.read().filters.clone()
    }

    pub fn settings(&self) -> ContentSettings {
        self.read().settings.clone()
    }

    pub fn is_loading_sources(&self) -> bool {
        self.read().is_loading_sources
    }

    pub fn is_loading_posts(&self) -> bool {
        self.read().is_loading_posts
    }

    /// Drops every cached record; filters and settings return to defaults.
    pub fn reset(&self) {
        *self.write() = ContentState::default();
        self.events.emit(StoreEvent::SourcesReplaced);
        self.events.emit(StoreEvent::PostsReplaced);
    }

    fn set_loading(&self, apply: impl FnOnce(&mut ContentState)) {
        apply(&mut self.write());
        self.events.emit(StoreEvent::LoadingChanged);
    }

    // ---------------- Sources ----------------------------------------

    pub async fn fetch_sources(&self) -> ConsoleResult<Vec<Source>> {
        let token = self.session.require_token()?;
        self.set_loading(|s| s.is_loading_sources = true);
        let result = self.backend.list_sources(&token).await;
        self.set_loading(|s| s.is_loading_sources = false);
        let sources = result?;
        debug!(count = sources.len(), "sources fetched");
        self.write().sources = sources.clone();
        self.events.emit(StoreEvent::SourcesReplaced);
        Ok(sources)
    }

    pub async fn add_source(&self, new: NewSource) -> ConsoleResult<Source> {
        require(&new.title, "title")?;
        require(&new.handle, "handle")?;
        let token = self.session.require_token()?;
        let new = NewSource { title: new.title.trim().to_string(), handle: new.handle.trim().to_string(), ..new };
        let created = self.backend.create_source(&token, &new).await?;
        info!(id = %created.id, handle = %created.handle, "source added");
        self.apply_source(created)
    }

    pub async fn update_source_status(&self, id: &str, status: SourceStatus) -> ConsoleResult<Source> {
        let token = self.session.require_token()?;
        let updated = self.backend.update_source_status(&token, id, &UpdateSourceStatus { status }).await?;
        info!(id, status = %updated.status, "source status changed");
        self.apply_source(updated)
    }

    /// Flips a source between active and paused based on the cached status.
    pub async fn toggle_source_status(&self, id: &str) -> ConsoleResult<Source> {
        let current = self.source(id).ok_or_else(|| ConsoleError::Validation(format!("unknown source '{id}'")))?;
        self.update_source_status(id, current.status.toggled()).await
    }

    pub async fn update_source_prompts(&self, id: &str, prompts: SourcePrompts) -> ConsoleResult<Source> {
        let token = self.session.require_token()?;
        let updated = self.backend.update_source_prompts(&token, id, &prompts).await?;
        self.apply_source(updated)
    }

    fn apply_source(&self, source: Source) -> ConsoleResult<Source> {
        let id = source.id.clone();
        splice(&mut self.write().sources, source.clone(), |a, b| a.id == b.id);
        self.events.emit(StoreEvent::SourceChanged(id));
        Ok(source)
    }

    // ---------------- Posts ------------------------------------------

    /// Loads the posts matching `filter`, replacing the cached collection.
    pub async fn fetch_posts(&self, filter: &PostFilter) -> ConsoleResult<Vec<Post>> {
        let token = self.session.require_token()?;
        self.set_loading(|s| s.is_loading_posts = true);
        let result = self.backend.list_posts(&token, filter).await;
        self.set_loading(|s| s.is_loading_posts = false);
        let posts = result?;
        debug!(count = posts.len(), ?filter, "posts fetched");
        self.write().posts = posts.clone();
        self.events.emit(StoreEvent::PostsReplaced);
        Ok(posts)
    }

    /// Overwrites title, content and tags; the backend recomputes `updatedAt`.
    pub async fn update_post(&self, id: &str, upd: UpdatePost) -> ConsoleResult<Post> {
        require(&upd.title, "title")?;
        let token = self.session.require_token()?;
        let updated = self.backend.update_post(&token, id, &upd).await?;
        self.apply_post(updated)
    }

    /// Moves a post through the workflow. The history entry comes back from
    /// the backend, it is never built locally.
    pub async fn move_to_status(&self, id: &str, status: PostStatus, comment: Option<String>) -> ConsoleResult<Post> {
        let token = self.session.require_token()?;
        if let Some(current) = self.post(id) {
            if !current.status.can_transition_to(status) {
                warn!(id, from = %current.status, to = %status, "non-forward status transition");
            }
        }
        let change = StatusChange { status, comment: comment.filter(|c| !c.trim().is_empty()) };
        let updated = self.backend.change_post_status(&token, id, &change).await?;
        info!(id, status = %updated.status, history = updated.history.len(), "post moved");
        self.apply_post(updated)
    }

    fn apply_post(&self, post: Post) -> ConsoleResult<Post> {
        let id = post.id.clone();
        splice(&mut self.write().posts, post.clone(), |a, b| a.id == b.id);
        self.events.emit(StoreEvent::PostChanged(id));
        Ok(post)
    }

    // ---------------- Local state ------------------------------------

    pub fn update_filters(&self, upd: FilterUpdate) -> FilterState {
        let filters = {
            let mut s = self.write();
            let f = &mut s.filters;
            if let Some(query) = upd.query {
                f.query = query;
            }
            if let Some(kind) = upd.source_type {
                f.source_type = kind;
            }
            if let Some(status) = upd.source_status {
                f.source_status = status;
            }
            if let Some(status) = upd.post_status {
                f.post_status = status;
            }
            f.clone()
        };
        self.events.emit(StoreEvent::FiltersChanged);
        filters
    }

    pub fn update_settings(&self, upd: SettingsUpdate) -> ContentSettings {
        let settings = {
            let mut s = self.write();
            let cfg = &mut s.settings;
            if let Some(v) = upd.auto_publish_enabled {
                cfg.auto_publish_enabled = v;
            }
            if let Some(v) = upd.default_language {
                cfg.default_language = v;
            }
            if let Some(v) = upd.parser_enabled {
                cfg.parser_enabled = v;
            }
            cfg.clone()
        };
        self.events.emit(StoreEvent::SettingsChanged);
        settings
    }
}
