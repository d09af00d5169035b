//! Authentication state: who is signed in, with which token, and the team.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{ConsoleError, ConsoleResult};
use crate::events::{EventBus, StoreEvent};
use crate::models::*;
use crate::storage::{KeyValueStore, TOKEN_KEY};

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub users: Vec<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct SessionStore {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
    events: EventBus,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require(value: &str, what: &str) -> ConsoleResult<()> {
    if value.trim().is_empty() {
        return Err(ConsoleError::Validation(format!("{what} is required")));
    }
    Ok(())
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { backend, storage, state: RwLock::new(SessionState::default()), events: EventBus::new() }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// Token for an authenticated call, or [`ConsoleError::Unauthenticated`].
    pub fn require_token(&self) -> ConsoleResult<String> {
        self.token().ok_or(ConsoleError::Unauthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn users(&self) -> Vec<User> {
        self.read().users.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn clear_error(&self) {
        let had_error = self.write().error.take().is_some();
        if had_error {
            self.events.emit(StoreEvent::SessionError);
        }
    }

    fn begin(&self) {
        let mut s = self.write();
        s.is_loading = true;
        s.error = None;
    }

    // Records a failed attempt; token and user stay as they were.
    fn fail(&self, err: ConsoleError) -> ConsoleError {
        {
            let mut s = self.write();
            s.is_loading = false;
            s.error = Some(err.to_string());
        }
        self.events.emit(StoreEvent::SessionError);
        err
    }

    fn sign_in(&self, auth: AuthResponse) -> ConsoleResult<User> {
        self.storage.set(TOKEN_KEY, &auth.token)?;
        {
            let mut s = self.write();
            s.token = Some(auth.token);
            s.user = Some(auth.user.clone());
            s.is_loading = false;
            s.error = None;
        }
        info!(user = %auth.user.email, role = %auth.user.role, "signed in");
        self.events.emit(StoreEvent::SignedIn);
        Ok(auth.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ConsoleResult<User> {
        if let Err(e) = require(email, "email").and_then(|_| require(password, "password")) {
            return Err(self.fail(e));
        }
        self.begin();
        let req = LoginRequest { email: normalize_email(email), password: password.to_string() };
        match self.backend.login(&req).await {
            Ok(auth) => self.sign_in(auth).map_err(|e| self.fail(e)),
            Err(e) => {
                warn!(email = %req.email, "login failed: {e}");
                Err(self.fail(e))
            }
        }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> ConsoleResult<User> {
        if let Err(e) = require(name, "name")
            .and_then(|_| require(email, "email"))
            .and_then(|_| require(password, "password"))
        {
            return Err(self.fail(e));
        }
        let email = normalize_email(email);
        let taken = self.read().users.iter().any(|u| u.email == email);
        if taken {
            return Err(self.fail(ConsoleError::Validation("A user with this email already exists".to_string())));
        }
        self.begin();
        let req = RegisterRequest { email, password: password.to_string(), name: name.trim().to_string() };
        match self.backend.register(&req).await {
            Ok(auth) => {
                let user = self.sign_in(auth).map_err(|e| self.fail(e))?;
                self.write().users.push(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!(email = %req.email, "registration failed: {e}");
                Err(self.fail(e))
            }
        }
    }

    /// Picks up a stored token and confirms it with a single `/auth/me` probe.
    /// Returns the signed-in user, or `None` when there is no usable token.
    pub async fn restore(&self) -> ConsoleResult<Option<User>> {
        let Some(token) = self.storage.get(TOKEN_KEY) else { return Ok(None) };
        match self.backend.me(&token).await {
            Ok(user) => {
                {
                    let mut s = self.write();
                    s.token = Some(token);
                    s.user = Some(user.clone());
                }
                info!(user = %user.email, "session restored");
                self.events.emit(StoreEvent::SignedIn);
                Ok(Some(user))
            }
            Err(e) if e.is_unauthorized() => {
                warn!("stored token rejected, clearing it");
                self.storage.remove(TOKEN_KEY)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_users(&self) -> ConsoleResult<Vec<User>> {
        let token = self.require_token()?;
        let users = self.backend.list_users(&token).await?;
        self.write().users = users.clone();
        self.events.emit(StoreEvent::UsersReplaced);
        Ok(users)
    }

    /// Owner-only role reassignment.
    pub async fn update_user_role(&self, user_id: &str, role: Role) -> ConsoleResult<User> {
        let token = self.require_token()?;
        if self.user().map(|u| u.role) != Some(Role::Owner) {
            return Err(ConsoleError::Forbidden);
        }
        let updated = self.backend.update_user_role(&token, user_id, &UpdateUserRole { role }).await?;
        self.merge_user(&updated);
        Ok(updated)
    }

    /// Renames the signed-in user.
    pub async fn update_profile(&self, name: &str) -> ConsoleResult<User> {
        let token = self.require_token()?;
        require(name, "name")?;
        let current = self.user().ok_or(ConsoleError::Unauthenticated)?;
        let upd = UpdateProfile { name: name.trim().to_string() };
        let updated = self.backend.update_profile(&token, &current.id, &upd).await?;
        self.merge_user(&updated);
        Ok(updated)
    }

    fn merge_user(&self, updated: &User) {
        {
            let mut s = self.write();
            for cached in s.users.iter_mut().filter(|u| u.id == updated.id) {
                *cached = updated.clone();
            }
            if let Some(me) = s.user.as_mut().filter(|me| me.id == updated.id) {
                *me = updated.clone();
            }
        }
        self.events.emit(StoreEvent::UserChanged(updated.id.clone()));
    }

    /// Forgets the session locally; there is no server-side invalidation.
    pub fn logout(&self) -> ConsoleResult<()> {
        self.storage.remove(TOKEN_KEY)?;
        {
            let mut s = self.write();
            s.token = None;
            s.user = None;
            s.users.clear();
            s.error = None;
        }
        info!("signed out");
        self.events.emit(StoreEvent::SignedOut);
        Ok(())
    }
}
