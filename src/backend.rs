use async_trait::async_trait;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::ConsoleResult;
use crate::models::*;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> ConsoleResult<AuthResponse>;
    async fn register(&self, req: &RegisterRequest) -> ConsoleResult<AuthResponse>;
    /// Resolves the user behind `token` ("who am I").
    async fn me(&self, token: &str) -> ConsoleResult<User>;
    async fn list_users(&self, token: &str) -> ConsoleResult<Vec<User>>;
    async fn update_user_role(&self, token: &str, id: &str, upd: &UpdateUserRole) -> ConsoleResult<User>;
    async fn update_profile(&self, token: &str, id: &str, upd: &UpdateProfile) -> ConsoleResult<User>;
}

#[async_trait]
pub trait SourceBackend: Send + Sync {
    async fn list_sources(&self, token: &str) -> ConsoleResult<Vec<Source>>;
    async fn create_source(&self, token: &str, new: &NewSource) -> ConsoleResult<Source>;
    async fn update_source_status(&self, token: &str, id: &str, upd: &UpdateSourceStatus) -> ConsoleResult<Source>;
    async fn update_source_prompts(&self, token: &str, id: &str, prompts: &SourcePrompts) -> ConsoleResult<Source>;
}

#[async_trait]
pub trait PostBackend: Send + Sync {
    async fn list_posts(&self, token: &str, filter: &PostFilter) -> ConsoleResult<Vec<Post>>;
    async fn update_post(&self, token: &str, id: &str, upd: &UpdatePost) -> ConsoleResult<Post>;
    /// Applies a status change; the backend owns the history entry it produces.
    async fn change_post_status(&self, token: &str, id: &str, change: &StatusChange) -> ConsoleResult<Post>;
}

pub trait Backend: AuthBackend + SourceBackend + PostBackend {}

impl<T> Backend for T where T: AuthBackend + SourceBackend + PostBackend {}

// `/auth/me` answers either `{ "user": {...} }` or the bare user
#[derive(Deserialize)]
#[serde(untagged)]
enum MeBody {
    Wrapped { user: User },
    Bare(User),
}

impl From<MeBody> for User {
    fn from(body: MeBody) -> Self {
        match body {
            MeBody::Wrapped { user } | MeBody::Bare(user) => user,
        }
    }
}

/// The authoritative backend: the console JSON API over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn login(&self, req: &LoginRequest) -> ConsoleResult<AuthResponse> {
        self.client.post("/auth/login", None, req).await
    }

    async fn register(&self, req: &RegisterRequest) -> ConsoleResult<AuthResponse> {
        self.client.post("/auth/register", None, req).await
    }

    async fn me(&self, token: &str) -> ConsoleResult<User> {
        let body: MeBody = self.client.get("/auth/me", Some(token), &[]).await?;
        Ok(body.into())
    }

    async fn list_users(&self, token: &str) -> ConsoleResult<Vec<User>> {
        self.client.get("/users", Some(token), &[]).await
    }

    async fn update_user_role(&self, token: &str, id: &str, upd: &UpdateUserRole) -> ConsoleResult<User> {
        self.client.put(&format!("/users/{id}"), token, upd).await
    }

    async fn update_profile(&self, token: &str, id: &str, upd: &UpdateProfile) -> ConsoleResult<User> {
        self.client.put(&format!("/users/{id}"), token, upd).await
    }
}

#[async_trait]
impl SourceBackend for HttpBackend {
    async fn list_sources(&self, token: &str) -> ConsoleResult<Vec<Source>> {
        self.client.get("/sources", Some(token), &[]).await
    }

    async fn create_source(&self, token: &str, new: &NewSource) -> ConsoleResult<Source> {
        self.client.post("/sources", Some(token), new).await
    }

    async fn update_source_status(&self, token: &str, id: &str, upd: &UpdateSourceStatus) -> ConsoleResult<Source> {
        self.client.put(&format!("/sources/{id}"), token, upd).await
    }

    async fn update_source_prompts(&self, token: &str, id: &str, prompts: &SourcePrompts) -> ConsoleResult<Source> {
        self.client.put(&format!("/sources/{id}"), token, prompts).await
    }
}

#[async_trait]
impl PostBackend for HttpBackend {
    async fn list_posts(&self, token: &str, filter: &PostFilter) -> ConsoleResult<Vec<Post>> {
        let params = filter.to_params();
        self.client.get("/posts", Some(token), &params).await
    }

    async fn update_post(&self, token: &str, id: &str, upd: &UpdatePost) -> ConsoleResult<Post> {
        self.client.put(&format!("/posts/{id}"), token, upd).await
    }

    async fn change_post_status(&self, token: &str, id: &str, change: &StatusChange) -> ConsoleResult<Post> {
        self.client.post(&format!("/posts/{id}/status"), Some(token), change).await
    }
}
