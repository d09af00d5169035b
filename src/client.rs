//! Thin JSON client over the console API.
//!
//! Every request goes through [`ApiClient::request`]: the URL is built from
//! the base URL plus query parameters, a bearer token is attached when given,
//! non-GET bodies are JSON encoded and any non-2xx response is turned into
//! [`ConsoleError::Api`].

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ConsoleError, ConsoleResult};

/// Query parameters; `None` and empty values are left out of the URL.
pub type Params<'a> = &'a [(&'a str, Option<String>)];

/// Per-request options.
pub struct RequestOptions<'a, B: ?Sized = ()> {
    pub body: Option<&'a B>,
    pub token: Option<&'a str>,
    pub params: Params<'a>,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> RequestOptions<'a, ()> {
    pub fn new() -> Self {
        Self { body: None, token: None, params: &[], cancel: None }
    }
}

impl<'a> Default for RequestOptions<'a, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, B: ?Sized> RequestOptions<'a, B> {
    pub fn json<T: Serialize + ?Sized>(self, body: &'a T) -> RequestOptions<'a, T> {
        RequestOptions { body: Some(body), token: self.token, params: self.params, cancel: self.cancel }
    }

    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    pub fn params(mut self, params: Params<'a>) -> Self {
        self.params = params;
        self
    }

    pub fn cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves `path` against the base URL and appends non-empty params.
    /// Absolute `http(s)` paths are used as-is.
    pub fn build_url(&self, path: &str, params: Params<'_>) -> ConsoleResult<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        let mut url = Url::parse(&raw).map_err(|e| ConsoleError::Config(format!("invalid request URL '{raw}': {e}")))?;
        let present: Vec<(&str, &str)> = params
            .iter()
            .filter_map(|(k, v)| v.as_deref().filter(|v| !v.is_empty()).map(|v| (*k, v)))
            .collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in present {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    pub async fn request<T, B>(&self, method: Method, path: &str, opts: RequestOptions<'_, B>) -> ConsoleResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.build_url(path, opts.params)?;
        let mut req = self.http.request(method.clone(), url.clone());
        if method != Method::GET {
            req = req.header(CONTENT_TYPE, "application/json");
            if let Some(body) = opts.body {
                req = req.body(serde_json::to_vec(body)?);
            }
        }
        if let Some(token) = opts.token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        debug!(%method, %url, "api request");

        let send = async {
            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let err = ConsoleError::from_response(status.as_u16(), &body);
                warn!(%method, %url, status = status.as_u16(), "api request failed: {err}");
                return Err(err);
            }
            Ok(resp.json::<T>().await?)
        };

        match opts.cancel {
            Some(cancel) => tokio::select! {
                _ = cancel.cancelled() => Err(ConsoleError::Cancelled),
                res = send => res,
            },
            None => send.await,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>, params: Params<'_>) -> ConsoleResult<T> {
        let mut opts = RequestOptions::new().params(params);
        opts.token = token;
        self.request(Method::GET, path, opts).await
    }

    pub async fn post<T, B>(&self, path: &str, token: Option<&str>, body: &B) -> ConsoleResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut opts = RequestOptions::new().json(body);
        opts.token = token;
        self.request(Method::POST, path, opts).await
    }

    pub async fn put<T, B>(&self, path: &str, token: &str, body: &B) -> ConsoleResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, RequestOptions::new().json(body).token(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_skips_empty_params() {
        let c = ApiClient::new("http://localhost:3001/api/v1/");
        let params = [
            ("status", Some("new".to_string())),
            ("sourceId", None),
            ("q", Some(String::new())),
        ];
        let url = c.build_url("/posts", &params).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/v1/posts?status=new");
    }

    #[test]
    fn absolute_paths_bypass_base() {
        let c = ApiClient::new("http://localhost:3001/api/v1");
        let url = c.build_url("https://other.test/x", &[]).unwrap();
        assert_eq!(url.as_str(), "https://other.test/x");
    }

    #[test]
    fn params_are_percent_encoded() {
        let c = ApiClient::new("http://localhost:3001/api/v1");
        let params = [("q", Some("ai & tech".to_string()))];
        let url = c.build_url("/posts", &params).unwrap();
        assert_eq!(url.query(), Some("q=ai+%26+tech"));
    }
}
