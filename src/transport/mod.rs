// HTTP Transport Layer
// Base URL resolution, bearer injection and the global 401 policy

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn, Instrument};

use crate::config::ApiConfig;
use crate::error::{Result, StoreError};
use crate::observability;
use crate::session::{SessionEnd, SessionHandle};

/// Shared HTTP client for every storefront endpoint
pub struct Transport {
    http: reqwest::Client,

    /// API root without a trailing slash
    base_url: String,

    session: SessionHandle,

    /// Requests issued so far, also used as a per-request generation tag
    issued: AtomicU64,
}

impl Transport {
    pub fn new(config: &ApiConfig, session: SessionHandle) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            issued: AtomicU64::new(0),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Number of requests that actually reached the network layer
    pub fn requests_issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Absolute URLs pass through untouched; anything else hangs off the base URL
    pub fn resolve(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.dispatch(Method::GET, path, |req| req).await?;
        decode(path, resp).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let resp = self.dispatch(Method::GET, path, |req| req.query(query)).await?;
        decode(path, resp).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let resp = self.dispatch(Method::POST, path, |req| req.json(body)).await?;
        decode(path, resp).await
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.dispatch(Method::POST, path, |req| req).await?;
        decode(path, resp).await
    }

    /// POST whose answer is plain text rather than JSON
    pub async fn post_text<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let resp = self.dispatch(Method::POST, path, |req| req.json(body)).await?;
        Ok(resp.text().await?)
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let resp = self.dispatch(Method::PUT, path, |req| req.json(body)).await?;
        decode(path, resp).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.dispatch(Method::DELETE, path, |req| req).await?;
        decode(path, resp).await
    }

    /// Send one request and classify the response.
    /// 2xx comes back as-is, 401 resets the session, anything else becomes
    /// `StoreError::Server` carrying the server's message.
    async fn dispatch<F>(&self, method: Method, path: &str, build: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        // A credential store failure means nothing is sent
        let bearer = self.session.bearer().await?;

        let generation = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let span = observability::request_span(method.as_str(), path, generation);

        async move {
            let mut req = self.http.request(method.clone(), self.resolve(path));
            if let Some(token) = bearer {
                req = req.bearer_auth(token);
            }

            let started = Instant::now();
            let resp = build(req).send().await.map_err(|e| {
                warn!(error = %e, "Request failed before a response arrived");
                StoreError::from(e)
            })?;

            let status = resp.status();
            observability::record_request_duration(
                method.as_str(),
                status.as_u16(),
                started.elapsed().as_millis() as u64,
            );

            if status.is_success() {
                return Ok(resp);
            }

            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                self.handle_unauthorized().await;
            } else {
                debug!(status = status.as_u16(), "Server rejected request");
            }
            Err(StoreError::from_response(status, &body))
        }
        .instrument(span)
        .await
    }

    async fn handle_unauthorized(&self) {
        if let Err(e) = self.session.reset(SessionEnd::Unauthorized).await {
            warn!(error = %e, "Session reset after 401 could not clear the credential");
        }
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| StoreError::Decode(format!("{}: {}", path, e)))
}

fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}
