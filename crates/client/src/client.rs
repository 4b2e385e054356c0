//! Authenticated Sahha API client.
//!
//! Attaches the current bearer token to every request and recovers from an
//! expired access token with a single coordinated refresh.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use sahha_core::{AccessToken, Credentials};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Span, debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::refresh_access_token;
use crate::config::ClientConfig;
use crate::error::{ClientError, RefreshError};
use crate::refresh::{Grant, RefreshCoordinator, Ticket, Turn};
use crate::store::CredentialStore;
use crate::transport::Transport;

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sahha backend API client.
///
/// Cheap to clone; clones share the credential store and the refresh
/// coordinator, so a refresh triggered through one clone is seen by all.
///
/// # Authentication
///
/// The access token is read from the [`CredentialStore`] before every
/// request. A 401 on a first attempt triggers one refresh for all concurrent
/// callers; each affected request is then retried exactly once.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    /// Builds requests; also the default transport
    http: reqwest::Client,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
    /// Resolved once so a bad path never reaches the refresh cycle
    refresh_endpoint: Url,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client that sends requests with `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be created, or
    /// `ClientError::InvalidUrl` if the refresh endpoint cannot be resolved.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        let http = build_http(&config)?;
        let transport: Arc<dyn Transport> = Arc::new(http.clone());
        Self::from_parts(config, store, http, transport)
    }

    /// Create a client that sends requests through a custom transport.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the request builder cannot be created,
    /// or `ClientError::InvalidUrl` if the refresh endpoint cannot be resolved.
    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let http = build_http(&config)?;
        Self::from_parts(config, store, http, transport)
    }

    fn from_parts(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let refresh_endpoint = config.refresh_endpoint()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                transport,
                store,
                refresh: RefreshCoordinator::new(),
                refresh_endpoint,
                config,
            }),
        })
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Start a request to `path`, relative to the configured base URL.
    pub fn request(&self, method: Method, path: &str) -> ApiRequest<'_> {
        ApiRequest {
            client: self,
            method,
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            with_credential: true,
            error: None,
        }
    }

    /// Start a GET request.
    pub fn get(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::GET, path)
    }

    /// Start a POST request.
    pub fn post(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::POST, path)
    }

    /// Start a PUT request.
    pub fn put(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::PUT, path)
    }

    /// Start a PATCH request.
    pub fn patch(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::PATCH, path)
    }

    /// Start a DELETE request.
    pub fn delete(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::DELETE, path)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// The credential store this client reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Clear stored credentials locally.
    pub fn logout(&self) {
        info!("clearing credentials on logout");
        self.inner.store.clear_credentials();
    }

    /// Refresh the access token now, or join a refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Refresh` if the refresh fails (the store is
    /// cleared), or `ClientError::RefreshTimedOut` if another request's
    /// refresh does not settle in time.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AccessToken, ClientError> {
        let current = self.inner.store.access_token();
        let (token, _turn) = self.refresh_or_wait(current.as_ref()).await?;
        Ok(token)
    }

    /// Obtain a fresh access token after `used` was rejected.
    ///
    /// A queued request also gets its [`Turn`], to be dropped once its retry
    /// has been handed to the transport.
    async fn refresh_or_wait(
        &self,
        used: Option<&AccessToken>,
    ) -> Result<(AccessToken, Turn), ClientError> {
        let inner = &self.inner;

        match inner.refresh.begin(inner.store.as_ref(), used) {
            Ticket::AlreadyRefreshed(token) => {
                debug!("access token was refreshed while the request was in flight");
                Ok((token, Turn::default()))
            }
            Ticket::Follower(rx) => {
                let wait = inner.config.refresh_wait_timeout;
                debug!("token refresh in flight, queueing request");
                match tokio::time::timeout(wait, rx).await {
                    Ok(Ok(Grant { outcome, turn })) => Ok((outcome?, turn)),
                    Ok(Err(_)) => Err(RefreshError::Abandoned.into()),
                    Err(_) => {
                        warn!(?wait, "gave up waiting for token refresh");
                        Err(ClientError::RefreshTimedOut(wait))
                    }
                }
            }
            Ticket::Leader(guard) => {
                let outcome = self.perform_refresh().await;
                let released = guard.settle(&outcome).await;
                debug!(released, "released queued requests");
                Ok((outcome?, Turn::default()))
            }
        }
    }

    /// Call the refresh endpoint and update the store with the result.
    ///
    /// On failure the store is cleared before the error is returned.
    async fn perform_refresh(&self) -> Result<AccessToken, RefreshError> {
        let inner = &self.inner;

        let result = async {
            let refresh_token = inner
                .store
                .refresh_token()
                .ok_or(RefreshError::MissingRefreshToken)?;
            let refreshed = refresh_access_token(
                &inner.http,
                inner.transport.as_ref(),
                inner.refresh_endpoint.clone(),
                &refresh_token,
            )
            .await?;

            let rotated = refreshed.refresh_token.is_some();
            inner.store.set_credentials(Credentials::rotated(
                refreshed.access_token.clone(),
                refreshed.refresh_token,
                refresh_token,
            ));
            info!(rotated, "access token refreshed");
            Ok(refreshed.access_token)
        }
        .await;

        if let Err(ref error) = result {
            warn!(%error, "token refresh failed, clearing credentials");
            inner.store.clear_credentials();
        }

        result
    }
}

/// A request being built against the Sahha backend.
///
/// The request is described rather than pre-built so it can be replayed with
/// a new token after a refresh.
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest<'a> {
    client: &'a ApiClient,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    with_credential: bool,
    error: Option<ClientError>,
}

impl ApiRequest<'_> {
    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Send `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(value),
            Err(e) => self.error = Some(e.into()),
        }
        self
    }

    /// Add a header to every attempt of this request.
    ///
    /// Setting `Authorization` replaces the stored bearer token and behaves
    /// like [`without_credential`](Self::without_credential).
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name == AUTHORIZATION {
            self.with_credential = false;
        }
        self.headers.insert(name, value);
        self
    }

    /// Send this request without a bearer token (e.g., login).
    ///
    /// A 401 on such a request is returned as is; no refresh is attempted.
    pub fn without_credential(mut self) -> Self {
        self.with_credential = false;
        self
    }

    /// Send the request, refreshing the access token once on a 401.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` for any non-2xx response that is not
    /// recovered, `ClientError::Http` on network failures,
    /// `ClientError::Refresh` if the token could not be refreshed, and
    /// `ClientError::RefreshTimedOut` if a refresh by another request did not
    /// settle in time.
    #[instrument(
        skip(self),
        fields(method = %self.method, path = %self.path, request_id = tracing::field::Empty)
    )]
    pub async fn send(mut self) -> Result<reqwest::Response, ClientError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let request_id = Uuid::new_v4();
        Span::current().record("request_id", tracing::field::display(&request_id));

        let url = self.url()?;
        let used = if self.with_credential {
            self.client.inner.store.access_token()
        } else {
            None
        };

        let response = self
            .dispatch(&url, used.as_ref(), request_id, Turn::default())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED || !self.with_credential {
            return check_status(&url, response).await;
        }

        debug!("request unauthorized, refreshing access token");
        let (token, turn) = self.client.refresh_or_wait(used.as_ref()).await?;

        // Retried attempts never refresh again.
        let response = self.dispatch(&url, Some(&token), request_id, turn).await?;
        check_status(&url, response).await
    }

    /// Send the request and decode a JSON response body.
    ///
    /// An empty body (e.g., 204 No Content) decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus `ClientError::Json` if the body
    /// does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let response = self.send().await?;
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn url(&self) -> Result<Url, ClientError> {
        let mut url = self.client.inner.config.endpoint(&self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Build and send one attempt.
    ///
    /// `turn` is released as soon as the request is handed to the transport.
    async fn dispatch(
        &self,
        url: &Url,
        token: Option<&AccessToken>,
        request_id: Uuid,
        turn: Turn,
    ) -> Result<reqwest::Response, ClientError> {
        let inner = &self.client.inner;

        let mut builder = inner
            .http
            .request(self.method.clone(), url.clone())
            .timeout(inner.config.request_timeout)
            .header(ACCEPT, "application/json")
            .headers(self.headers.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &self.body {
            builder = builder.json(body);
        }

        let request = builder.build()?;
        let pending = inner.transport.execute(request);
        drop(turn);
        let response = pending.await?;
        debug!(status = %response.status(), authenticated = token.is_some(), "received response");
        Ok(response)
    }
}

fn build_http(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// Pass successful responses through; turn anything else into an error.
async fn check_status(url: &Url, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => {
            warn!(%error, %status, %url, "failed to read error response body");
            String::new()
        }
    };
    Err(ClientError::Status {
        status,
        url: url.to_string(),
        body,
    })
}
