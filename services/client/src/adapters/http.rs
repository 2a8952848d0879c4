//! services/client/src/adapters/http.rs
//!
//! The authorized transport shared by every HTTP adapter.
//!
//! Each request carries the current credential as a bearer token. Any call that
//! carried a credential and comes back 401 clears the session through the
//! `SessionContext`, no matter which adapter issued it.

use std::time::Duration;

use folio_core::ports::{PortError, PortResult};
use folio_core::SessionContext;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration, session: SessionContext) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Starts a request, attaching the bearer credential if one is published.
    pub(crate) fn request(&self, method: Method, path: &str) -> AuthorizedRequest {
        let token = self.session.token();
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        AuthorizedRequest {
            builder,
            authenticated: token.is_some(),
        }
    }

    /// Sends the request and maps non-success statuses onto `PortError`.
    pub(crate) async fn send(&self, request: AuthorizedRequest) -> PortResult<Response> {
        let response = request
            .builder
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let message = response.text().await.unwrap_or_default();
        debug!("{url} answered {status}: {message}");

        if status == StatusCode::UNAUTHORIZED && request.authenticated {
            warn!("{url} rejected the session credential.");
            self.session.authorization_failed().await;
        }
        Err(status_to_port_error(status, message))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: AuthorizedRequest) -> PortResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed response: {e}")))
    }
}

/// A request builder that remembers whether a credential was attached.
pub(crate) struct AuthorizedRequest {
    builder: RequestBuilder,
    authenticated: bool,
}

impl AuthorizedRequest {
    pub(crate) fn map(self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        Self {
            builder: f(self.builder),
            authenticated: self.authenticated,
        }
    }
}

fn default_headers() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    headers
}

pub(crate) fn status_to_port_error(status: StatusCode, message: String) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::CONFLICT => PortError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => PortError::Invalid(message),
        other => PortError::Rejected {
            status: other.as_u16(),
            message,
        },
    }
}
