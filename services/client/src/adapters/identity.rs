//! services/client/src/adapters/identity.rs
//!
//! Implements the `IdentityService` port against the backend's `/auth` and
//! `/user` endpoints.

use async_trait::async_trait;
use folio_core::ports::{AuthGrant, IdentityService, PortResult};
use folio_core::Identity;
use reqwest::Method;
use serde::Serialize;

use super::http::ApiClient;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct FederatedRequest<'a> {
    token: &'a str,
}

#[derive(Clone)]
pub struct HttpIdentityService {
    client: ApiClient,
}

impl HttpIdentityService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        let request = self
            .client
            .request(Method::POST, "/auth/login")
            .map(|r| r.json(&LoginRequest { email, password }));
        self.client.send_json(request).await
    }

    async fn register(&self, email: &str, password: &str, name: &str) -> PortResult<AuthGrant> {
        let request = self
            .client
            .request(Method::POST, "/auth/register")
            .map(|r| r.json(&RegisterRequest { email, password, name }));
        self.client.send_json(request).await
    }

    async fn federated_exchange(&self, provider_token: &str) -> PortResult<AuthGrant> {
        let request = self
            .client
            .request(Method::POST, "/auth/google")
            .map(|r| r.json(&FederatedRequest { token: provider_token }));
        self.client.send_json(request).await
    }

    async fn fetch_profile(&self) -> PortResult<Identity> {
        let request = self.client.request(Method::GET, "/user/profile");
        self.client.send_json(request).await
    }
}
