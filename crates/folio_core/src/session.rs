//! crates/folio_core/src/session.rs
//!
//! The published session and the identity lifecycle around it.
//!
//! `SessionContext` is the single owner of "who is signed in". It is cloned into
//! every component that needs the identity or the credential, including the
//! authorized transport that enforces the global 401 rule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::domain::{Identity, Session};
use crate::ports::{AuthGrant, IdentityService, LocalStore, PortError};
use crate::validation::{validate_registration, ValidationError};

/// Persisted key holding the serialized identity.
pub const IDENTITY_KEY: &str = "user";
/// Persisted key holding the bearer credential.
pub const CREDENTIAL_KEY: &str = "token";

pub const DEFAULT_UPGRADE_DELAY: Duration = Duration::from_millis(2000);

/// Navigation the core asks the surrounding application to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
}

//=========================================================================================
// SessionContext
//=========================================================================================

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    current: watch::Sender<Option<Session>>,
    redirects: broadcast::Sender<Redirect>,
    store: Arc<dyn LocalStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        let (current, _) = watch::channel(None);
        let (redirects, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(ContextInner {
                current,
                redirects,
                store,
            }),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|session| session.identity.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|session| session.token.clone())
    }

    /// Observes every publication, including clears.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    pub fn redirects(&self) -> broadcast::Receiver<Redirect> {
        self.inner.redirects.subscribe()
    }

    /// Clears the session after any authenticated call was rejected as unauthorized.
    pub async fn authorization_failed(&self) {
        warn!("Authorization rejected by the server. Clearing the session.");
        self.clear().await;
        // No receivers just means nobody is listening for navigation.
        let _ = self.inner.redirects.send(Redirect::Login);
    }

    /// Publishes and persists a session. Persistence failures are logged;
    /// the session stays usable for the lifetime of the process.
    pub(crate) async fn publish(&self, session: Session) {
        self.persist(&session).await;
        self.inner.current.send_replace(Some(session));
    }

    /// Publishes a session read back from storage, without writing it again.
    fn publish_restored(&self, session: Session) {
        self.inner.current.send_replace(Some(session));
    }

    pub(crate) async fn clear(&self) {
        self.inner.current.send_replace(None);
        for key in [IDENTITY_KEY, CREDENTIAL_KEY] {
            if let Err(e) = self.inner.store.remove(key).await {
                error!("Failed to remove persisted {key}: {e}");
            }
        }
    }

    async fn persist(&self, session: &Session) {
        match serde_json::to_string(&session.identity) {
            Ok(json) => {
                if let Err(e) = self.inner.store.set(IDENTITY_KEY, &json).await {
                    error!("Failed to persist identity: {e}");
                }
            }
            Err(e) => error!("Failed to serialize identity: {e}"),
        }
        if let Err(e) = self.inner.store.set(CREDENTIAL_KEY, &session.token).await {
            error!("Failed to persist credential: {e}");
        }
    }

    fn store(&self) -> &Arc<dyn LocalStore> {
        &self.inner.store
    }
}

//=========================================================================================
// SessionManager
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No federated identity provider is configured")]
    ProviderUnavailable,
    #[error("Federated token exchange failed")]
    ExchangeFailed,
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("An account with this email already exists")]
    DuplicateAccount,
    #[error("No reader is signed in")]
    NotSignedIn,
    #[error("Identity service error: {0}")]
    Port(#[from] PortError),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Whether a federated identity provider is present in the environment.
    pub federated_provider: bool,
    /// Simulated processing time of an entitlement upgrade.
    pub upgrade_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            federated_provider: false,
            upgrade_delay: DEFAULT_UPGRADE_DELAY,
        }
    }
}

pub struct SessionManager {
    context: SessionContext,
    identity_service: Arc<dyn IdentityService>,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(
        context: SessionContext,
        identity_service: Arc<dyn IdentityService>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            context,
            identity_service,
            settings,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Republishes the persisted session, if any.
    ///
    /// The credential is trusted as-is; a revoked one is only discovered when
    /// the next authenticated call is rejected.
    pub async fn restore_session(&self) -> Option<Session> {
        let store = self.context.store();
        let (user, token) = match (store.get(IDENTITY_KEY).await, store.get(CREDENTIAL_KEY).await) {
            (Ok(Some(user)), Ok(Some(token))) => (user, token),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to read the persisted session: {e}");
                return None;
            }
            _ => {
                debug!("No persisted session found.");
                return None;
            }
        };

        match serde_json::from_str::<Identity>(&user) {
            Ok(identity) => {
                info!("Restored session for {}", identity.email);
                let session = Session { identity, token };
                self.context.publish_restored(session.clone());
                Some(session)
            }
            Err(e) => {
                warn!("Persisted identity is unreadable, starting signed out: {e}");
                None
            }
        }
    }

    pub async fn establish_session(&self, email: &str, password: &str) -> Result<(), SessionError> {
        match self.identity_service.login(email, password).await {
            Ok(grant) => {
                self.adopt(grant).await;
                Ok(())
            }
            Err(e) => {
                error!("Login error: {e}");
                Err(SessionError::InvalidCredentials)
            }
        }
    }

    pub async fn establish_federated_session(&self, provider_token: &str) -> Result<(), SessionError> {
        if !self.settings.federated_provider {
            error!("Federated login requested but no provider is available.");
            return Err(SessionError::ProviderUnavailable);
        }
        match self.identity_service.federated_exchange(provider_token).await {
            Ok(grant) => {
                self.adopt(grant).await;
                Ok(())
            }
            Err(e) => {
                error!("Federated login error: {e}");
                Err(SessionError::ExchangeFailed)
            }
        }
    }

    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), SessionError> {
        validate_registration(email, password, display_name)?;
        match self.identity_service.register(email, password, display_name).await {
            Ok(grant) => {
                self.adopt(grant).await;
                Ok(())
            }
            Err(PortError::Conflict(message)) => {
                error!("Register error: {message}");
                Err(SessionError::DuplicateAccount)
            }
            Err(PortError::Invalid(message)) => {
                error!("Register error: {message}");
                Err(ValidationError::single("form", message).into())
            }
            Err(e) => {
                error!("Register error: {e}");
                Err(e.into())
            }
        }
    }

    pub async fn terminate_session(&self) {
        info!("Signing out.");
        self.context.clear().await;
    }

    /// Grants the VIP capability after the simulated payment delay.
    pub async fn upgrade_entitlement(&self) -> Result<Identity, SessionError> {
        let purchaser = self.context.identity().ok_or(SessionError::NotSignedIn)?.id;

        tokio::time::sleep(self.settings.upgrade_delay).await;

        // Re-read: the session may have been refreshed or replaced while waiting.
        let mut session = self.context.current().ok_or(SessionError::NotSignedIn)?;
        if session.identity.id != purchaser {
            warn!(
                "Dropping the upgrade for {purchaser}: {} signed in meanwhile.",
                session.identity.id
            );
            return Err(SessionError::NotSignedIn);
        }
        session.identity.capabilities.is_vip = true;
        session.identity.subscription_id = Some(format!("sub_{}", Utc::now().timestamp_millis()));
        info!("Upgraded {} to VIP", session.identity.email);
        let identity = session.identity.clone();
        self.context.publish(session).await;
        Ok(identity)
    }

    /// Fetches the server copy of the identity and applies it.
    pub async fn refresh_identity(&self) -> Result<Identity, SessionError> {
        if self.context.current().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        let identity = self.identity_service.fetch_profile().await?;
        if self.apply_identity_refresh(identity.clone()).await {
            Ok(identity)
        } else {
            Err(SessionError::NotSignedIn)
        }
    }

    /// Replaces the signed-in identity with a server-provided copy.
    ///
    /// The server copy wins over any optimistic local change. Returns `false`
    /// when nobody is signed in or the copy belongs to a different identity.
    pub async fn apply_identity_refresh(&self, identity: Identity) -> bool {
        let Some(mut session) = self.context.current() else {
            warn!("Ignoring identity refresh while signed out.");
            return false;
        };
        if session.identity.id != identity.id {
            warn!(
                "Ignoring identity refresh for {} while {} is signed in.",
                identity.id, session.identity.id
            );
            return false;
        }
        session.identity = identity;
        self.context.publish(session).await;
        true
    }

    async fn adopt(&self, grant: AuthGrant) {
        info!("Signed in as {}", grant.user.email);
        self.context
            .publish(Session {
                identity: grant.user,
                token: grant.token,
            })
            .await;
    }
}
