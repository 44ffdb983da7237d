//! The registry plugin: authentication and access checks.
//!
//! The plugin brings together the verifier and the permission resolver
//! behind the four operations a registry host calls.

use std::sync::Arc;

use tracing::{debug, error, warn};

use teamgate_cache::{cache_key, ResultCache};
use teamgate_core::{Login, PackagePermission, RegistryUser};
use teamgate_perms::{OrgSource, PermissionResolver};
use teamgate_remote::{ClientFactory, HttpClient, HttpClientFactory, QueryClient};

use crate::config::{AuthConfig, Settings};
use crate::error::{AuthError, AuthenticationError, ConfigError, LoginState, PluginError, Result};
use crate::verifier::OrganizationVerifier;

const AUTHENTICATE: &str = "authenticate";

/// What `authenticate` concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Groups of the user, the organization first.
    Authorized(Vec<String>),
    Unauthorized,
    InternalError,
}

impl AuthOutcome {
    /// The answer in the shape the host expects.
    pub fn into_result(self) -> std::result::Result<Vec<String>, PluginError> {
        match self {
            AuthOutcome::Authorized(groups) => Ok(groups),
            AuthOutcome::Unauthorized => Err(PluginError::Unauthorized),
            AuthOutcome::InternalError => Err(PluginError::Internal),
        }
    }
}

impl From<AuthenticationError> for AuthOutcome {
    fn from(err: AuthenticationError) -> Self {
        match err.state {
            LoginState::Denied => AuthOutcome::Unauthorized,
            LoginState::Unknown => AuthOutcome::InternalError,
        }
    }
}

/// Hex blake3 digest of a credential. Cache keys never hold the credential.
pub fn credential_digest(token: &str) -> String {
    hex::encode(blake3::hash(token.as_bytes()).as_bytes())
}

/// Authenticates registry users against an organization and authorizes
/// package access from its repository permissions.
pub struct AuthPlugin {
    verifier: Arc<OrganizationVerifier>,
    resolver: PermissionResolver,
    sessions: ResultCache<(), AuthenticationError>,
}

impl AuthPlugin {
    /// Build a plugin talking to the configured endpoint.
    pub fn from_config(config: &AuthConfig) -> std::result::Result<Self, ConfigError> {
        let settings = config.validate()?;
        let client = HttpClient::new(settings.endpoint.clone(), settings.token.clone())?;
        let clients = HttpClientFactory::new(settings.endpoint.clone());
        Ok(Self::new(&settings, Arc::new(client), Arc::new(clients)))
    }

    /// Build a plugin on explicit clients.
    ///
    /// `client` acts with the organization-wide credential; `clients` builds
    /// the per-user clients identity checks run on.
    pub fn new(
        settings: &Settings,
        client: Arc<dyn QueryClient>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        let source =
            OrgSource::new(client, settings.organization.clone()).with_page_size(settings.page_size);

        Self {
            verifier: Arc::new(OrganizationVerifier::new(
                source.clone(),
                clients,
                settings.cache_ttl,
            )),
            resolver: PermissionResolver::new(source, settings.resolver_config()),
            sessions: ResultCache::new(settings.cache_ttl),
        }
    }

    pub fn verifier(&self) -> &OrganizationVerifier {
        &self.verifier
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticate `username` with `token`.
    ///
    /// Denials are logged at `warn`, internal failures at `error`; neither
    /// carries detail to the caller.
    pub async fn authenticate(&self, username: &str, token: &str) -> AuthOutcome {
        match self.authorize(username, token).await {
            Ok(groups) => {
                debug!(user = %username, groups = groups.len(), "authenticated");
                AuthOutcome::Authorized(groups)
            }
            Err(e) if e.is_denied() => {
                warn!(user = %username, reason = %e.message, "authentication denied");
                e.into()
            }
            Err(e) => {
                error!(user = %username, error = %e.message, "authentication failed");
                e.into()
            }
        }
    }

    /// [`authenticate`](Self::authenticate), answering through `callback`.
    pub async fn authenticate_with<F>(&self, username: &str, token: &str, callback: F)
    where
        F: FnOnce(std::result::Result<Vec<String>, PluginError>),
    {
        callback(self.authenticate(username, token).await.into_result());
    }

    /// The groups of `username`, or why it may not authenticate.
    ///
    /// Identity and membership are verified once per login and credential
    /// within a TTL window. Teams come from the organization snapshot.
    pub async fn authorize(
        &self,
        username: &str,
        token: &str,
    ) -> std::result::Result<Vec<String>, AuthenticationError> {
        let login = Login::parse(username).map_err(|e| AuthenticationError::denied(e.to_string()))?;
        let key = cache_key(AUTHENTICATE, &[login.as_str(), &credential_digest(token)]);

        let verifier = Arc::clone(&self.verifier);
        let user = login.clone();
        let token = token.to_string();
        self.sessions
            .get_or_compute(&key, move || async move {
                verifier.verify_user_identity(&user, &token).await?;
                verifier.verify_organization(&user).await
            })
            .await?;

        let teams = self.verifier.get_user_teams(&login).await?;
        Ok(teams.into_iter().map(|team| team.name).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `user` may install `package`.
    pub async fn allow_access(&self, user: &RegistryUser, package: &str) -> Result<bool> {
        self.allows(user, package, PackagePermission::Read).await
    }

    /// Whether `user` may publish `package`.
    pub async fn allow_publish(&self, user: &RegistryUser, package: &str) -> Result<bool> {
        self.allows(user, package, PackagePermission::Write).await
    }

    /// Whether `user` may unpublish `package`. Same rule as publishing.
    pub async fn allow_unpublish(&self, user: &RegistryUser, package: &str) -> Result<bool> {
        self.allow_publish(user, package).await
    }

    pub async fn allow_access_with<F>(&self, user: &RegistryUser, package: &str, callback: F)
    where
        F: FnOnce(Result<bool>),
    {
        callback(self.allow_access(user, package).await);
    }

    pub async fn allow_publish_with<F>(&self, user: &RegistryUser, package: &str, callback: F)
    where
        F: FnOnce(Result<bool>),
    {
        callback(self.allow_publish(user, package).await);
    }

    pub async fn allow_unpublish_with<F>(&self, user: &RegistryUser, package: &str, callback: F)
    where
        F: FnOnce(Result<bool>),
    {
        callback(self.allow_unpublish(user, package).await);
    }

    async fn allows(
        &self,
        user: &RegistryUser,
        package: &str,
        permission: PackagePermission,
    ) -> Result<bool> {
        let set = self
            .resolver
            .package_permissions_for_user_for_package(user, package)
            .await
            .map_err(|e| {
                error!(user = %user.login, package, error = %e, "permission lookup failed");
                AuthError::from(e)
            })?;

        let allowed = set.contains(permission);
        debug!(
            user = %user.login,
            package,
            permission = permission.as_str(),
            allowed,
            "access check"
        );
        Ok(allowed)
    }
}
