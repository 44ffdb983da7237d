//! Identity and organization verification.
//!
//! Authentication walks `identity → organization → teams`, failing at the
//! first step that does not hold. Identity is checked with a client holding
//! only the caller's credential; membership and teams come from the shared,
//! organization-scoped snapshots.

use std::iter;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use teamgate_cache::{cache_key, ResultCache};
use teamgate_core::{Login, Team};
use teamgate_perms::{OrgSource, PermsError};
use teamgate_remote::schema::{self, ViewerData};
use teamgate_remote::{queries, ClientFactory};

use crate::error::AuthenticationError;

const ORGANIZATION_MEMBERS: &str = "organizationMembers";
const ORGANIZATION_TEAMS: &str = "organizationTeams";

/// Checks credentials, membership and teams against one organization.
pub struct OrganizationVerifier {
    source: OrgSource,
    clients: Arc<dyn ClientFactory>,
    members: ResultCache<Arc<Vec<Login>>, PermsError>,
    teams: ResultCache<Arc<Vec<Team>>, PermsError>,
}

impl OrganizationVerifier {
    pub fn new(source: OrgSource, clients: Arc<dyn ClientFactory>, ttl: Duration) -> Self {
        Self {
            source,
            clients,
            members: ResultCache::new(ttl),
            teams: ResultCache::new(ttl),
        }
    }

    pub fn organization(&self) -> &str {
        self.source.organization()
    }

    /// Check that `token` belongs to `login`.
    ///
    /// A rejected credential or a credential of somebody else is `Denied`;
    /// anything else that goes wrong is `Unknown`.
    pub async fn verify_user_identity(
        &self,
        login: &Login,
        token: &str,
    ) -> Result<(), AuthenticationError> {
        let client = self
            .clients
            .client_for_token(token)
            .map_err(|e| AuthenticationError::unknown(e.to_string()))?;

        let data = client
            .fetch_one(&queries::VIEWER, json!({}))
            .await
            .map_err(|e| {
                if e.is_unauthorized() {
                    AuthenticationError::denied("credential rejected")
                } else {
                    AuthenticationError::unknown(e.to_string())
                }
            })?;
        let viewer: ViewerData = schema::decode(&queries::VIEWER, data)
            .map_err(|e| AuthenticationError::unknown(e.to_string()))?;

        if viewer.viewer.login != *login {
            return Err(AuthenticationError::denied(format!(
                "credential does not belong to {login}"
            )));
        }
        Ok(())
    }

    /// Check that `login` is a member of the organization.
    pub async fn verify_organization(&self, login: &Login) -> Result<(), AuthenticationError> {
        let members = self
            .members()
            .await
            .map_err(|e| AuthenticationError::unknown(e.to_string()))?;

        if members.contains(login) {
            Ok(())
        } else {
            Err(AuthenticationError::denied(format!(
                "{login} is not a member of {}",
                self.organization()
            )))
        }
    }

    /// Teams `login` belongs to, the organization team first.
    pub async fn get_user_teams(&self, login: &Login) -> Result<Vec<Team>, AuthenticationError> {
        let teams = self
            .teams()
            .await
            .map_err(|e| AuthenticationError::unknown(e.to_string()))?;

        let user_teams: Vec<Team> = iter::once(Team::organization(self.organization(), login))
            .chain(teams.iter().filter(|team| team.has_member(login)).cloned())
            .collect();
        debug!(user = %login, teams = user_teams.len(), "teams resolved");
        Ok(user_teams)
    }

    /// Members of the organization, fetched at most once per TTL.
    pub async fn members(&self) -> Result<Arc<Vec<Login>>, PermsError> {
        let key = cache_key(ORGANIZATION_MEMBERS, &[self.organization()]);
        let source = self.source.clone();
        self.members
            .get_or_compute(&key, move || async move { source.members().await.map(Arc::new) })
            .await
    }

    /// Teams of the organization, fetched at most once per TTL.
    pub async fn teams(&self) -> Result<Arc<Vec<Team>>, PermsError> {
        let key = cache_key(ORGANIZATION_TEAMS, &[self.organization()]);
        let source = self.source.clone();
        self.teams
            .get_or_compute(&key, move || async move { source.teams().await.map(Arc::new) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoginState;
    use teamgate_cache::DEFAULT_TTL;
    use teamgate_remote::{MemoryDirectory, MemoryTeam, RemoteError};

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new("acme")
            .with_member("User_1")
            .with_member("user_2")
            .with_team(MemoryTeam::new("team_1", ["user_1"]))
            .with_team(MemoryTeam::new("team_2", ["user_1", "User_2"]))
            .with_credential("token_1", "user_1")
            .with_credential("token_2", "user_2")
            .with_credential("token_3", "user_3")
    }

    fn verifier(directory: &MemoryDirectory) -> OrganizationVerifier {
        OrganizationVerifier::new(
            OrgSource::new(Arc::new(directory.clone()), "acme"),
            Arc::new(directory.clone()),
            DEFAULT_TTL,
        )
    }

    #[tokio::test]
    async fn test_identity_matches_case_insensitively() {
        let directory = directory();
        let verifier = verifier(&directory);

        assert!(verifier.verify_user_identity(&Login::new("USER_1"), "token_1").await.is_ok());
    }

    #[tokio::test]
    async fn test_identity_mismatch_is_denied() {
        let directory = directory();
        let verifier = verifier(&directory);

        let err = verifier
            .verify_user_identity(&Login::new("user_1"), "token_2")
            .await
            .unwrap_err();

        assert_eq!(err.state, LoginState::Denied);
    }

    #[tokio::test]
    async fn test_bad_credential_is_denied() {
        let directory = directory();
        let verifier = verifier(&directory);

        let err = verifier
            .verify_user_identity(&Login::new("user_1"), "forged")
            .await
            .unwrap_err();

        assert_eq!(err.state, LoginState::Denied);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_unknown() {
        let directory = directory();
        directory.fail_query(&queries::VIEWER, RemoteError::Transport("timeout".into()));
        let verifier = verifier(&directory);

        let err = verifier
            .verify_user_identity(&Login::new("user_1"), "token_1")
            .await
            .unwrap_err();

        assert_eq!(err.state, LoginState::Unknown);
    }

    #[tokio::test]
    async fn test_organization_membership() {
        let directory = directory();
        let verifier = verifier(&directory);

        assert!(verifier.verify_organization(&Login::new("user_1")).await.is_ok());
        let err = verifier.verify_organization(&Login::new("user_3")).await.unwrap_err();
        assert_eq!(err.state, LoginState::Denied);

        assert_eq!(directory.calls(&queries::ORGANIZATION_MEMBERS), 1);
    }

    #[tokio::test]
    async fn test_membership_failure_is_unknown() {
        let directory = directory();
        directory.fail_query(
            &queries::ORGANIZATION_MEMBERS,
            RemoteError::Status {
                status: 503,
                message: "unavailable".into(),
            },
        );
        let verifier = verifier(&directory);

        let err = verifier.verify_organization(&Login::new("user_1")).await.unwrap_err();

        assert_eq!(err.state, LoginState::Unknown);
    }

    #[tokio::test]
    async fn test_user_teams_start_with_organization() {
        let directory = directory();
        let verifier = verifier(&directory);

        let names = |teams: Vec<Team>| teams.into_iter().map(|t| t.name).collect::<Vec<_>>();

        let user_1 = verifier.get_user_teams(&Login::new("user_1")).await.unwrap();
        let user_2 = verifier.get_user_teams(&Login::new("user_2")).await.unwrap();

        assert_eq!(names(user_1), vec!["acme", "team_1", "team_2"]);
        assert_eq!(names(user_2), vec!["acme", "team_2"]);
        assert_eq!(directory.calls(&queries::ORGANIZATION_TEAMS), 1);

        // The synthetic team is never part of the cached roster.
        assert!(verifier.teams().await.unwrap().iter().all(|t| t.name != "acme"));
    }
}
