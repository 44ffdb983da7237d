//! Test fixtures and helpers.
//!
//! [`OrgFixture`] describes the standard test organization. Every name in it
//! is derived on access from the fixture's prefix, so two fixtures with
//! different prefixes never collide.
//!
//! The standard organization:
//!
//! | Repository | Package | Grants                                         |
//! |------------|---------|------------------------------------------------|
//! | `repo_1`   | `pkg_1` | `user_1` WRITE directly, `team_2` READ         |
//! | `repo_2`   | `pkg_2` | `team_1` ADMIN                                 |
//! | `repo_3`   | `pkg_3` | organization base READ for `user_1`, `user_2`  |
//! | `repo_4`   | `pkg_4` | `user_2` NONE directly                         |
//!
//! Members are `user_1` and `user_2`. `team_1` is `[user_1]`, `team_2` is
//! `[user_1, user_2]`. `user_3` holds a valid credential but is not a member.

use std::sync::Arc;

use serde_json::json;

use teamgate_core::{Login, RegistryUser};
use teamgate_perms::OrgSource;
use teamgate_remote::{GrantOrigin, MemoryCollaborator, MemoryDirectory, MemoryRepository, MemoryTeam};

/// Number of repositories (and packages) in the standard organization.
pub const REPOSITORIES: usize = 4;

/// Number of users holding a credential; the last one is not a member.
pub const USERS: usize = 3;

/// The standard test organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgFixture {
    organization: String,
    prefix: String,
}

impl OrgFixture {
    /// The standard organization, named `acme`, without a prefix.
    pub fn new() -> Self {
        Self {
            organization: "acme".to_string(),
            prefix: String::new(),
        }
    }

    /// Prefix every derived repository, package, user and team name.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn repository(&self, n: usize) -> String {
        format!("{}repo_{n}", self.prefix)
    }

    pub fn package(&self, n: usize) -> String {
        format!("{}pkg_{n}", self.prefix)
    }

    pub fn user(&self, n: usize) -> String {
        format!("{}user_{n}", self.prefix)
    }

    pub fn team(&self, n: usize) -> String {
        format!("{}team_{n}", self.prefix)
    }

    /// The credential owned by user `n`.
    pub fn token(&self, n: usize) -> String {
        format!("token_{}", self.user(n))
    }

    pub fn login(&self, n: usize) -> Login {
        Login::new(self.user(n))
    }

    /// Groups user `n` authenticates with, organization first.
    pub fn groups(&self, n: usize) -> Vec<String> {
        let mut groups = vec![self.organization.clone()];
        match n {
            1 => groups.extend([self.team(1), self.team(2)]),
            2 => groups.push(self.team(2)),
            _ => {}
        }
        groups
    }

    /// User `n` as the registry presents it after authentication.
    pub fn registry_user(&self, n: usize) -> RegistryUser {
        RegistryUser::new(self.login(n), self.groups(n))
    }

    /// A manifest declaring package `n`.
    pub fn manifest(&self, n: usize) -> String {
        json!({ "name": self.package(n), "version": "1.0.0" }).to_string()
    }

    /// A fresh in-memory directory holding the standard organization.
    pub fn directory(&self) -> MemoryDirectory {
        let read_via_team_2 = |login: String| {
            MemoryCollaborator::new(login).with_source("READ", GrantOrigin::Team(self.team(2)))
        };

        let repo_1 = MemoryRepository::new(self.repository(1))
            .with_manifest(self.manifest(1))
            .with_collaborator(read_via_team_2(self.user(1)).with_source("WRITE", GrantOrigin::Repository))
            .with_collaborator(read_via_team_2(self.user(2)));

        let repo_2 = MemoryRepository::new(self.repository(2))
            .with_manifest(self.manifest(2))
            .with_collaborator(
                MemoryCollaborator::new(self.user(1)).with_source("ADMIN", GrantOrigin::Team(self.team(1))),
            );

        let repo_3 = MemoryRepository::new(self.repository(3))
            .with_manifest(self.manifest(3))
            .with_collaborator(MemoryCollaborator::new(self.user(1)).with_source("READ", GrantOrigin::Organization))
            .with_collaborator(MemoryCollaborator::new(self.user(2)).with_source("READ", GrantOrigin::Organization));

        let repo_4 = MemoryRepository::new(self.repository(4))
            .with_manifest(self.manifest(4))
            .with_collaborator(MemoryCollaborator::new(self.user(2)).with_source("NONE", GrantOrigin::Repository));

        let directory = MemoryDirectory::new(self.organization.clone())
            .with_repository(repo_1)
            .with_repository(repo_2)
            .with_repository(repo_3)
            .with_repository(repo_4)
            .with_member(self.user(1))
            .with_member(self.user(2))
            .with_team(MemoryTeam::new(self.team(1), [self.user(1)]))
            .with_team(MemoryTeam::new(self.team(2), [self.user(1), self.user(2)]));

        (1..=USERS).fold(directory, |directory, n| directory.with_credential(self.token(n), self.user(n)))
    }

    /// An organization-scoped source over `directory`.
    pub fn source(&self, directory: &MemoryDirectory) -> OrgSource {
        OrgSource::new(Arc::new(directory.clone()), self.organization.clone())
    }
}

impl Default for OrgFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures that share nothing, for tests that run several organizations.
pub fn isolated_fixtures(count: usize) -> Vec<OrgFixture> {
    (0..count)
        .map(|i| OrgFixture::new().with_prefix(format!("s{i}-")))
        .collect()
}
