//! Strong type definitions for teamgate.
//!
//! Identities are newtypes so that a raw, un-normalized username can never
//! be used as a map key or compared against another login by accident.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::permission::{union, PermissionSet};

/// Package name → repository name.
pub type Catalog = BTreeMap<String, String>;

/// A user identity in the organization.
///
/// Logins are case-insensitive: the organization may report `Octocat` where
/// the registry was handed `octocat`. This is the only place that
/// normalization happens; every comparison and every map key keyed by user
/// goes through a `Login`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Login(String);

impl Login {
    /// Normalize a raw username.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    /// Normalize a username supplied by a caller, rejecting blank input.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidLogin(raw.to_string()));
        }
        Ok(Self::new(trimmed))
    }

    /// The normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a raw username without allocating a `Login`.
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == normalize(raw)
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase()
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Login({})", self.0)
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Login {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Login {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Login::parse(&raw)
    }
}

impl From<Login> for String {
    fn from(login: Login) -> Self {
        login.0
    }
}

/// A team of the organization and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team name, as referenced by permission sources.
    pub name: String,

    /// Members, in the order the organization lists them.
    pub members: Vec<Login>,
}

impl Team {
    pub fn new(name: impl Into<String>, members: Vec<Login>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// The synthetic organization-wide team.
    ///
    /// Every authenticated organization member belongs to a virtual team
    /// named after the organization. It only ever appears in the answer to
    /// "teams for user" and is never cached or persisted as a real team.
    pub fn organization(organization: &str, member: &Login) -> Self {
        Self {
            name: organization.to_string(),
            members: vec![member.clone()],
        }
    }

    pub fn has_member(&self, login: &Login) -> bool {
        self.members.iter().any(|m| m == login)
    }
}

/// A user as the registry presents it on access checks: the login and the
/// groups the user was given when it authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryUser {
    pub login: Login,
    /// Team names, including the synthetic organization team.
    pub teams: Vec<String>,
}

impl RegistryUser {
    pub fn new<I, S>(login: Login, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            login,
            teams: teams.into_iter().map(Into::into).collect(),
        }
    }

    /// Team names as string slices.
    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        self.teams.iter().map(String::as_str)
    }
}

/// Every permission that can be held on a single repository.
///
/// `users` holds grants attributed directly to a user (organization default
/// or repository collaborator). `teams` holds what each team confers. Team
/// grants are never flattened onto users here: one aggregate serves every
/// user, and team membership is applied per user at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPermissions {
    pub users: BTreeMap<Login, PermissionSet>,
    pub teams: BTreeMap<String, PermissionSet>,
}

impl RepositoryPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `login` has an entry, even if it stays empty.
    pub fn touch_user(&mut self, login: Login) {
        self.users.entry(login).or_default();
    }

    /// Union `set` into the direct grant of `login`.
    pub fn grant_user(&mut self, login: Login, set: PermissionSet) {
        let entry = self.users.entry(login).or_default();
        *entry = union(*entry, set);
    }

    /// Union `set` into the grant of team `name`.
    pub fn grant_team(&mut self, name: impl Into<String>, set: PermissionSet) {
        let entry = self.teams.entry(name.into()).or_default();
        *entry = union(*entry, set);
    }

    /// Direct grant of `login` (empty if none).
    pub fn user(&self, login: &Login) -> PermissionSet {
        self.users.get(login).copied().unwrap_or_default()
    }

    /// Grant of team `name`, if the team has any attribution here.
    pub fn team(&self, name: &str) -> Option<PermissionSet> {
        self.teams.get(name).copied()
    }

    /// Direct grant of `login` unioned with every team grant in `teams`.
    pub fn effective<'a, I>(&self, login: &Login, teams: I) -> PermissionSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        teams
            .into_iter()
            .filter_map(|name| self.team(name))
            .fold(self.user(login), union)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PackagePermission;

    #[test]
    fn test_login_case_insensitive() {
        assert_eq!(Login::new("Octocat"), Login::new("octocat"));
        assert!(Login::new("OCTOCAT").matches("octoCat"));
    }

    #[test]
    fn test_login_parse_rejects_blank() {
        assert!(Login::parse("   ").is_err());
        assert_eq!(Login::parse(" user ").unwrap().as_str(), "user");
    }

    #[test]
    fn test_login_serde_normalizes() {
        let login: Login = serde_json::from_str(r#""User_1""#).unwrap();
        assert_eq!(login.as_str(), "user_1");
    }

    #[test]
    fn test_organization_team() {
        let user = Login::new("user");
        let team = Team::organization("acme", &user);

        assert_eq!(team.name, "acme");
        assert!(team.has_member(&Login::new("USER")));
        assert_eq!(team.members.len(), 1);
    }

    #[test]
    fn test_grants_merge() {
        let mut perms = RepositoryPermissions::new();
        perms.grant_user(Login::new("a"), PermissionSet::READ);
        perms.grant_user(Login::new("A"), PermissionSet::EMPTY.with(PackagePermission::Write));
        perms.touch_user(Login::new("b"));

        assert_eq!(perms.user(&Login::new("a")), PermissionSet::READ_WRITE);
        assert_eq!(perms.users.get(&Login::new("b")), Some(&PermissionSet::EMPTY));
        assert_eq!(perms.user(&Login::new("nobody")), PermissionSet::EMPTY);
    }

    #[test]
    fn test_effective_unions_teams() {
        let mut perms = RepositoryPermissions::new();
        perms.grant_team("team_1", PermissionSet::READ);
        perms.grant_team("team_2", PermissionSet::EMPTY.with(PackagePermission::Write));

        let user = Login::new("user");
        assert_eq!(perms.effective(&user, ["team_1", "team_2"]), PermissionSet::READ_WRITE);
        assert_eq!(perms.effective(&user, ["team_3"]), PermissionSet::EMPTY);
    }
}
