//! In-memory implementation of the organization directory.
//!
//! This is primarily for testing. It answers every document in
//! [`crate::queries`] with the same response shapes as the real upstream,
//! honours `$first`/`$after` pagination, and records how many times each
//! query was executed so tests can assert on upstream traffic.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::{ClientFactory, QueryClient, DEFAULT_PAGE_SIZE};
use crate::error::{RemoteError, Result};
use crate::queries::{self, Query};

/// Manifest path used by [`MemoryRepository::with_manifest`].
pub const DEFAULT_MANIFEST_PATH: &str = "package.json";

const CURSOR_PREFIX: &str = "cursor:";

/// Where a grant on a repository comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOrigin {
    Organization,
    Repository,
    Team(String),
}

/// One permission source of a collaborator.
#[derive(Debug, Clone)]
pub struct MemorySource {
    /// Raw label; may be absent or invalid to exercise error paths.
    pub permission: Option<String>,
    pub origin: GrantOrigin,
}

/// A collaborator on a repository.
#[derive(Debug, Clone)]
pub struct MemoryCollaborator {
    /// Login as the upstream reports it, case preserved.
    pub login: String,
    pub sources: Vec<MemorySource>,
}

impl MemoryCollaborator {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(self, permission: &str, origin: GrantOrigin) -> Self {
        self.with_raw_source(Some(permission), origin)
    }

    pub fn with_raw_source(mut self, permission: Option<&str>, origin: GrantOrigin) -> Self {
        self.sources.push(MemorySource {
            permission: permission.map(String::from),
            origin,
        });
        self
    }
}

/// A repository of the organization.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    pub name: String,
    /// Path → content of files at `HEAD`.
    pub files: HashMap<String, String>,
    pub collaborators: Vec<MemoryCollaborator>,
}

impl MemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: HashMap::new(),
            collaborators: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add a manifest at [`DEFAULT_MANIFEST_PATH`].
    pub fn with_manifest(self, content: impl Into<String>) -> Self {
        self.with_file(DEFAULT_MANIFEST_PATH, content)
    }

    pub fn with_collaborator(mut self, collaborator: MemoryCollaborator) -> Self {
        self.collaborators.push(collaborator);
        self
    }
}

/// A team of the organization.
#[derive(Debug, Clone)]
pub struct MemoryTeam {
    pub name: String,
    pub slug: String,
    pub members: Vec<String>,
}

impl MemoryTeam {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let slug = name.to_lowercase().replace(' ', "-");
        Self {
            name,
            slug,
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

struct DirectoryState {
    organization: String,
    repositories: Vec<MemoryRepository>,
    members: Vec<String>,
    teams: Vec<MemoryTeam>,
    /// Token → login of its owner.
    credentials: HashMap<String, String>,
    failures: HashMap<&'static str, RemoteError>,
    calls: HashMap<&'static str, usize>,
    latency: Duration,
}

/// In-memory organization directory.
///
/// Cloning yields another handle to the same organization. Thread-safe via
/// RwLock. The directory itself answers with organization-wide scope; use
/// [`ClientFactory::client_for_token`] for a client scoped to one credential.
#[derive(Clone)]
pub struct MemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl MemoryDirectory {
    /// Create an empty organization.
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                organization: organization.into(),
                repositories: Vec::new(),
                members: Vec::new(),
                teams: Vec::new(),
                credentials: HashMap::new(),
                failures: HashMap::new(),
                calls: HashMap::new(),
                latency: Duration::ZERO,
            })),
        }
    }

    pub fn organization(&self) -> String {
        self.read().organization.clone()
    }

    pub fn with_repository(self, repository: MemoryRepository) -> Self {
        self.add_repository(repository);
        self
    }

    pub fn with_member(self, login: impl Into<String>) -> Self {
        self.add_member(login);
        self
    }

    pub fn with_team(self, team: MemoryTeam) -> Self {
        self.add_team(team);
        self
    }

    /// Register `token` as a credential owned by `login`.
    pub fn with_credential(self, token: impl Into<String>, login: impl Into<String>) -> Self {
        self.write().credentials.insert(token.into(), login.into());
        self
    }

    /// Delay every answer by `latency`, so concurrent callers overlap.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.write().latency = latency;
        self
    }

    pub fn add_repository(&self, repository: MemoryRepository) {
        self.write().repositories.push(repository);
    }

    pub fn add_member(&self, login: impl Into<String>) {
        self.write().members.push(login.into());
    }

    pub fn remove_member(&self, login: &str) {
        self.write().members.retain(|m| !m.eq_ignore_ascii_case(login));
    }

    pub fn add_team(&self, team: MemoryTeam) {
        self.write().teams.push(team);
    }

    /// Apply `update` to the repository called `name`, if it exists.
    pub fn update_repository(&self, name: &str, update: impl FnOnce(&mut MemoryRepository)) {
        if let Some(repository) = self
            .write()
            .repositories
            .iter_mut()
            .find(|r| r.name == name)
        {
            update(repository);
        }
    }

    /// Make every execution of `query` fail with `error` until cleared.
    pub fn fail_query(&self, query: &Query, error: RemoteError) {
        self.write().failures.insert(query.name, error);
    }

    pub fn clear_failures(&self) {
        self.write().failures.clear();
    }

    /// How many times `query` has been executed.
    pub fn calls(&self, query: &Query) -> usize {
        self.read().calls.get(query.name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.read().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.write().calls.clear();
    }

    async fn answer(&self, query: &Query, variables: &Value, token: Option<&str>) -> Result<Value> {
        let latency = {
            let mut state = self.write();
            *state.calls.entry(query.name).or_default() += 1;
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.read();
        if let Some(error) = state.failures.get(query.name) {
            return Err(error.clone());
        }
        state.respond(query, variables, token)
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DirectoryState {
    fn respond(&self, query: &Query, variables: &Value, token: Option<&str>) -> Result<Value> {
        if let Some(token) = token {
            if !self.credentials.contains_key(token) {
                return Err(RemoteError::Unauthorized("Bad credentials".to_string()));
            }
        }

        if *query == queries::VIEWER {
            return self.viewer(token);
        }

        self.check_organization(query, variables)?;

        if *query == queries::ORGANIZATION_MEMBERS {
            self.members(variables)
        } else if *query == queries::ORGANIZATION_TEAMS {
            self.teams(variables)
        } else if *query == queries::TEAM_MEMBERS {
            self.team_members(variables)
        } else if *query == queries::REPOSITORY_MANIFESTS {
            self.manifests(variables)
        } else if *query == queries::REPOSITORY_PERMISSIONS {
            self.permissions(variables)
        } else if *query == queries::REPOSITORY_COLLABORATORS {
            self.collaborators(variables)
        } else {
            Err(query_error(query, "unsupported query"))
        }
    }

    fn viewer(&self, token: Option<&str>) -> Result<Value> {
        let login = token
            .and_then(|t| self.credentials.get(t))
            .ok_or_else(|| query_error(&queries::VIEWER, "viewer requires a user credential"))?;
        Ok(json!({ "viewer": { "login": login } }))
    }

    fn check_organization(&self, query: &Query, variables: &Value) -> Result<()> {
        let requested = string_var(query, variables, "organization")?;
        if requested.eq_ignore_ascii_case(&self.organization) {
            Ok(())
        } else {
            Err(query_error(
                query,
                format!("Could not resolve to an Organization with the login of '{requested}'."),
            ))
        }
    }

    fn members(&self, variables: &Value) -> Result<Value> {
        let query = &queries::ORGANIZATION_MEMBERS;
        let (members, page_info) = paginate(query, &self.members, variables, "first", true)?;
        Ok(json!({ "organization": { "membersWithRole": {
            "pageInfo": page_info,
            "nodes": members.iter().map(login_node).collect::<Vec<_>>(),
        }}}))
    }

    fn teams(&self, variables: &Value) -> Result<Value> {
        let query = &queries::ORGANIZATION_TEAMS;
        let (teams, page_info) = paginate(query, &self.teams, variables, "first", true)?;
        let nodes = teams
            .iter()
            .map(|team| -> Result<Value> {
                let (members, members_info) =
                    paginate(query, &team.members, variables, "members", false)?;
                Ok(json!({
                    "name": team.name,
                    "slug": team.slug,
                    "members": {
                        "pageInfo": members_info,
                        "nodes": members.iter().map(login_node).collect::<Vec<_>>(),
                    },
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({ "organization": { "teams": { "pageInfo": page_info, "nodes": nodes } } }))
    }

    fn team_members(&self, variables: &Value) -> Result<Value> {
        let query = &queries::TEAM_MEMBERS;
        let slug = string_var(query, variables, "slug")?;
        let Some(team) = self.teams.iter().find(|t| t.slug == slug) else {
            return Ok(json!({ "organization": { "team": null } }));
        };

        let (members, page_info) = paginate(query, &team.members, variables, "first", true)?;
        Ok(json!({ "organization": { "team": { "members": {
            "pageInfo": page_info,
            "nodes": members.iter().map(login_node).collect::<Vec<_>>(),
        }}}}))
    }

    fn manifests(&self, variables: &Value) -> Result<Value> {
        let query = &queries::REPOSITORY_MANIFESTS;
        let expression = string_var(query, variables, "expression")?;
        let path = expression.strip_prefix("HEAD:").unwrap_or(expression);

        let (repositories, page_info) =
            paginate(query, &self.repositories, variables, "first", true)?;
        let nodes: Vec<Value> = repositories
            .iter()
            .map(|repository| {
                let object = repository
                    .files
                    .get(path)
                    .map(|text| json!({ "text": text }))
                    .unwrap_or(Value::Null);
                json!({ "name": repository.name, "object": object })
            })
            .collect();

        Ok(json!({ "organization": { "repositories": { "pageInfo": page_info, "nodes": nodes } } }))
    }

    fn permissions(&self, variables: &Value) -> Result<Value> {
        let query = &queries::REPOSITORY_PERMISSIONS;
        let (repositories, page_info) =
            paginate(query, &self.repositories, variables, "first", true)?;
        let nodes = repositories
            .iter()
            .map(|repository| -> Result<Value> {
                let (collaborators, collaborators_info) = paginate(
                    query,
                    &repository.collaborators,
                    variables,
                    "collaborators",
                    false,
                )?;
                Ok(json!({
                    "name": repository.name,
                    "collaborators": {
                        "pageInfo": collaborators_info,
                        "edges": collaborators
                            .iter()
                            .map(|c| self.collaborator_edge(repository, c))
                            .collect::<Vec<_>>(),
                    },
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({ "organization": { "repositories": { "pageInfo": page_info, "nodes": nodes } } }))
    }

    fn collaborators(&self, variables: &Value) -> Result<Value> {
        let query = &queries::REPOSITORY_COLLABORATORS;
        let name = string_var(query, variables, "repository")?;
        let Some(repository) = self.repositories.iter().find(|r| r.name == name) else {
            return Ok(json!({ "repository": null }));
        };

        let (collaborators, page_info) =
            paginate(query, &repository.collaborators, variables, "first", true)?;
        Ok(json!({ "repository": { "collaborators": {
            "pageInfo": page_info,
            "edges": collaborators
                .iter()
                .map(|c| self.collaborator_edge(repository, c))
                .collect::<Vec<_>>(),
        }}}))
    }

    fn collaborator_edge(&self, repository: &MemoryRepository, collaborator: &MemoryCollaborator) -> Value {
        let sources: Vec<Value> = collaborator
            .sources
            .iter()
            .map(|source| {
                let origin = match &source.origin {
                    GrantOrigin::Organization => {
                        json!({ "__typename": "Organization", "login": self.organization })
                    }
                    GrantOrigin::Repository => {
                        json!({ "__typename": "Repository", "name": repository.name })
                    }
                    GrantOrigin::Team(name) => json!({ "__typename": "Team", "name": name }),
                };
                json!({ "permission": source.permission, "source": origin })
            })
            .collect();

        json!({ "node": { "login": collaborator.login }, "permissionSources": sources })
    }
}

fn login_node(login: &String) -> Value {
    json!({ "login": login })
}

fn query_error(query: &Query, message: impl Into<String>) -> RemoteError {
    RemoteError::Query {
        query: query.name.to_string(),
        messages: vec![message.into()],
    }
}

fn string_var<'a>(query: &Query, variables: &'a Value, name: &str) -> Result<&'a str> {
    variables
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| query_error(query, format!("missing variable ${name}")))
}

/// Slice one page out of `items` according to `$<first_key>` and, when
/// `continued` is set, `$after`.
fn paginate<'a, T>(
    query: &Query,
    items: &'a [T],
    variables: &Value,
    first_key: &str,
    continued: bool,
) -> Result<(&'a [T], Value)> {
    let first = match variables.get(first_key) {
        None | Some(Value::Null) => DEFAULT_PAGE_SIZE as usize,
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => n as usize,
            _ => return Err(query_error(query, format!("invalid ${first_key}"))),
        },
    };

    let start = match variables.get("after") {
        Some(Value::String(cursor)) if continued => cursor
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| query_error(query, format!("invalid cursor {cursor:?}")))?,
        _ => 0,
    }
    .min(items.len());

    let end = start.saturating_add(first).min(items.len());
    let end_cursor = (end > start).then(|| format!("{CURSOR_PREFIX}{end}"));
    let page_info = json!({ "hasNextPage": end < items.len(), "endCursor": end_cursor });

    Ok((&items[start..end], page_info))
}

#[async_trait]
impl QueryClient for MemoryDirectory {
    async fn fetch_one(&self, query: &Query, variables: Value) -> Result<Value> {
        self.answer(query, &variables, None).await
    }
}

/// A client acting with one user's credential.
struct ScopedClient {
    directory: MemoryDirectory,
    token: String,
}

#[async_trait]
impl QueryClient for ScopedClient {
    async fn fetch_one(&self, query: &Query, variables: Value) -> Result<Value> {
        self.directory
            .answer(query, &variables, Some(&self.token))
            .await
    }
}

impl ClientFactory for MemoryDirectory {
    fn client_for_token(&self, token: &str) -> Result<Arc<dyn QueryClient>> {
        Ok(Arc::new(ScopedClient {
            directory: self.clone(),
            token: token.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::QueryClientExt;
    use crate::schema::{self, MembersData, ViewerData};
    use teamgate_core::Login;

    fn directory() -> MemoryDirectory {
        (1..=45).fold(MemoryDirectory::new("acme"), |dir, i| dir.with_member(format!("user_{i}")))
    }

    #[tokio::test]
    async fn test_members_paginate() {
        let dir = directory();

        let pages = dir
            .fetch_all(
                &queries::ORGANIZATION_MEMBERS,
                json!({ "organization": "acme" }),
                schema::members_page_info,
            )
            .await
            .unwrap();
        let pages: Vec<MembersData> = schema::decode_pages(&queries::ORGANIZATION_MEMBERS, pages).unwrap();

        // 45 members at the default page size of 20.
        assert_eq!(pages.len(), 3);
        assert_eq!(dir.calls(&queries::ORGANIZATION_MEMBERS), 3);
        let logins: Vec<Login> = pages
            .into_iter()
            .flat_map(|p| p.organization.members_with_role.nodes)
            .map(|n| n.login)
            .collect();
        assert_eq!(logins.len(), 45);
        assert_eq!(logins[44], Login::new("user_45"));
    }

    #[tokio::test]
    async fn test_unknown_organization() {
        let dir = directory();

        let result = dir
            .fetch_one(&queries::ORGANIZATION_MEMBERS, json!({ "organization": "other" }))
            .await;

        assert!(matches!(result, Err(RemoteError::Query { .. })));
    }

    #[tokio::test]
    async fn test_scoped_client_viewer() {
        let dir = MemoryDirectory::new("acme").with_credential("t0ken", "User");

        let client = dir.client_for_token("t0ken").unwrap();
        let data = client.fetch_one(&queries::VIEWER, json!({})).await.unwrap();
        let viewer: ViewerData = schema::decode(&queries::VIEWER, data).unwrap();
        assert_eq!(viewer.viewer.login, Login::new("user"));

        let bad = dir.client_for_token("wrong").unwrap();
        let result = bad.fetch_one(&queries::VIEWER, json!({})).await;
        assert!(result.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let dir = directory();
        dir.fail_query(
            &queries::ORGANIZATION_MEMBERS,
            RemoteError::Transport("connection reset".into()),
        );

        let result = dir
            .fetch_one(&queries::ORGANIZATION_MEMBERS, json!({ "organization": "acme" }))
            .await;
        assert_eq!(result, Err(RemoteError::Transport("connection reset".into())));

        dir.clear_failures();
        assert!(dir
            .fetch_one(&queries::ORGANIZATION_MEMBERS, json!({ "organization": "acme" }))
            .await
            .is_ok());
        assert_eq!(dir.calls(&queries::ORGANIZATION_MEMBERS), 2);
    }

    #[tokio::test]
    async fn test_manifest_lookup() {
        let dir = MemoryDirectory::new("acme")
            .with_repository(MemoryRepository::new("repo_1").with_manifest(r#"{"name":"pkg_1"}"#))
            .with_repository(MemoryRepository::new("repo_2"));

        let data = dir
            .fetch_one(
                &queries::REPOSITORY_MANIFESTS,
                json!({ "organization": "acme", "expression": "HEAD:package.json" }),
            )
            .await
            .unwrap();

        assert_eq!(
            data.pointer("/organization/repositories/nodes/0/object/text"),
            Some(&json!(r#"{"name":"pkg_1"}"#))
        );
        assert_eq!(
            data.pointer("/organization/repositories/nodes/1/object"),
            Some(&Value::Null)
        );
    }
}
