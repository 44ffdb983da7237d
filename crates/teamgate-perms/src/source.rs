//! Organization-scoped reads.
//!
//! [`OrgSource`] turns the paginated queries of the directory into complete,
//! typed snapshots: every repository's manifest, every repository's
//! collaborators, every member, every team. Nested connections that overflow
//! their first page are continued with their dedicated query.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use teamgate_core::{Login, Team};
use teamgate_remote::schema::{
    self, CollaboratorEdge, CollaboratorsData, ManifestsData, MembersData, PermissionsData,
    TeamMembersData, TeamsData,
};
use teamgate_remote::{queries, QueryClient, QueryClientExt, RemoteError, DEFAULT_PAGE_SIZE};

use crate::error::Result;

/// Manifest content of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub repository: String,
    pub content: String,
}

/// Collaborators of one repository, every page included.
#[derive(Debug, Clone)]
pub struct RepositoryCollaborators {
    pub repository: String,
    pub edges: Vec<CollaboratorEdge>,
}

/// Reads one organization through a shared, organization-scoped client.
///
/// Cheap to clone: the client is shared.
#[derive(Clone)]
pub struct OrgSource {
    client: Arc<dyn QueryClient>,
    organization: Arc<str>,
    page_size: u32,
}

impl OrgSource {
    pub fn new(client: Arc<dyn QueryClient>, organization: impl Into<String>) -> Self {
        Self {
            client,
            organization: organization.into().into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size for top-level and nested connections alike.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The file at `path` on `HEAD` of every repository that has one.
    pub async fn package_files(&self, path: &str) -> Result<Vec<PackageFile>> {
        let query = &queries::REPOSITORY_MANIFESTS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({
                    "organization": &*self.organization,
                    "first": self.page_size,
                    "expression": format!("HEAD:{path}"),
                }),
                schema::repositories_page_info,
            )
            .await?;

        let mut files = Vec::new();
        for page in schema::decode_pages::<ManifestsData>(query, pages)? {
            for node in page.organization.repositories.nodes {
                let Some(content) = node.text().map(str::to_string) else {
                    debug!(repository = %node.name, path, "no manifest");
                    continue;
                };
                files.push(PackageFile {
                    repository: node.name,
                    content,
                });
            }
        }

        info!(organization = %self.organization, files = files.len(), "manifests fetched");
        Ok(files)
    }

    /// Every repository with every collaborator and permission source.
    pub async fn repository_collaborators(&self) -> Result<Vec<RepositoryCollaborators>> {
        let query = &queries::REPOSITORY_PERMISSIONS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({
                    "organization": &*self.organization,
                    "first": self.page_size,
                    "collaborators": self.page_size,
                }),
                schema::repositories_page_info,
            )
            .await?;

        let mut repositories = Vec::new();
        for page in schema::decode_pages::<PermissionsData>(query, pages)? {
            for node in page.organization.repositories.nodes {
                let edges = match node.collaborators {
                    Some(connection) => {
                        let mut edges = connection.edges;
                        if let Some(cursor) = connection.page_info.next_cursor() {
                            edges.extend(self.remaining_collaborators(&node.name, cursor).await?);
                        }
                        edges
                    }
                    None => {
                        debug!(repository = %node.name, "collaborators not visible");
                        Vec::new()
                    }
                };
                repositories.push(RepositoryCollaborators {
                    repository: node.name,
                    edges,
                });
            }
        }

        info!(
            organization = %self.organization,
            repositories = repositories.len(),
            "repository collaborators fetched"
        );
        Ok(repositories)
    }

    async fn remaining_collaborators(
        &self,
        repository: &str,
        after: &str,
    ) -> Result<Vec<CollaboratorEdge>> {
        let query = &queries::REPOSITORY_COLLABORATORS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({
                    "organization": &*self.organization,
                    "repository": repository,
                    "first": self.page_size,
                    "after": after,
                }),
                schema::collaborators_page_info,
            )
            .await?;

        let mut edges = Vec::new();
        for page in schema::decode_pages::<CollaboratorsData>(query, pages)? {
            let found = page.repository.ok_or_else(|| {
                RemoteError::schema(query.name, format!("repository {repository} disappeared"))
            })?;
            edges.extend(found.collaborators.edges);
        }
        Ok(edges)
    }

    /// Every member of the organization.
    pub async fn members(&self) -> Result<Vec<Login>> {
        let query = &queries::ORGANIZATION_MEMBERS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({ "organization": &*self.organization, "first": self.page_size }),
                schema::members_page_info,
            )
            .await?;

        let members: Vec<Login> = schema::decode_pages::<MembersData>(query, pages)?
            .into_iter()
            .flat_map(|page| page.organization.members_with_role.nodes)
            .map(|node| node.login)
            .collect();

        info!(organization = %self.organization, members = members.len(), "members fetched");
        Ok(members)
    }

    /// Every team of the organization with its complete member list.
    pub async fn teams(&self) -> Result<Vec<Team>> {
        let query = &queries::ORGANIZATION_TEAMS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({
                    "organization": &*self.organization,
                    "first": self.page_size,
                    "members": self.page_size,
                }),
                schema::teams_page_info,
            )
            .await?;

        let mut teams = Vec::new();
        for page in schema::decode_pages::<TeamsData>(query, pages)? {
            for node in page.organization.teams.nodes {
                let mut members: Vec<Login> =
                    node.members.nodes.into_iter().map(|n| n.login).collect();
                if let Some(cursor) = node.members.page_info.next_cursor() {
                    members.extend(self.remaining_team_members(&node.slug, cursor).await?);
                }
                teams.push(Team::new(node.name, members));
            }
        }

        info!(organization = %self.organization, teams = teams.len(), "teams fetched");
        Ok(teams)
    }

    async fn remaining_team_members(&self, slug: &str, after: &str) -> Result<Vec<Login>> {
        let query = &queries::TEAM_MEMBERS;
        let pages = self
            .client
            .fetch_all(
                query,
                json!({
                    "organization": &*self.organization,
                    "slug": slug,
                    "first": self.page_size,
                    "after": after,
                }),
                schema::team_members_page_info,
            )
            .await?;

        let mut members = Vec::new();
        for page in schema::decode_pages::<TeamMembersData>(query, pages)? {
            let team = page.organization.team.ok_or_else(|| {
                RemoteError::schema(query.name, format!("team {slug} disappeared"))
            })?;
            members.extend(team.members.nodes.into_iter().map(|n| n.login));
        }
        Ok(members)
    }
}

impl fmt::Debug for OrgSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgSource")
            .field("organization", &self.organization)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
