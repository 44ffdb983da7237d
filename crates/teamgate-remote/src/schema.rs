//! Typed response schemas.
//!
//! Responses arrive as untyped JSON and are validated here, once, at the
//! ingestion boundary. Everything past this module works with typed values;
//! a response of the wrong shape becomes [`RemoteError::Schema`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use teamgate_core::Login;

use crate::error::{RemoteError, Result};
use crate::queries::{self, Query};

/// Pagination state of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor for the next page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// A page of nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

/// A user as returned in member lists and as the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserNode {
    pub login: Login,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerData {
    pub viewer: UserNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembers {
    pub members_with_role: Connection<UserNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembersData {
    pub organization: OrganizationMembers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamNode {
    pub name: String,
    pub slug: String,
    pub members: Connection<UserNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationTeams {
    pub teams: Connection<TeamNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsData {
    pub organization: OrganizationTeams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamMembers {
    pub members: Connection<UserNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationTeam {
    pub team: Option<TeamMembers>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamMembersData {
    pub organization: OrganizationTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRepositories<T> {
    pub repositories: Connection<T>,
}

/// Text of a blob. Non-blob objects (trees, submodules) decode with no text.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobText {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestNode {
    pub name: String,
    pub object: Option<BlobText>,
}

impl ManifestNode {
    /// Manifest content, if the repository has one.
    pub fn text(&self) -> Option<&str> {
        self.object.as_ref().and_then(|o| o.text.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestsData {
    pub organization: OrganizationRepositories<ManifestNode>,
}

/// Where a collaborator's permission comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum PermissionOrigin {
    /// Organization-wide base permission.
    Organization { login: String },
    /// Granted directly on the repository.
    Repository { name: String },
    /// Conferred by membership of a team.
    Team { name: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionSourceNode {
    /// Raw label; validated by the permission mapper, not here.
    pub permission: Option<String>,
    pub source: PermissionOrigin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorEdge {
    pub node: UserNode,
    #[serde(default)]
    pub permission_sources: Vec<PermissionSourceNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<CollaboratorEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryNode {
    pub name: String,
    /// Absent when the credential cannot see collaborators of this repository.
    pub collaborators: Option<CollaboratorConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsData {
    pub organization: OrganizationRepositories<RepositoryNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryCollaborators {
    pub collaborators: CollaboratorConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorsData {
    pub repository: Option<RepositoryCollaborators>,
}

/// Decode one response of `query` into its typed form.
pub fn decode<T: DeserializeOwned>(query: &Query, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| RemoteError::schema(query.name, e))
}

/// Decode every page of a paginated response.
pub fn decode_pages<T: DeserializeOwned>(query: &Query, pages: Vec<Value>) -> Result<Vec<T>> {
    pages.into_iter().map(|page| decode(query, page)).collect()
}

fn page_info_at(query: &Query, data: &Value, pointer: &str) -> Result<PageInfo> {
    let info = data
        .pointer(pointer)
        .ok_or_else(|| RemoteError::schema(query.name, format!("missing {pointer}")))?;
    PageInfo::deserialize(info).map_err(|e| RemoteError::schema(query.name, e))
}

/// Page info of [`queries::ORGANIZATION_MEMBERS`].
pub fn members_page_info(data: &Value) -> Result<PageInfo> {
    page_info_at(
        &queries::ORGANIZATION_MEMBERS,
        data,
        "/organization/membersWithRole/pageInfo",
    )
}

/// Page info of [`queries::ORGANIZATION_TEAMS`].
pub fn teams_page_info(data: &Value) -> Result<PageInfo> {
    page_info_at(&queries::ORGANIZATION_TEAMS, data, "/organization/teams/pageInfo")
}

/// Page info of [`queries::TEAM_MEMBERS`].
pub fn team_members_page_info(data: &Value) -> Result<PageInfo> {
    page_info_at(&queries::TEAM_MEMBERS, data, "/organization/team/members/pageInfo")
}

/// Page info of [`queries::REPOSITORY_MANIFESTS`] and [`queries::REPOSITORY_PERMISSIONS`].
pub fn repositories_page_info(data: &Value) -> Result<PageInfo> {
    page_info_at(
        &queries::REPOSITORY_PERMISSIONS,
        data,
        "/organization/repositories/pageInfo",
    )
}

/// Page info of [`queries::REPOSITORY_COLLABORATORS`].
pub fn collaborators_page_info(data: &Value) -> Result<PageInfo> {
    page_info_at(
        &queries::REPOSITORY_COLLABORATORS,
        data,
        "/repository/collaborators/pageInfo",
    )
}
