//! Query documents understood by the organization directory.
//!
//! Every paginated query takes `$first` and `$after`; [`crate::QueryClientExt::fetch_all`]
//! fills them in. Nested connections (collaborators of a repository, members
//! of a team) take their own page size and are continued with a dedicated
//! query when they overflow.

/// A named query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    /// Operation name, used for logging, call accounting and error reports.
    pub name: &'static str,
    /// The document sent upstream.
    pub document: &'static str,
}

/// Login of the owner of the credential.
pub const VIEWER: Query = Query {
    name: "Viewer",
    document: r#"query Viewer {
  viewer {
    login
  }
}"#,
};

/// Members of the organization.
pub const ORGANIZATION_MEMBERS: Query = Query {
    name: "OrganizationMembers",
    document: r#"query OrganizationMembers($organization: String!, $first: Int!, $after: String) {
  organization(login: $organization) {
    membersWithRole(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { login }
    }
  }
}"#,
};

/// Teams of the organization with the first page of their members.
pub const ORGANIZATION_TEAMS: Query = Query {
    name: "OrganizationTeams",
    document: r#"query OrganizationTeams($organization: String!, $first: Int!, $after: String, $members: Int!) {
  organization(login: $organization) {
    teams(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        slug
        members(first: $members, membership: ALL) {
          pageInfo { hasNextPage endCursor }
          nodes { login }
        }
      }
    }
  }
}"#,
};

/// Continuation of a team's member list.
pub const TEAM_MEMBERS: Query = Query {
    name: "TeamMembers",
    document: r#"query TeamMembers($organization: String!, $slug: String!, $first: Int!, $after: String) {
  organization(login: $organization) {
    team(slug: $slug) {
      members(first: $first, after: $after, membership: ALL) {
        pageInfo { hasNextPage endCursor }
        nodes { login }
      }
    }
  }
}"#,
};

/// Content of one file (the package manifest) in every repository.
pub const REPOSITORY_MANIFESTS: Query = Query {
    name: "RepositoryManifests",
    document: r#"query RepositoryManifests($organization: String!, $first: Int!, $after: String, $expression: String!) {
  organization(login: $organization) {
    repositories(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        object(expression: $expression) {
          ... on Blob { text }
        }
      }
    }
  }
}"#,
};

/// Every repository with the first page of collaborators and their
/// permission sources.
pub const REPOSITORY_PERMISSIONS: Query = Query {
    name: "RepositoryPermissions",
    document: r#"query RepositoryPermissions($organization: String!, $first: Int!, $after: String, $collaborators: Int!) {
  organization(login: $organization) {
    repositories(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        collaborators(first: $collaborators) {
          pageInfo { hasNextPage endCursor }
          edges {
            node { login }
            permissionSources {
              permission
              source {
                __typename
                ... on Organization { login }
                ... on Repository { name }
                ... on Team { name }
              }
            }
          }
        }
      }
    }
  }
}"#,
};

/// Continuation of one repository's collaborator list.
pub const REPOSITORY_COLLABORATORS: Query = Query {
    name: "RepositoryCollaborators",
    document: r#"query RepositoryCollaborators($organization: String!, $repository: String!, $first: Int!, $after: String) {
  repository(owner: $organization, name: $repository) {
    collaborators(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      edges {
        node { login }
        permissionSources {
          permission
          source {
            __typename
            ... on Organization { login }
            ... on Repository { name }
            ... on Team { name }
          }
        }
      }
    }
  }
}"#,
};
