//! Repository permission aggregation.
//!
//! Folds every collaborator and every permission source of every repository
//! into one [`RepositoryPermissions`] per repository. Direct grants land on
//! the user; team grants land on the team and are applied per user later.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use teamgate_cache::{ResultCache, DEFAULT_TTL};
use teamgate_core::{map_label, RepositoryPermissions};
use teamgate_remote::schema::{CollaboratorEdge, PermissionOrigin};

use crate::error::{PermsError, Result};
use crate::source::OrgSource;

const REPOSITORY_PERMISSIONS: &str = "repositoryPermissions";

/// Repository name → everything granted on it.
pub type RepositoryPermissionMap = BTreeMap<String, RepositoryPermissions>;

/// Fold the collaborators of one repository.
///
/// Fails on the first permission label outside the known vocabulary.
pub fn fold_collaborators(edges: &[CollaboratorEdge]) -> Result<RepositoryPermissions> {
    let mut permissions = RepositoryPermissions::new();

    for edge in edges {
        let login = &edge.node.login;
        permissions.touch_user(login.clone());

        for source in &edge.permission_sources {
            let set = map_label(source.permission.as_deref())?;
            match &source.source {
                PermissionOrigin::Organization { .. } | PermissionOrigin::Repository { .. } => {
                    permissions.grant_user(login.clone(), set);
                }
                PermissionOrigin::Team { name } => permissions.grant_team(name.as_str(), set),
                PermissionOrigin::Unknown => {
                    warn!(user = %login, "skipping permission source of unknown origin");
                }
            }
        }
    }

    Ok(permissions)
}

/// Aggregates permissions of every repository in the organization.
pub struct RepositoryAggregator {
    source: OrgSource,
    cache: ResultCache<Arc<RepositoryPermissionMap>, PermsError>,
}

impl RepositoryAggregator {
    pub fn new(source: OrgSource) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: OrgSource, ttl: Duration) -> Self {
        Self {
            source,
            cache: ResultCache::new(ttl),
        }
    }

    /// Permissions of every repository, fetched at most once per TTL.
    pub async fn repository_permissions(&self) -> Result<Arc<RepositoryPermissionMap>> {
        let source = self.source.clone();
        self.cache
            .get_or_compute(REPOSITORY_PERMISSIONS, move || async move {
                let mut aggregate = RepositoryPermissionMap::new();
                for repository in source.repository_collaborators().await? {
                    let permissions = fold_collaborators(&repository.edges)?;
                    debug!(
                        repository = %repository.repository,
                        users = permissions.users.len(),
                        teams = permissions.teams.len(),
                        "repository aggregated"
                    );
                    aggregate.insert(repository.repository, permissions);
                }
                Ok(Arc::new(aggregate))
            })
            .await
    }
}
