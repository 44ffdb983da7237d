//! Per-user package permissions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use teamgate_cache::{cache_key, ResultCache, DEFAULT_TTL};
use teamgate_core::{Catalog, PermissionSet, RegistryUser};

use crate::aggregate::{RepositoryAggregator, RepositoryPermissionMap};
use crate::catalog::{CatalogBuilder, CatalogFilter};
use crate::error::{PermsError, Result};
use crate::source::OrgSource;

const PACKAGE_PERMISSIONS_FOR_USER: &str = "packagePermissionsForUser";

/// Package name → what the user may do with it. Never holds an empty set.
pub type PackagePermissions = BTreeMap<String, PermissionSet>;

/// Settings shared by the catalog, the aggregator and the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Path of the manifest naming each repository's package.
    pub manifest_path: String,
    pub filter: CatalogFilter,
    /// Lifetime of every cached snapshot.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_path: teamgate_remote::DEFAULT_MANIFEST_PATH.to_string(),
            filter: CatalogFilter::default(),
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// Combine a catalog and an aggregate into the permissions of one user.
///
/// Packages whose repository is not in the aggregate are skipped; packages
/// the user holds nothing on are omitted.
pub fn resolve(
    user: &RegistryUser,
    catalog: &Catalog,
    repositories: &RepositoryPermissionMap,
) -> PackagePermissions {
    catalog
        .iter()
        .filter_map(|(package, repository)| {
            let permissions = repositories.get(repository)?;
            let set = permissions.effective(&user.login, user.team_names());
            (!set.is_empty()).then(|| (package.clone(), set))
        })
        .collect()
}

/// Resolves which packages a user may read or write.
pub struct PermissionResolver {
    catalog: Arc<CatalogBuilder>,
    aggregator: Arc<RepositoryAggregator>,
    cache: ResultCache<Arc<PackagePermissions>, PermsError>,
}

impl PermissionResolver {
    pub fn new(source: OrgSource, config: ResolverConfig) -> Self {
        let catalog = CatalogBuilder::with_ttl(
            source.clone(),
            config.manifest_path,
            config.filter,
            config.cache_ttl,
        );
        let aggregator = RepositoryAggregator::with_ttl(source, config.cache_ttl);

        Self {
            catalog: Arc::new(catalog),
            aggregator: Arc::new(aggregator),
            cache: ResultCache::new(config.cache_ttl),
        }
    }

    pub fn catalog(&self) -> &CatalogBuilder {
        &self.catalog
    }

    pub fn aggregator(&self) -> &RepositoryAggregator {
        &self.aggregator
    }

    /// Every package `user` holds a permission on.
    ///
    /// Cached per login. The teams of the first request within a TTL window
    /// are the ones the entry is computed with.
    pub async fn package_permissions_for_user(
        &self,
        user: &RegistryUser,
    ) -> Result<Arc<PackagePermissions>> {
        let key = cache_key(PACKAGE_PERMISSIONS_FOR_USER, &[user.login.as_str()]);
        let catalog = Arc::clone(&self.catalog);
        let aggregator = Arc::clone(&self.aggregator);
        let user = user.clone();

        self.cache
            .get_or_compute(&key, move || async move {
                let (packages, repositories) =
                    tokio::try_join!(catalog.package_names(), aggregator.repository_permissions())?;
                let resolved = resolve(&user, &packages, &repositories);
                debug!(user = %user.login, packages = resolved.len(), "permissions resolved");
                Ok(Arc::new(resolved))
            })
            .await
    }

    /// What `user` may do with `package`; empty if nothing.
    pub async fn package_permissions_for_user_for_package(
        &self,
        user: &RegistryUser,
        package: &str,
    ) -> Result<PermissionSet> {
        let permissions = self.package_permissions_for_user(user).await?;
        Ok(permissions.get(package).copied().unwrap_or_default())
    }
}
