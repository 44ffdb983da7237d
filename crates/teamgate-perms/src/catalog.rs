//! Package catalog.
//!
//! Maps package names to the repository that publishes them. The package
//! name is the `name` field of each repository's manifest.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use teamgate_cache::{ResultCache, DEFAULT_TTL};
use teamgate_core::Catalog;

use crate::error::{PermsError, Result};
use crate::source::{OrgSource, PackageFile};

const PACKAGE_FILES: &str = "packageFiles";
const PACKAGE_NAMES: &str = "packageNames";

type FilesCache = ResultCache<Arc<Vec<PackageFile>>, PermsError>;

/// Which repositories may publish packages.
///
/// Every part is optional. Applied in order: `include`, then `exclude`,
/// then `pattern`.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Keep only these repositories.
    pub include: Option<Vec<String>>,
    /// Drop these repositories.
    pub exclude: Option<Vec<String>>,
    /// Keep only repositories whose name matches.
    pub pattern: Option<Regex>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(repositories.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(repositories.into_iter().map(Into::into).collect());
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Whether `repository` passes every configured filter.
    pub fn admits(&self, repository: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.iter().any(|r| r == repository) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.iter().any(|r| r == repository) {
                return false;
            }
        }
        match &self.pattern {
            Some(pattern) => pattern.is_match(repository),
            None => true,
        }
    }

    /// Build the catalog from manifests, in order; a later repository
    /// declaring the same package name replaces an earlier one.
    pub fn apply(&self, files: &[PackageFile]) -> Catalog {
        files
            .iter()
            .filter(|file| self.admits(&file.repository))
            .filter_map(|file| Some((package_name(file)?, file.repository.clone())))
            .collect()
    }
}

#[derive(Deserialize)]
struct Manifest {
    name: Option<String>,
}

fn package_name(file: &PackageFile) -> Option<String> {
    match serde_json::from_str::<Manifest>(&file.content) {
        Ok(Manifest { name: Some(name) }) if !name.is_empty() => Some(name),
        Ok(_) => {
            debug!(repository = %file.repository, "manifest has no name");
            None
        }
        Err(e) => {
            debug!(repository = %file.repository, error = %e, "manifest is not valid JSON");
            None
        }
    }
}

/// Builds the package catalog of an organization.
///
/// The manifest fetch and the derived catalog are cached separately, each
/// for the configured TTL.
pub struct CatalogBuilder {
    source: OrgSource,
    manifest_path: Arc<str>,
    filter: Arc<CatalogFilter>,
    files: Arc<FilesCache>,
    names: ResultCache<Arc<Catalog>, PermsError>,
}

impl CatalogBuilder {
    pub fn new(source: OrgSource, manifest_path: impl Into<String>, filter: CatalogFilter) -> Self {
        Self::with_ttl(source, manifest_path, filter, DEFAULT_TTL)
    }

    pub fn with_ttl(
        source: OrgSource,
        manifest_path: impl Into<String>,
        filter: CatalogFilter,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            manifest_path: manifest_path.into().into(),
            filter: Arc::new(filter),
            files: Arc::new(ResultCache::new(ttl)),
            names: ResultCache::new(ttl),
        }
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    /// Manifest content of every repository that has one.
    pub async fn package_files(&self) -> Result<Arc<Vec<PackageFile>>> {
        fetch_package_files(&self.files, &self.source, &self.manifest_path).await
    }

    /// Package name → repository name, after filtering.
    pub async fn package_names(&self) -> Result<Arc<Catalog>> {
        let files = Arc::clone(&self.files);
        let source = self.source.clone();
        let path = Arc::clone(&self.manifest_path);
        let filter = Arc::clone(&self.filter);

        self.names
            .get_or_compute(PACKAGE_NAMES, move || async move {
                let files = fetch_package_files(&files, &source, &path).await?;
                let catalog = filter.apply(&files);
                debug!(packages = catalog.len(), "catalog built");
                Ok(Arc::new(catalog))
            })
            .await
    }
}

async fn fetch_package_files(
    cache: &FilesCache,
    source: &OrgSource,
    path: &Arc<str>,
) -> Result<Arc<Vec<PackageFile>>> {
    let source = source.clone();
    let path = Arc::clone(path);
    cache
        .get_or_compute(PACKAGE_FILES, move || async move {
            source.package_files(&path).await.map(Arc::new)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamgate_remote::{queries, MemoryDirectory, MemoryRepository, RemoteError};

    fn file(repository: &str, content: &str) -> PackageFile {
        PackageFile {
            repository: repository.into(),
            content: content.into(),
        }
    }

    fn standard_files() -> Vec<PackageFile> {
        (1..=4)
            .map(|i| file(&format!("repo_{i}"), &format!(r#"{{"name":"pkg_{i}"}}"#)))
            .collect()
    }

    fn catalog(entries: &[(&str, &str)]) -> Catalog {
        entries.iter().map(|(p, r)| (p.to_string(), r.to_string())).collect()
    }

    #[test]
    fn test_unfiltered() {
        let catalog_ = CatalogFilter::new().apply(&standard_files());
        assert_eq!(
            catalog_,
            catalog(&[
                ("pkg_1", "repo_1"),
                ("pkg_2", "repo_2"),
                ("pkg_3", "repo_3"),
                ("pkg_4", "repo_4"),
            ])
        );
    }

    #[test]
    fn test_include() {
        let filter = CatalogFilter::new().include(["repo_1", "repo_3"]);
        assert_eq!(
            filter.apply(&standard_files()),
            catalog(&[("pkg_1", "repo_1"), ("pkg_3", "repo_3")])
        );
    }

    #[test]
    fn test_exclude() {
        let filter = CatalogFilter::new().exclude(["repo_2"]);
        assert_eq!(
            filter.apply(&standard_files()),
            catalog(&[("pkg_1", "repo_1"), ("pkg_3", "repo_3"), ("pkg_4", "repo_4")])
        );
    }

    #[test]
    fn test_pattern() {
        let filter = CatalogFilter::new().pattern(Regex::new("^repo_[12]$").unwrap());
        assert_eq!(
            filter.apply(&standard_files()),
            catalog(&[("pkg_1", "repo_1"), ("pkg_2", "repo_2")])
        );
    }

    #[test]
    fn test_filters_combine() {
        let filter = CatalogFilter::new()
            .include(["repo_1", "repo_2", "repo_3"])
            .exclude(["repo_3"])
            .pattern(Regex::new("_1$").unwrap());
        assert_eq!(filter.apply(&standard_files()), catalog(&[("pkg_1", "repo_1")]));
    }

    #[test]
    fn test_unparseable_manifests_are_skipped() {
        let files = vec![
            file("repo_1", "not json"),
            file("repo_2", r#"{"version":"1.0.0"}"#),
            file("repo_3", r#"{"name":""}"#),
            file("repo_4", r#"{"name":42}"#),
            file("repo_5", r#"{"name":"pkg_5"}"#),
        ];
        assert_eq!(CatalogFilter::new().apply(&files), catalog(&[("pkg_5", "repo_5")]));
    }

    #[test]
    fn test_last_repository_wins() {
        let files = vec![file("repo_a", r#"{"name":"pkg"}"#), file("repo_b", r#"{"name":"pkg"}"#)];
        assert_eq!(CatalogFilter::new().apply(&files), catalog(&[("pkg", "repo_b")]));
    }

    fn directory() -> MemoryDirectory {
        (1..=4).fold(MemoryDirectory::new("acme"), |dir, i| {
            dir.with_repository(
                MemoryRepository::new(format!("repo_{i}"))
                    .with_manifest(format!(r#"{{"name":"pkg_{i}"}}"#)),
            )
        })
    }

    #[tokio::test]
    async fn test_package_names_fetch_once() {
        let directory = directory();
        let builder = CatalogBuilder::new(
            OrgSource::new(Arc::new(directory.clone()), "acme"),
            "package.json",
            CatalogFilter::new().exclude(["repo_4"]),
        );

        let first = builder.package_names().await.unwrap();
        let second = builder.package_names().await.unwrap();
        builder.package_files().await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(directory.calls(&queries::REPOSITORY_MANIFESTS), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_package_names_refresh_after_ttl() {
        let directory = directory();
        let builder = CatalogBuilder::with_ttl(
            OrgSource::new(Arc::new(directory.clone()), "acme"),
            "package.json",
            CatalogFilter::new(),
            Duration::from_secs(60),
        );

        assert_eq!(builder.package_names().await.unwrap().len(), 4);
        directory.add_repository(MemoryRepository::new("repo_5").with_manifest(r#"{"name":"pkg_5"}"#));
        assert_eq!(builder.package_names().await.unwrap().len(), 4);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(builder.package_names().await.unwrap().len(), 5);
        assert_eq!(directory.calls(&queries::REPOSITORY_MANIFESTS), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let directory = directory();
        let builder = CatalogBuilder::new(
            OrgSource::new(Arc::new(directory.clone()), "acme"),
            "package.json",
            CatalogFilter::new(),
        );
        directory.fail_query(&queries::REPOSITORY_MANIFESTS, RemoteError::Transport("reset".into()));

        assert!(builder.package_names().await.is_err());

        directory.clear_failures();
        assert_eq!(builder.package_names().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_custom_manifest_path() {
        let directory = MemoryDirectory::new("acme")
            .with_repository(MemoryRepository::new("repo_1").with_file("npm/package.json", r#"{"name":"pkg_1"}"#))
            .with_repository(MemoryRepository::new("repo_2").with_manifest(r#"{"name":"pkg_2"}"#));
        let builder = CatalogBuilder::new(
            OrgSource::new(Arc::new(directory), "acme"),
            "npm/package.json",
            CatalogFilter::new(),
        );

        assert_eq!(*builder.package_names().await.unwrap(), catalog(&[("pkg_1", "repo_1")]));
    }
}
