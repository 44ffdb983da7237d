//! # teamgate Permissions
//!
//! Package permissions derived from an organization's repositories and teams.
//!
//! ## Overview
//!
//! A package belongs to the repository whose manifest names it. What a user
//! may do with a package is what the user may do with that repository:
//! the direct grant (organization default or repository collaborator) unioned
//! with the grant of every team the user is in.
//!
//! Three snapshots back every answer, each cached for a bounded time:
//!
//! 1. **Catalog**: package name → repository name ([`CatalogBuilder`])
//! 2. **Aggregate**: repository → direct and per-team grants ([`RepositoryAggregator`])
//! 3. **Per-user view**: package → permission set ([`PermissionResolver`])
//!
//! The catalog and the aggregate are fetched and expire independently. The
//! per-user view is derived from both.
//!
//! ## Key Types
//!
//! - [`OrgSource`] - Complete, typed reads of one organization
//! - [`CatalogFilter`] - Include/exclude/pattern filter on repository names
//! - [`PermissionResolver`] - Entry point for access checks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teamgate_core::{Login, PackagePermission, RegistryUser};
//! use teamgate_perms::{OrgSource, PermissionResolver, ResolverConfig};
//! use teamgate_remote::MemoryDirectory;
//!
//! async fn example() {
//!     let directory = MemoryDirectory::new("acme");
//!     let source = OrgSource::new(Arc::new(directory), "acme");
//!     let resolver = PermissionResolver::new(source, ResolverConfig::default());
//!
//!     let user = RegistryUser::new(Login::new("octocat"), ["acme"]);
//!     let set = resolver
//!         .package_permissions_for_user_for_package(&user, "left-pad")
//!         .await
//!         .unwrap();
//!     assert!(!set.contains(PackagePermission::Write));
//! }
//! ```

pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod resolver;
pub mod source;

pub use aggregate::{fold_collaborators, RepositoryAggregator, RepositoryPermissionMap};
pub use catalog::{CatalogBuilder, CatalogFilter};
pub use error::{PermsError, Result};
pub use resolver::{resolve, PackagePermissions, PermissionResolver, ResolverConfig};
pub use source::{OrgSource, PackageFile, RepositoryCollaborators};
