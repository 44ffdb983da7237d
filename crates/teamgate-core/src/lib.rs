//! # teamgate Core
//!
//! Pure primitives for teamgate: the remote permission vocabulary, the
//! two-valued package permission lattice, logins and teams.
//!
//! This crate contains no I/O, no caching, no networking. It is pure
//! computation over permission sets.
//!
//! ## Key Types
//!
//! - [`PermissionLabel`] - Repository permission as reported by the organization
//! - [`PackagePermission`] - `read` or `write` on a published package
//! - [`PermissionSet`] - A subset of `{read, write}`
//! - [`Login`] - Case-insensitive user identity
//! - [`RepositoryPermissions`] - Direct and per-team grants on one repository
//! - [`RegistryUser`] - A login with the teams it authenticated with
//!
//! ## Mapping
//!
//! ```rust
//! use teamgate_core::{map_label, PackagePermission};
//!
//! let set = map_label(Some("MAINTAIN")).unwrap();
//! assert!(set.contains(PackagePermission::Write));
//! assert!(map_label(Some("OWNER")).is_err());
//! ```

pub mod error;
pub mod label;
pub mod permission;
pub mod types;

pub use error::{CoreError, Result};
pub use label::{map_label, PermissionLabel};
pub use permission::{union, PackagePermission, PermissionSet};
pub use types::{Catalog, Login, RegistryUser, RepositoryPermissions, Team};
