//! # teamgate
//!
//! Package registry authentication and authorization backed by an
//! organization's members, teams and repositories.
//!
//! ## Overview
//!
//! A registry user authenticates with a username and a personal credential.
//! The credential must belong to that user, the user must be a member of the
//! configured organization, and the groups handed back to the registry are
//! the organization itself plus every team the user is in.
//!
//! Every package is published from one repository of the organization. On
//! each access check the user may:
//!
//! - **install** a package if they can read its repository
//! - **publish** or **unpublish** it if they can write to its repository
//!
//! ## Key Concepts
//!
//! - **Direct grant**: organization base permission or repository collaborator grant
//! - **Team grant**: permission a team confers on a repository
//! - **Login**: case-insensitive user identity
//! - **Snapshot**: a cached, complete read of the organization, refreshed after its TTL
//!
//! ## Usage
//!
//! ```rust,no_run
//! use teamgate::{AuthConfig, AuthOutcome, AuthPlugin, Login, RegistryUser};
//!
//! async fn example() {
//!     let config = AuthConfig::from_yaml("organization: acme\ntoken: s3cret\n").unwrap();
//!     let plugin = AuthPlugin::from_config(&config).unwrap();
//!
//!     if let AuthOutcome::Authorized(groups) = plugin.authenticate("octocat", "ghp_...").await {
//!         let user = RegistryUser::new(Login::new("octocat"), groups);
//!         let may_publish = plugin.allow_publish(&user, "left-pad").await.unwrap();
//!         println!("publish allowed: {may_publish}");
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `teamgate::core` - Permission labels, permission sets, logins and teams
//! - `teamgate::cache` - The result cache
//! - `teamgate::remote` - Query client boundary and in-memory directory
//! - `teamgate::perms` - Catalog, aggregation and resolution

pub mod config;
pub mod error;
pub mod plugin;
pub mod verifier;

// Re-export component crates
pub use teamgate_cache as cache;
pub use teamgate_core as core;
pub use teamgate_perms as perms;
pub use teamgate_remote as remote;

// Re-export main types for convenience
pub use config::{AuthConfig, Settings};
pub use error::{AuthError, AuthenticationError, ConfigError, LoginState, PluginError, Result};
pub use plugin::{credential_digest, AuthOutcome, AuthPlugin};
pub use verifier::OrganizationVerifier;

// Re-export commonly used core types
pub use teamgate_core::{Login, PackagePermission, PermissionSet, RegistryUser, Team};
