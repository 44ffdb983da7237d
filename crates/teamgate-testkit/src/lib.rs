//! # teamgate Testkit
//!
//! Testing utilities for teamgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: The standard test organization, served by an in-memory directory
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use teamgate_testkit::OrgFixture;
//!
//! let fixture = OrgFixture::new();
//! let directory = fixture.directory();
//! assert_eq!(directory.organization(), "acme");
//! assert_eq!(fixture.package(1), "pkg_1");
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use teamgate_testkit::generators::ResolutionParams;
//!
//! proptest! {
//!     #[test]
//!     fn resolution_is_deterministic(params: ResolutionParams) {
//!         let a = resolve(&params.user, &params.catalog, &params.repositories);
//!         let b = resolve(&params.user, &params.catalog, &params.repositories);
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{isolated_fixtures, OrgFixture, REPOSITORIES, USERS};
pub use generators::ResolutionParams;
