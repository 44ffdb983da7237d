//! # teamgate Remote
//!
//! The boundary between teamgate and the organization directory.
//!
//! ## Overview
//!
//! The resolver depends on two operations only: run one query
//! ([`QueryClient::fetch_one`]) and run a paginated query until the last
//! page ([`QueryClientExt::fetch_all`]). Everything upstream of that
//! (transport, credentials, throttling) is an implementation of
//! [`QueryClient`].
//!
//! ## Key Types
//!
//! - [`QueryClient`] - Executes one query, returns its `data` object
//! - [`ClientFactory`] - Builds clients scoped to one caller's credential
//! - [`Query`] - A named query document, see [`queries`]
//! - [`schema`] - Typed response shapes, validated on ingestion
//! - [`MemoryDirectory`] - In-memory organization for tests
//! - [`HttpClient`] - GraphQL over HTTPS
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use teamgate_remote::{queries, schema, MemoryDirectory, QueryClientExt};
//!
//! async fn example() {
//!     let directory = MemoryDirectory::new("acme").with_member("octocat");
//!
//!     let pages = directory
//!         .fetch_all(
//!             &queries::ORGANIZATION_MEMBERS,
//!             json!({ "organization": "acme" }),
//!             schema::members_page_info,
//!         )
//!         .await
//!         .unwrap();
//!     assert_eq!(pages.len(), 1);
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod queries;
pub mod schema;

pub use client::{ClientFactory, PageInfoFn, QueryClient, QueryClientExt, DEFAULT_PAGE_SIZE};
pub use error::{RemoteError, Result};
pub use http::{HttpClient, HttpClientFactory, DEFAULT_ENDPOINT};
pub use memory::{
    GrantOrigin, MemoryCollaborator, MemoryDirectory, MemoryRepository, MemorySource, MemoryTeam,
    DEFAULT_MANIFEST_PATH,
};
pub use queries::Query;
pub use schema::PageInfo;
