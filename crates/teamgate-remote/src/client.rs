//! Query client abstraction.
//!
//! The resolver never talks to the network directly. It needs exactly two
//! operations from the outside world: run one query, and run a paginated
//! query to exhaustion. Implementations may use HTTP ([`crate::HttpClient`])
//! or answer from memory ([`crate::MemoryDirectory`]).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{RemoteError, Result};
use crate::queries::Query;
use crate::schema::PageInfo;

/// Page size used when the caller does not set `$first`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Extracts the pagination state from one page of a query's response.
pub type PageInfoFn = fn(&Value) -> Result<PageInfo>;

/// Executes queries against the organization directory.
///
/// Implementations must be thread-safe (Send + Sync). Outbound throttling,
/// retries and deadlines belong to the implementation, not to callers.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Execute a single request and return its `data` object.
    async fn fetch_one(&self, query: &Query, variables: Value) -> Result<Value>;
}

/// Builds clients that act with a caller-supplied credential.
///
/// Identity checks must never run on the shared, organization-scoped
/// client; they get a fresh client holding only the caller's credential.
pub trait ClientFactory: Send + Sync {
    fn client_for_token(&self, token: &str) -> Result<Arc<dyn QueryClient>>;
}

/// Extension trait for common query patterns.
pub trait QueryClientExt: QueryClient {
    /// Run `query` until the upstream reports no further page.
    ///
    /// Requests are strictly sequential: each continuation cursor comes from
    /// the previous page as read by `page_info`. Pages are returned in
    /// request order. `$first` defaults to [`DEFAULT_PAGE_SIZE`].
    fn fetch_all(
        &self,
        query: &'static Query,
        variables: Value,
        page_info: PageInfoFn,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;
}

impl<C: QueryClient + ?Sized> QueryClientExt for C {
    async fn fetch_all(
        &self,
        query: &'static Query,
        mut variables: Value,
        page_info: PageInfoFn,
    ) -> Result<Vec<Value>> {
        let Some(vars) = variables.as_object_mut() else {
            return Err(RemoteError::InvalidRequest(format!(
                "variables of {} must be an object",
                query.name
            )));
        };
        vars.entry("first").or_insert(json!(DEFAULT_PAGE_SIZE));

        let mut pages = Vec::new();
        loop {
            let page = self.fetch_one(query, variables.clone()).await?;
            let info = page_info(&page)?;
            pages.push(page);

            match info.next_cursor() {
                Some(cursor) => variables["after"] = Value::String(cursor.to_string()),
                None => break,
            }
        }

        debug!(query = query.name, pages = pages.len(), "paginated query complete");
        Ok(pages)
    }
}
