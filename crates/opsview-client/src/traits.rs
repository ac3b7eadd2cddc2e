//! Opsview REST API trait

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Query parameters as ordered key/value pairs
pub type Params<'a> = [(&'a str, String)];

/// The subset of the Opsview REST API the reconcilers drive
///
/// Resources are relative to `<endpoint>/rest/`. Implementations return an
/// error for any non-2xx response; callers only look at payloads.
#[async_trait]
pub trait OpsviewApi: Send + Sync {
    async fn get(&self, resource: &str, params: &Params<'_>) -> Result<Value>;
    async fn post(&self, resource: &str, params: &Params<'_>, body: Value) -> Result<Value>;
    async fn delete(&self, resource: &str, params: &Params<'_>) -> Result<Value>;

    /// Trigger a configuration reload
    async fn reload(&self, asynchronous: bool) -> Result<()>;

    /// Fetch the raw reload status map
    async fn reload_status(&self) -> Result<Map<String, Value>>;
}
