//! Table and procedure access.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Query, Result};

/// Row-level access to backend tables. Rows are JSON objects.
#[async_trait]
pub trait Database: Send + Sync {
    /// All rows matching `query`, in its order.
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Exactly one row; [`crate::BackendError::NotFound`] otherwise.
    async fn select_single(&self, query: &Query) -> Result<Value>;

    /// Insert one row and return it with server-assigned fields.
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Apply a partial patch to the row with `id` and return the result.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, table: &str, id: &str) -> Result<()>;

    /// Call a stored procedure.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value>;
}
