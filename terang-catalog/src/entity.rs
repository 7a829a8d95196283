//! Table access shared by every catalog entity.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use terang_backend::{Database, Direction, Query};
use tracing::debug;

use crate::{CatalogError, Result, Validate};

/// Which rows a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only rows whose visibility flag is set.
    Public,
    /// Every row.
    Admin,
}

/// A catalog table and its record shapes.
pub trait Entity: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    /// Insert payload, without id or timestamps.
    type Input: Serialize + DeserializeOwned + Validate + Send + Sync;
    /// Partial update; absent fields are left untouched.
    type Patch: Serialize + DeserializeOwned + Validate + Send + Sync;

    const TABLE: &'static str;
    /// Label used in messages, e.g. "menu item".
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    /// Boolean column gating public listings.
    const VISIBILITY_COLUMN: &'static str;
    const ORDER_BY: &'static str;
    const ORDER_DIRECTION: Direction;

    fn id(&self) -> &str;
}

/// Listing query for `visibility`, in the entity's fixed order.
pub fn list_query<E: Entity>(visibility: Visibility) -> Query {
    let query = Query::table(E::TABLE);
    let query = match visibility {
        Visibility::Public => query.eq(E::VISIBILITY_COLUMN, true),
        Visibility::Admin => query,
    };
    query.order(E::ORDER_BY, E::ORDER_DIRECTION)
}

fn decode<E: Entity>(row: Value) -> Result<E> {
    serde_json::from_value(row).map_err(|e| CatalogError::decode(E::TABLE, e))
}

fn encode<T: Serialize>(table: &'static str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| CatalogError::decode(table, e))
}

pub async fn fetch_all<E: Entity>(db: &dyn Database, visibility: Visibility) -> Result<Vec<E>> {
    let rows = db.select(&list_query::<E>(visibility)).await?;
    debug!(table = E::TABLE, rows = rows.len(), "fetched");
    rows.into_iter().map(decode::<E>).collect()
}

/// One row by id, regardless of visibility.
pub async fn fetch_one<E: Entity>(db: &dyn Database, id: &str) -> Result<E> {
    let row = db.select_single(&Query::table(E::TABLE).eq("id", id)).await?;
    decode(row)
}

/// One row by id, only when publicly visible.
pub async fn fetch_visible<E: Entity>(db: &dyn Database, id: &str) -> Result<E> {
    let query = Query::table(E::TABLE)
        .eq("id", id)
        .eq(E::VISIBILITY_COLUMN, true);
    decode(db.select_single(&query).await?)
}

pub async fn create<E: Entity>(db: &dyn Database, input: &E::Input) -> Result<E> {
    let row = db.insert(E::TABLE, encode(E::TABLE, input)?).await?;
    decode(row)
}

pub async fn update<E: Entity>(db: &dyn Database, id: &str, patch: &E::Patch) -> Result<E> {
    let row = db.update(E::TABLE, id, encode(E::TABLE, patch)?).await?;
    decode(row)
}

pub async fn delete<E: Entity>(db: &dyn Database, id: &str) -> Result<()> {
    db.delete(E::TABLE, id).await?;
    Ok(())
}

/// Number of rows visible to `visibility`.
pub async fn count<E: Entity>(db: &dyn Database, visibility: Visibility) -> Result<usize> {
    Ok(db.select(&list_query::<E>(visibility)).await?.len())
}
