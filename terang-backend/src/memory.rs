//! In-process backend.
//!
//! Keeps tables, users and blobs in memory with the same observable
//! behaviour as the hosted service: server-assigned ids and timestamps,
//! single-row semantics, a staff role check and auth-state notifications.
//! Failures can be injected per table, procedure or bucket.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    Auth, AuthEvent, AuthEvents, AuthSubscription, Backend, BackendError, BlobStorage, Connect,
    Database, Query, Result, Session, User,
};

/// Roles the `is_staff` procedure accepts.
pub const STAFF_ROLES: &[&str] = &["admin", "editor"];

const NO_SINGLE_ROW: &str = "JSON object requested, multiple (or no) rows returned";

/// Injected failure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The service answers with this error message.
    Api(String),
    /// No answer at all.
    Offline,
}

impl Failure {
    fn to_error(&self) -> BackendError {
        match self {
            Failure::Api(message) => BackendError::api(400, message.clone()),
            Failure::Offline => BackendError::Connection("backend unreachable".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
struct Store {
    tables: HashMap<String, Vec<Value>>,
    accounts: Vec<Account>,
    tokens: HashMap<String, String>,
    objects: HashMap<(String, String), StoredObject>,
    failures: HashMap<String, Failure>,
}

impl Store {
    fn check(&self, key: &str) -> Result<()> {
        match self.failures.get(key) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn user_for_token(&self, token: &str) -> Option<User> {
        let user_id = self.tokens.get(token)?;
        self.accounts.iter().find(|a| &a.id == user_id).map(|a| User {
            id: a.id.clone(),
            email: Some(a.email.clone()),
        })
    }

    fn role_of(&self, user_id: &str) -> Option<String> {
        self.tables
            .get("profiles")?
            .iter()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(user_id))
            .and_then(|p| p.get("role").and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// In-memory backend. Clones share the same data; each clone made by
/// [`Connect::connect`] carries its own session.
#[derive(Clone)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
    session: Arc<RwLock<Option<Session>>>,
    events: AuthEvents,
    uploads: Arc<AtomicUsize>,
    public_base: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            session: Arc::new(RwLock::new(None)),
            events: AuthEvents::new(),
            uploads: Arc::new(AtomicUsize::new(0)),
            public_base: "memory://terang".to_string(),
        }
    }

    /// Wrap a handle sharing this data as a [`Backend`].
    pub fn backend(&self) -> Backend {
        let shared = Arc::new(self.clone());
        Backend::new(shared.clone(), shared.clone(), shared)
    }

    /// Insert a row verbatim, filling `id` and timestamps when absent.
    pub fn seed(&self, table: &str, row: Value) -> Value {
        let row = stamp_new(row);
        self.store
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.store
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Register an account and, when `role` is given, its profile row.
    pub fn add_user(&self, email: &str, password: &str, role: Option<&str>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.store.lock().accounts.push(Account {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
        });
        if let Some(role) = role {
            let display_name = email.split('@').next().unwrap_or(email).to_string();
            self.seed(
                "profiles",
                serde_json::json!({
                    "id": id,
                    "email": email,
                    "display_name": display_name,
                    "role": role,
                }),
            );
        }
        id
    }

    /// Mint an access token for `user_id` without a password round trip.
    pub fn issue_token(&self, user_id: &str) -> String {
        let token = format!("mem-{}", uuid::Uuid::new_v4().simple());
        self.store
            .lock()
            .tokens
            .insert(token.clone(), user_id.to_string());
        token
    }

    /// Make every operation on `key` fail. Keys are table names,
    /// `rpc:<function>`, `storage:<bucket>` or `auth`.
    pub fn fail(&self, key: &str, failure: Failure) {
        self.store.lock().failures.insert(key.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        self.store.lock().failures.clear();
    }

    /// Number of upload calls that reached storage.
    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, name: &str) -> Option<(Bytes, String)> {
        self.store
            .lock()
            .objects
            .get(&(bucket.to_string(), name.to_string()))
            .map(|o| (o.data.clone(), o.content_type.clone()))
    }

    /// Emit an auth change to this handle's subscribers.
    pub fn notify(&self, event: AuthEvent) {
        self.events.emit(event, self.session.read().clone());
    }

    fn current_user(&self) -> Option<User> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn stamp_new(row: Value) -> Value {
    let mut object = match row {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let timestamp = now();
    object
        .entry("id")
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
    object
        .entry("created_at")
        .or_insert_with(|| Value::String(timestamp.clone()));
    object
        .entry("updated_at")
        .or_insert_with(|| Value::String(timestamp));
    Value::Object(object)
}

fn id_of(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl Database for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let store = self.store.lock();
        store.check(query.table_name())?;
        let mut rows = store
            .tables
            .get(query.table_name())
            .cloned()
            .unwrap_or_default();
        query.apply(&mut rows);
        Ok(rows)
    }

    async fn select_single(&self, query: &Query) -> Result<Value> {
        let mut rows = self.select(query).await?;
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(BackendError::NotFound(NO_SINGLE_ROW.to_string()))
        }
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        if !row.is_object() {
            return Err(BackendError::api(400, "row must be a JSON object"));
        }
        let mut store = self.store.lock();
        store.check(table)?;

        let mut row = row;
        if let Some(object) = row.as_object_mut() {
            object.remove("id");
            object.remove("created_at");
            object.remove("updated_at");
        }
        let row = stamp_new(row);
        store
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        let Value::Object(patch) = patch else {
            return Err(BackendError::api(400, "patch must be a JSON object"));
        };
        let mut store = self.store.lock();
        store.check(table)?;

        let row = store
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| id_of(r) == Some(id)))
            .ok_or_else(|| BackendError::NotFound(NO_SINGLE_ROW.to_string()))?;

        if let Some(object) = row.as_object_mut() {
            for (key, value) in patch {
                if key != "id" && key != "created_at" {
                    object.insert(key, value);
                }
            }
            object.insert("updated_at".to_string(), Value::String(now()));
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let mut store = self.store.lock();
        store.check(table)?;
        if let Some(rows) = store.tables.get_mut(table) {
            rows.retain(|r| id_of(r) != Some(id));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, _args: Value) -> Result<Value> {
        let store = self.store.lock();
        store.check(&format!("rpc:{}", function))?;

        match function {
            "is_staff" => {
                let staff = self
                    .current_user()
                    .and_then(|u| store.role_of(&u.id))
                    .is_some_and(|role| STAFF_ROLES.contains(&role.as_str()));
                Ok(Value::Bool(staff))
            }
            other => Err(BackendError::api(
                404,
                format!("Could not find the function public.{}", other),
            )),
        }
    }
}

#[async_trait]
impl Auth for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.store.lock().check("auth")?;
        Ok(self.session.read().clone())
    }

    async fn get_user(&self) -> Result<Option<User>> {
        let store = self.store.lock();
        store.check("auth")?;
        let token = self.session.read().as_ref().map(|s| s.access_token.clone());
        Ok(token.and_then(|t| store.user_for_token(&t)))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = {
            let mut store = self.store.lock();
            store.check("auth")?;

            let account = store
                .accounts
                .iter()
                .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
                .cloned()
                .ok_or_else(|| BackendError::api(400, "Invalid login credentials"))?;

            let token = format!("mem-{}", uuid::Uuid::new_v4().simple());
            store.tokens.insert(token.clone(), account.id.clone());
            Session {
                access_token: token,
                refresh_token: None,
                expires_in: Some(3600),
                user: User {
                    id: account.id,
                    email: Some(account.email),
                },
            }
        };

        *self.session.write() = Some(session.clone());
        self.events.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.session.write().take();
        let result = {
            let mut store = self.store.lock();
            if let Some(session) = &previous {
                store.tokens.remove(&session.access_token);
            }
            store.check("auth")
        };
        self.events.emit(AuthEvent::SignedOut, None);
        result
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl BlobStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.lock();
        store.check(&format!("storage:{}", bucket))?;

        let key = (bucket.to_string(), name.to_string());
        if store.objects.contains_key(&key) {
            return Err(BackendError::api(409, "The resource already exists"));
        }
        store.objects.insert(
            key,
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.public_base,
            crate::rest::object_path(bucket, name)
        )
    }

    async fn remove(&self, bucket: &str, names: &[String]) -> Result<()> {
        let mut store = self.store.lock();
        store.check(&format!("storage:{}", bucket))?;
        for name in names {
            store.objects.remove(&(bucket.to_string(), name.clone()));
        }
        Ok(())
    }
}

impl Connect for MemoryBackend {
    /// A handle over the same data whose session is resolved from
    /// `access_token`. Unknown tokens give an anonymous handle.
    fn connect(&self, access_token: Option<&str>) -> Result<Backend> {
        let session = access_token.and_then(|token| {
            self.store.lock().user_for_token(token).map(|user| Session {
                access_token: token.to_string(),
                refresh_token: None,
                expires_in: None,
                user,
            })
        });

        let scoped = Self {
            store: self.store.clone(),
            session: Arc::new(RwLock::new(session)),
            events: AuthEvents::new(),
            uploads: self.uploads.clone(),
            public_base: self.public_base.clone(),
        };
        Ok(scoped.backend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_server_fields() {
        let mem = MemoryBackend::new();
        let row = mem
            .insert("books", json!({"id": "client-id", "title": "Laut Bercerita"}))
            .await
            .unwrap();

        assert_ne!(row["id"], "client-id");
        assert!(row["created_at"].is_string());
        assert_eq!(row["created_at"], row["updated_at"]);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let mem = MemoryBackend::new();
        let row = mem.seed("beans", json!({"name": "Gayo", "origin": "Aceh"}));
        let id = row["id"].as_str().unwrap();

        let updated = mem
            .update("beans", id, json!({"origin": "Aceh Tengah"}))
            .await
            .unwrap();
        assert_eq!(updated["name"], "Gayo");
        assert_eq!(updated["origin"], "Aceh Tengah");
        assert_eq!(updated["id"], row["id"]);
    }

    #[tokio::test]
    async fn test_single_row_missing() {
        let mem = MemoryBackend::new();
        let err = mem
            .select_single(&Query::table("books").eq("id", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_is_staff_follows_profile_role() {
        let mem = MemoryBackend::new();
        mem.add_user("editor@terang.id", "pw", Some("editor"));
        mem.add_user("viewer@terang.id", "pw", Some("viewer"));

        assert_eq!(mem.rpc("is_staff", json!({})).await.unwrap(), json!(false));

        mem.sign_in_with_password("editor@terang.id", "pw").await.unwrap();
        assert_eq!(mem.rpc("is_staff", json!({})).await.unwrap(), json!(true));

        mem.sign_in_with_password("viewer@terang.id", "pw").await.unwrap();
        assert_eq!(mem.rpc("is_staff", json!({})).await.unwrap(), json!(false));
    }

    #[tokio::test]
    async fn test_connect_scopes_session() {
        let mem = MemoryBackend::new();
        let id = mem.add_user("admin@terang.id", "pw", Some("admin"));
        let token = mem.issue_token(&id);

        let scoped = mem.connect(Some(&token)).unwrap();
        let user = scoped.auth.get_user().await.unwrap().unwrap();
        assert_eq!(user.id, id);

        let anonymous = mem.connect(Some("bogus")).unwrap();
        assert!(anonymous.auth.get_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mem = MemoryBackend::new();
        mem.fail("events", Failure::Api("permission denied".into()));
        let err = mem
            .select(&Query::table("events").order("date", Direction::Asc))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "permission denied");

        mem.fail("events", Failure::Offline);
        let err = mem.select(&Query::table("events")).await.unwrap_err();
        assert!(err.is_transport());

        mem.clear_failures();
        assert!(mem.select(&Query::table("events")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_does_not_overwrite() {
        let mem = MemoryBackend::new();
        mem.upload("books", "a.png", Bytes::from_static(b"1"), "image/png")
            .await
            .unwrap();
        let err = mem
            .upload("books", "a.png", Bytes::from_static(b"2"), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(mem.upload_calls(), 2);
        assert_eq!(mem.object("books", "a.png").unwrap().0, Bytes::from_static(b"1"));
    }
}
