//! REST implementation over the hosted backend's HTTP APIs.
//!
//! Tables go through PostgREST (`/rest/v1`), sessions through GoTrue
//! (`/auth/v1`) and blobs through the storage API (`/storage/v1`).

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::sync::Arc;
use terang_config::BackendConfig;
use tracing::{debug, warn};

use crate::{
    Auth, AuthEvent, AuthEvents, AuthSubscription, Backend, BackendError, BlobStorage, Connect,
    Database, HttpClient, HttpClientConfig, Query, RequestBuilder, Response, Result, Session, User,
};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Default)]
struct SessionState {
    /// Token the client was scoped to, verified lazily.
    token: Option<String>,
    session: Option<Session>,
}

/// Backend client speaking the PostgREST, GoTrue and storage protocols.
#[derive(Clone)]
pub struct RestBackend {
    http: HttpClient,
    base_url: String,
    anon_key: String,
    state: Arc<RwLock<SessionState>>,
    events: AuthEvents,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let (url, anon_key) = config.require()?;
        let base_url = url.trim_end_matches('/').to_string();
        let http = HttpClient::new(
            HttpClientConfig::new(base_url.clone()).default_header("apikey", anon_key),
        )?;

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.to_string(),
            state: Arc::new(RwLock::new(SessionState::default())),
            events: AuthEvents::new(),
        })
    }

    /// A client acting on behalf of `access_token`.
    pub fn with_access_token(self, access_token: impl Into<String>) -> Self {
        self.state.write().token = Some(access_token.into());
        self
    }

    /// Wrap this client as a [`Backend`].
    pub fn into_backend(self) -> Backend {
        let shared = Arc::new(self);
        Backend::new(shared.clone(), shared.clone(), shared)
    }

    fn bearer(&self) -> String {
        let state = self.state.read();
        state
            .session
            .as_ref()
            .map(|s| s.access_token.clone())
            .or_else(|| state.token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn authed<'a>(&self, request: RequestBuilder<'a>) -> RequestBuilder<'a> {
        request.bearer_auth(self.bearer())
    }

    async fn send(request: RequestBuilder<'_>) -> Result<Response> {
        request.send().await?.error_for_status()
    }

    /// PostgREST answers 406 when a single-object request matches zero or
    /// several rows.
    fn single_result(response: Result<Response>) -> Result<Value> {
        match response {
            Ok(response) => response.json(),
            Err(BackendError::Api {
                status: 406,
                message,
            }) => Err(BackendError::NotFound(message)),
            Err(e) => Err(e),
        }
    }

    fn table_path(table: &str) -> String {
        format!("rest/v1/{}", table)
    }
}

#[async_trait]
impl Database for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .http
            .get(Self::table_path(query.table_name()))
            .queries(query.to_params());
        Self::send(self.authed(request)).await?.json()
    }

    async fn select_single(&self, query: &Query) -> Result<Value> {
        let request = self
            .http
            .get(Self::table_path(query.table_name()))
            .queries(query.to_params())
            .header("Accept", SINGLE_OBJECT);
        Self::single_result(Self::send(self.authed(request)).await)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let request = self
            .http
            .post(Self::table_path(table))
            .query("select", "*")
            .header("Prefer", RETURN_REPRESENTATION)
            .header("Accept", SINGLE_OBJECT)
            .json(&row);
        Self::single_result(Self::send(self.authed(request)).await)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        let request = self
            .http
            .patch(Self::table_path(table))
            .query("id", format!("eq.{}", id))
            .query("select", "*")
            .header("Prefer", RETURN_REPRESENTATION)
            .header("Accept", SINGLE_OBJECT)
            .json(&patch);
        Self::single_result(Self::send(self.authed(request)).await)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let request = self
            .http
            .delete(Self::table_path(table))
            .query("id", format!("eq.{}", id));
        Self::send(self.authed(request)).await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        let request = self
            .http
            .post(format!("rest/v1/rpc/{}", function))
            .json(&args);
        let response = Self::send(self.authed(request)).await?;
        if response.bytes().is_empty() {
            return Ok(Value::Null);
        }
        response.json()
    }
}

#[async_trait]
impl Auth for RestBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        if let Some(session) = self.state.read().session.clone() {
            return Ok(Some(session));
        }
        let Some(token) = self.state.read().token.clone() else {
            return Ok(None);
        };

        match self.get_user().await? {
            Some(user) => {
                let session = Session {
                    access_token: token,
                    refresh_token: None,
                    expires_in: None,
                    user,
                };
                self.state.write().session = Some(session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn get_user(&self) -> Result<Option<User>> {
        let token = {
            let state = self.state.read();
            state
                .session
                .as_ref()
                .map(|s| s.access_token.clone())
                .or_else(|| state.token.clone())
        };
        let Some(token) = token else {
            return Ok(None);
        };

        match Self::send(self.http.get("auth/v1/user").bearer_auth(token)).await {
            Ok(response) => Ok(Some(response.json()?)),
            Err(BackendError::Api { status, message }) if status == 401 || status == 403 => {
                debug!(status, %message, "access token rejected");
                let mut state = self.state.write();
                state.token = None;
                state.session = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .http
            .post("auth/v1/token")
            .query("grant_type", "password")
            .json(&json!({ "email": email, "password": password }));
        let session: Session = Self::send(request).await?.json()?;

        {
            let mut state = self.state.write();
            state.token = Some(session.access_token.clone());
            state.session = Some(session.clone());
        }
        self.events.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = {
            let mut state = self.state.write();
            let token = state
                .session
                .take()
                .map(|s| s.access_token)
                .or_else(|| state.token.clone());
            state.token = None;
            token
        };

        let result = match token {
            Some(token) => Self::send(self.http.post("auth/v1/logout").bearer_auth(token))
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "sign-out request failed, local session cleared");
        }

        self.events.emit(AuthEvent::SignedOut, None);
        result
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl BlobStorage for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let request = self
            .http
            .post(format!("storage/v1/object/{}", object_path(bucket, name)))
            .header("x-upsert", "false")
            .body(data.to_vec(), content_type);
        Self::send(self.authed(request)).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.base_url,
            object_path(bucket, name)
        )
    }

    async fn remove(&self, bucket: &str, names: &[String]) -> Result<()> {
        let request = self
            .http
            .delete(format!("storage/v1/object/{}", urlencoding::encode(bucket)))
            .json(&json!({ "prefixes": names }));
        Self::send(self.authed(request)).await?;
        Ok(())
    }
}

/// `bucket/name` with each part encoded as a single path segment.
pub(crate) fn object_path(bucket: &str, name: &str) -> String {
    format!(
        "{}/{}",
        urlencoding::encode(bucket),
        urlencoding::encode(name)
    )
}

/// Builds REST clients scoped to a caller's access token.
#[derive(Clone)]
pub struct RestConnector {
    config: BackendConfig,
}

impl RestConnector {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl Connect for RestConnector {
    fn is_configured(&self) -> bool {
        self.config.has_backend()
    }

    fn connect(&self, access_token: Option<&str>) -> Result<Backend> {
        let mut client = RestBackend::new(&self.config)?;
        if let Some(token) = access_token {
            client = client.with_access_token(token);
        }
        Ok(client.into_backend())
    }
}
