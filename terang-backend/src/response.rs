//! HTTP response wrapper.

use crate::{BackendError, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// Buffered HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| BackendError::Json(e.to_string()))
    }

    /// Best-effort error message from a failed response body.
    ///
    /// PostgREST uses `message`, GoTrue uses `error_description` or `msg`,
    /// Storage uses `error` or `message`.
    pub fn error_message(&self) -> String {
        let parsed: Option<serde_json::Value> = serde_json::from_slice(&self.body).ok();
        parsed
            .as_ref()
            .and_then(|v| {
                ["message", "error_description", "msg", "error"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            })
            .map(str::to_string)
            .or_else(|| Some(self.text()).filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            })
    }

    /// Turn 4xx/5xx responses into [`BackendError::Api`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(BackendError::api(self.status.as_u16(), self.error_message()))
        } else {
            Ok(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> Response {
        Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_error_message_fields() {
        assert_eq!(
            response(400, r#"{"code":"22P02","message":"invalid input syntax"}"#).error_message(),
            "invalid input syntax"
        );
        assert_eq!(
            response(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .error_message(),
            "Invalid login credentials"
        );
        assert_eq!(response(502, "").error_message(), "Bad Gateway");
    }

    #[test]
    fn test_error_for_status() {
        assert!(response(200, "[]").error_for_status().is_ok());
        let err = response(401, r#"{"msg":"JWT expired"}"#)
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.to_string(), "JWT expired");
    }
}
