// HTTP request and response types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Result, ServerError};

/// HTTP request wrapper. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Bytes::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    pub fn with_json<T: Serialize>(self, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ServerError::Deserialization(e.to_string()))
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Path parameter that the route guarantees.
    pub fn require_param(&self, name: &str) -> Result<&str> {
        self.param(name)
            .map(String::as_str)
            .ok_or_else(|| ServerError::BadRequest(format!("missing path parameter {}", name)))
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        parse_cookies(self.header("cookie")?).remove(name)
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Access token from the session cookie, else from a bearer header.
    pub fn access_token(&self, cookie_name: &str) -> Option<String> {
        self.cookie(cookie_name)
            .filter(|t| !t.is_empty())
            .or_else(|| self.bearer_token().map(str::to_string))
    }
}

/// Split a `Cookie` header into decoded name/value pairs.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = urlencoding::decode(value.trim())
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.trim().to_string());
            Some((name.trim().to_string(), value))
        })
        .collect()
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn created() -> Self {
        Self::new(201)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// `303 See Other` to `location`.
    pub fn redirect(location: &str) -> Self {
        Self::new(303).with_header("Location", location)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body =
            serde_json::to_vec(value).map_err(|e| ServerError::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// JSON response from an already-built value.
    pub fn json_value(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(value.to_string().into_bytes())
    }

    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_string(), value.into());
        self
    }

    /// HTTP-only session cookie for the whole site.
    pub fn with_session_cookie(self, name: &str, token: &str, max_age: u64) -> Self {
        self.with_header(
            "Set-Cookie",
            format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                name,
                urlencoding::encode(token),
                max_age
            ),
        )
    }

    pub fn clear_session_cookie(self, name: &str) -> Self {
        self.with_header(
            "Set-Cookie",
            format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name),
        )
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON.
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ServerError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_sources() {
        let req = HttpRequest::new("GET", "/admin")
            .with_header("Cookie", "theme=dark; terang-access-token=abc%2B1");
        assert_eq!(req.access_token("terang-access-token").as_deref(), Some("abc+1"));

        let req = HttpRequest::new("GET", "/admin").with_header("Authorization", "Bearer xyz");
        assert_eq!(req.access_token("terang-access-token").as_deref(), Some("xyz"));

        assert!(HttpRequest::new("GET", "/").access_token("terang-access-token").is_none());
    }

    #[test]
    fn test_session_cookie() {
        let res = HttpResponse::ok().with_session_cookie("terang-access-token", "t0k", 3600);
        assert_eq!(
            res.header("set-cookie"),
            Some("terang-access-token=t0k; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600")
        );
        let res = HttpResponse::ok().clear_session_cookie("terang-access-token");
        assert!(res.header("Set-Cookie").unwrap().contains("Max-Age=0"));
    }
}
