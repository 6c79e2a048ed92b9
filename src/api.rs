// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::debug;
use reqwest::{header, Method};
use url::Url;

use crate::{
    error::{self, Result},
    http,
    session::Store,
};

/// Client for the rest of the backend API. Requests carry the session's
/// bearer token whenever someone is signed in.
pub(crate) struct Backend {
    http: reqwest::Client,
    base: Url,
    store: Arc<Store>,
}

impl Backend {
    pub(crate) fn new(http: reqwest::Client, url: Url, store: Arc<Store>) -> Self {
        Self {
            http,
            base: http::base(url),
            store,
        }
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let url = self.resolve(endpoint)?;
        debug!("Sending {} request to {}", method, url);

        let mut req = self
            .http
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = self.store.snapshot().token() {
            req = req.bearer_auth(token.expose());
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(error::Api::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(error::Api::Status(status).into());
        }

        let bytes = response.bytes().await.map_err(error::Api::from)?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Joins `endpoint` onto the base URL. Anything that resolves away from
    /// the base, such as an absolute URL or `..` segments, is refused so the
    /// token never leaves the backend.
    fn resolve(&self, endpoint: &str) -> Result<Url> {
        let url = self.base.join(endpoint.trim_start_matches('/'))?;
        if url.scheme() != self.base.scheme()
            || url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
            || !url.path().starts_with(self.base.path())
        {
            return Err(error::Input::ForeignEndpoint(endpoint.to_owned()).into());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::{net::TcpListener, time};

    use super::*;
    use crate::{
        http::tests::{local_client, serve_once},
        model::{Identity, Role, Token},
        storage::Memory,
    };

    async fn store() -> Arc<Store> {
        let store = Arc::new(Store::new(Memory::new()));
        store.restore().await;
        store
    }

    #[tokio::test]
    async fn attaches_bearer_token() -> Result<()> {
        let store = store().await;
        store
            .commit(
                Token::new("abc".to_owned()),
                Identity {
                    id: "1".to_owned(),
                    name: "A".to_owned(),
                    email: "a@b.com".to_owned(),
                    role: Role::Lawyer,
                    profile_picture: None,
                },
            )
            .await?;
        let (url, server) = serve_once("200 OK", r#"[{"id":"c1"}]"#).await?;
        let backend = Backend::new(local_client()?, url, store);

        let cases = backend.request(Method::GET, "/cases/floating", None).await?;
        let request = server.await??;

        assert!(request.starts_with("GET /api/cases/floating HTTP/1.1\r\n"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer abc\r\n"));
        assert_eq!(cases, json!([{"id": "c1"}]));
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_credentials() -> Result<()> {
        let (url, server) = serve_once("204 No Content", "").await?;
        let backend = Backend::new(local_client()?, url, store().await);

        let body = json!({"status": "accepted"});
        let reply = backend
            .request(Method::PUT, "applications/9/status", Some(&body))
            .await?;
        let request = server.await??;

        assert!(request.starts_with("PUT /api/applications/9/status HTTP/1.1\r\n"));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
        assert!(request.ends_with(r#"{"status":"accepted"}"#));
        assert_eq!(reply, serde_json::Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn endpoints_outside_the_base_are_refused() -> Result<()> {
        let store = store().await;
        store
            .commit(
                Token::new("abc".to_owned()),
                Identity {
                    id: "1".to_owned(),
                    name: "A".to_owned(),
                    email: "a@b.com".to_owned(),
                    role: Role::Client,
                    profile_picture: None,
                },
            )
            .await?;
        let elsewhere = TcpListener::bind("127.0.0.1:0").await?;
        let other = elsewhere.local_addr()?;
        let backend = Backend::new(
            local_client()?,
            Url::parse("http://127.0.0.1:9/api/")?,
            store,
        );

        for endpoint in [
            format!("http://{other}/api"),
            "../admin".to_owned(),
            "https://127.0.0.1:9/api/cases".to_owned(),
        ] {
            let result = backend.request(Method::GET, &endpoint, None).await;
            assert!(
                matches!(
                    result,
                    Err(error::Error::Input(error::Input::ForeignEndpoint(_)))
                ),
                "sent {endpoint}"
            );
        }

        let connection = time::timeout(Duration::from_millis(100), elsewhere.accept()).await;
        assert!(connection.is_err());
        Ok(())
    }

    #[test]
    fn endpoints_stay_under_the_base() -> Result<()> {
        let backend = Backend::new(
            local_client()?,
            Url::parse("http://localhost:8080/api")?,
            Arc::new(Store::new(Memory::new())),
        );

        assert_eq!(
            backend.resolve("/cases/floating")?.as_str(),
            "http://localhost:8080/api/cases/floating"
        );
        assert_eq!(
            backend.resolve("users/3?active=true")?.as_str(),
            "http://localhost:8080/api/users/3?active=true"
        );
        Ok(())
    }

    #[tokio::test]
    async fn failure_status_is_reported() -> Result<()> {
        let (url, server) = serve_once("403 Forbidden", "{}").await?;
        let backend = Backend::new(local_client()?, url, store().await);

        let result = backend.request(Method::DELETE, "users/3", None).await;
        let _ = server.await??;

        assert!(matches!(
            result,
            Err(error::Error::Api(error::Api::Status(status))) if status == reqwest::StatusCode::FORBIDDEN
        ));
        Ok(())
    }
}
