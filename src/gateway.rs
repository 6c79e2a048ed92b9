// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use secrecy::{ExposeSecret as _, SecretString};

use crate::{
    error::{self, Result},
    model::{
        auth::{AuthResponse, Endpoint, ErrorBody, LoginRequest, RegisterRequest},
        Identity, Role, Token,
    },
    session::{Commit, Store},
};

#[derive(Clone, Debug)]
pub(crate) struct Reply {
    pub(crate) status: StatusCode,
    pub(crate) body: Vec<u8>,
}

/// Carries one JSON request to the authentication service and hands back
/// whatever came back, without judging it.
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn post(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
    ) -> Result<Reply, error::Gateway>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn post(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
    ) -> Result<Reply, error::Gateway> {
        (**self).post(endpoint, body).await
    }
}

pub(crate) struct Gateway<T> {
    store: Arc<Store>,
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub(crate) fn new(store: Arc<Store>, transport: T) -> Self {
        Self { store, transport }
    }

    /// Signs in. Returns the new identity, or `None` when the session was
    /// cleared or another sign-in started while this one was in flight.
    pub(crate) async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<Identity>> {
        require("email", email)?;
        require("password", password.expose_secret())?;

        let body = serde_json::to_value(LoginRequest {
            email,
            password: password.expose_secret(),
        })?;
        self.exchange(Endpoint::Login, &body).await
    }

    /// Registers a new account and signs in as it, with the same outcome
    /// rules as [`Gateway::login`].
    pub(crate) async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<Option<Identity>> {
        require("name", name)?;
        require("email", email)?;
        require("password", password.expose_secret())?;

        let body = serde_json::to_value(RegisterRequest {
            name,
            email,
            password: password.expose_secret(),
            role,
        })?;
        self.exchange(Endpoint::Register, &body).await
    }

    async fn exchange(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
    ) -> Result<Option<Identity>> {
        let ticket = self.store.begin().await;

        debug!("Sending request to {}", endpoint);
        let reply = self.transport.post(endpoint, body).await?;
        debug!("Server answered {} with status {}", endpoint, reply.status);

        let (token, identity) = interpret(endpoint, &reply)?;
        match self
            .store
            .commit_for(ticket, token, identity.clone())
            .await?
        {
            Commit::Applied => Ok(Some(identity)),
            Commit::Superseded => {
                info!(
                    "Ignoring the session issued for {} because it is no longer current",
                    identity.email
                );
                Ok(None)
            }
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), error::Input> {
    if value.trim().is_empty() {
        Err(error::Input::EmptyField(field))
    } else {
        Ok(())
    }
}

fn interpret(endpoint: Endpoint, reply: &Reply) -> Result<(Token, Identity), error::Gateway> {
    if !reply.status.is_success() {
        let message = rejection_message(&reply.body)
            .unwrap_or_else(|| endpoint.failure_message().to_owned());
        return Err(error::Gateway::Authentication(message));
    }

    let response: AuthResponse = serde_json::from_slice(&reply.body)
        .map_err(|e| error::Gateway::Protocol(e.to_string()))?;
    if response.token.is_empty() {
        return Err(error::Gateway::Protocol(
            "the response carries an empty token".to_owned(),
        ));
    }
    response
        .user
        .validate()
        .map_err(|field| error::Gateway::Protocol(format!("the user has no {field}")))?;

    Ok((Token::new(response.token), response.user))
}

fn rejection_message(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(body) {
        return serde_json::from_value::<ErrorBody>(parsed)
            .ok()
            .and_then(ErrorBody::into_message);
    }

    // Plain-text rejections, e.g. `Invalid credentials`.
    let text = std::str::from_utf8(body).ok()?.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};
    use tokio::{
        net::TcpListener,
        sync::{oneshot, Notify},
    };
    use url::Url;

    use super::*;
    use crate::{
        guard::{Decision, Guard, Navigator, Routes},
        http::{tests::local_client, HttpTransport},
        session::Session,
        storage::Memory,
    };

    /// Answers every request with the same canned reply and remembers what
    /// it was sent.
    struct Canned {
        reply: Reply,
        seen: Mutex<Vec<(Endpoint, Value)>>,
    }

    impl Canned {
        fn new(status: u16, body: &Value) -> Self {
            Self::raw(status, body.to_string().into_bytes())
        }

        fn raw(status: u16, body: Vec<u8>) -> Self {
            Self {
                reply: Reply {
                    status: StatusCode::from_u16(status).unwrap_or(StatusCode::IM_A_TEAPOT),
                    body,
                },
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<(Endpoint, Value)> {
            self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn post(
            &self,
            endpoint: Endpoint,
            body: &Value,
        ) -> Result<Reply, error::Gateway> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((endpoint, body.clone()));
            }
            Ok(self.reply.clone())
        }
    }

    /// Holds the reply back until the test lets it through.
    struct Gated {
        inner: Canned,
        started: Notify,
        release: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl Transport for Gated {
        async fn post(
            &self,
            endpoint: Endpoint,
            body: &Value,
        ) -> Result<Reply, error::Gateway> {
            self.started.notify_one();
            if let Some(release) = self.release.lock().await.take() {
                let _ = release.await;
            }
            self.inner.post(endpoint, body).await
        }
    }

    fn user(role: &str) -> Value {
        json!({"id": "1", "name": "A", "email": "a@b.com", "role": role})
    }

    async fn gateway<T: Transport>(transport: T) -> (Arc<Store>, Gateway<T>) {
        let store = Arc::new(Store::new(Memory::new()));
        store.restore().await;
        (Arc::clone(&store), Gateway::new(store, transport))
    }

    fn password(value: &str) -> SecretString {
        SecretString::new(value.to_owned())
    }

    #[tokio::test]
    async fn login_establishes_session() -> Result<()> {
        let (store, gateway) =
            gateway(Canned::new(200, &json!({"token": "abc", "user": user("client")}))).await;
        let routes = Arc::new(Routes::default());

        let identity = gateway.login("a@b.com", &password("secret")).await?;

        let expected = Identity {
            id: "1".to_owned(),
            name: "A".to_owned(),
            email: "a@b.com".to_owned(),
            role: Role::Client,
            profile_picture: None,
        };
        assert_eq!(identity.as_ref(), Some(&expected));
        assert_eq!(
            store.snapshot(),
            Session::Authenticated {
                token: Token::new("abc".to_owned()),
                identity: expected,
            }
        );
        assert_eq!(
            gateway.transport.seen(),
            vec![(
                Endpoint::Login,
                json!({"email": "a@b.com", "password": "secret"})
            )]
        );

        let screen = routes.screen("/dashboard/client")?.clone();
        let mut guard = Guard::mount(Arc::clone(&routes), screen, &store);
        assert_eq!(guard.resolve().await, Decision::Granted);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_reports_server_message() {
        let (store, gateway) =
            gateway(Canned::new(401, &json!({"message": "invalid credentials"}))).await;

        let result = gateway.login("a@b.com", &password("wrong")).await;

        assert!(matches!(
            result,
            Err(error::Error::Gateway(error::Gateway::Authentication(ref message)))
                if message == "invalid credentials"
        ));
        assert_eq!(store.snapshot(), Session::Unauthenticated);
    }

    #[tokio::test]
    async fn rejected_login_with_text_body() {
        let (_, gateway) = gateway(Canned::raw(401, b"Invalid credentials".to_vec())).await;

        let result = gateway.login("a@b.com", &password("wrong")).await;

        assert!(matches!(
            result,
            Err(error::Error::Gateway(error::Gateway::Authentication(ref message)))
                if message == "Invalid credentials"
        ));
    }

    #[tokio::test]
    async fn rejection_without_message_is_generic() {
        let (_, gateway) = gateway(Canned::raw(500, Vec::new())).await;

        let login = gateway.login("a@b.com", &password("pw")).await;
        assert!(matches!(
            login,
            Err(error::Error::Gateway(error::Gateway::Authentication(ref message)))
                if message == "Login failed"
        ));

        let signup = gateway
            .signup("S", "s@x.com", &password("pw"), Role::Student)
            .await;
        assert!(matches!(
            signup,
            Err(error::Error::Gateway(error::Gateway::Authentication(ref message)))
                if message == "Signup failed"
        ));
    }

    #[tokio::test]
    async fn incomplete_success_is_protocol_error() {
        for body in [
            json!({"token": "abc"}),
            json!({"user": user("client")}),
            json!({"token": "", "user": user("client")}),
            json!({"token": "abc", "user": {"id": "1", "name": "A", "role": "client"}}),
            json!({"token": "abc", "user": user("judge")}),
        ] {
            let (store, gateway) = gateway(Canned::new(200, &body)).await;

            let result = gateway.login("a@b.com", &password("secret")).await;

            assert!(
                matches!(
                    result,
                    Err(error::Error::Gateway(error::Gateway::Protocol(_)))
                ),
                "accepted {body}"
            );
            assert_eq!(store.snapshot(), Session::Unauthenticated);
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = Url::parse(&format!("http://{}/api/", listener.local_addr()?))?;
        drop(listener);
        let (store, gateway) = gateway(HttpTransport::new(local_client()?, url)).await;

        let result = gateway.login("a@b.com", &password("pw")).await;

        assert!(matches!(
            result,
            Err(error::Error::Gateway(error::Gateway::Network(_)))
        ));
        assert_eq!(store.snapshot(), Session::Unauthenticated);
        Ok(())
    }

    #[tokio::test]
    async fn json_rejection_without_text_message_is_generic() {
        for body in [
            json!({"message": ["bad email"], "status": 400}),
            json!({"error": {"code": 7}}),
            json!(400),
        ] {
            let (_, gateway) = gateway(Canned::new(400, &body)).await;

            let result = gateway
                .signup("S", "s@x.com", &password("pw"), Role::Client)
                .await;

            assert!(
                matches!(
                    result,
                    Err(error::Error::Gateway(error::Gateway::Authentication(ref message)))
                        if message == "Signup failed"
                ),
                "reported {body}"
            );
        }
    }

    #[tokio::test]
    async fn blank_fields_are_not_sent() {
        let (_, gateway) = gateway(Canned::new(200, &json!({}))).await;

        assert!(matches!(
            gateway.signup("", "s@x.com", &password("pw"), Role::Lawyer).await,
            Err(error::Error::Input(error::Input::EmptyField("name")))
        ));
        assert!(matches!(
            gateway.login("a@b.com", &password("")).await,
            Err(error::Error::Input(error::Input::EmptyField("password")))
        ));
        assert!(gateway.transport.seen().is_empty());
    }

    #[tokio::test]
    async fn signup_gates_by_issued_role() -> Result<()> {
        let (store, gateway) = gateway(Canned::new(
            201,
            &json!({"token": "t", "user": {"id": "7", "name": "S", "email": "s@x.com", "role": "lawyer"}}),
        ))
        .await;
        let routes = Arc::new(Routes::default());
        let mut navigator = Navigator::new(Arc::clone(&routes), &store);

        let identity = gateway
            .signup("S", "s@x.com", &password("pw"), Role::Lawyer)
            .await?;
        assert_eq!(identity.map(|identity| identity.role), Some(Role::Lawyer));
        assert_eq!(
            gateway.transport.seen(),
            vec![(
                Endpoint::Register,
                json!({"name": "S", "email": "s@x.com", "password": "pw", "role": "lawyer"})
            )]
        );
        assert_eq!(navigator.next().await.as_deref(), Some("/dashboard/lawyer"));

        let lawyer = routes.screen("/dashboard/lawyer")?.clone();
        let mut guard = Guard::mount(Arc::clone(&routes), lawyer, &store);
        assert_eq!(guard.resolve().await, Decision::Granted);

        let admin = routes.screen("/dashboard/admin")?.clone();
        let mut guard = Guard::mount(Arc::clone(&routes), admin, &store);
        assert_eq!(
            guard.resolve().await,
            Decision::DeniedWrongRole {
                role: Role::Lawyer,
                redirect: "/dashboard/lawyer".to_owned(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn logout_during_login_wins() -> Result<()> {
        let (release_tx, release_rx) = oneshot::channel();
        let (store, gateway) = gateway(Gated {
            inner: Canned::new(200, &json!({"token": "abc", "user": user("client")})),
            started: Notify::new(),
            release: tokio::sync::Mutex::new(Some(release_rx)),
        })
        .await;
        let gateway = Arc::new(gateway);

        let in_flight = tokio::spawn({
            let gateway = Arc::clone(&gateway);
            async move { gateway.login("a@b.com", &password("secret")).await }
        });

        gateway.transport.started.notified().await;
        store.clear().await?;
        let _ = release_tx.send(());

        assert_eq!(in_flight.await??, None);
        assert_eq!(store.snapshot(), Session::Unauthenticated);
        Ok(())
    }
}
