// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{convert::Infallible, io, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Gateway(#[from] Gateway),
    #[error("session error: {0}")]
    Session(#[from] Session),
    #[error("invalid input: {0}")]
    Input(#[from] Input),
    #[error("API error: {0}")]
    Api(#[from] Api),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

/// Failures of the login and registration exchanges.
#[derive(Error, Debug)]
pub(crate) enum Gateway {
    /// The server turned the request down. The message is meant for the
    /// person filling in the form.
    #[error("{0}")]
    Authentication(String),
    #[error("could not reach the server, please try again: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response from the server: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub(crate) enum Session {
    #[error("refusing to store an empty token")]
    EmptyToken,
    #[error("refusing to store an identity without a {0}")]
    IncompleteIdentity(&'static str),
}

/// Persisted session data that cannot be trusted. Restoring recovers from
/// these by signing out, so they only ever reach the log.
#[derive(Error, Debug)]
pub(crate) enum Corruption {
    #[error("a token is stored without an identity")]
    MissingIdentity,
    #[error("an identity is stored without a token")]
    MissingToken,
    #[error("the stored token is empty")]
    EmptyToken,
    #[error("the stored identity is malformed: {0}")]
    MalformedIdentity(String),
    #[error("the session storage could not be read: {0}")]
    Unreadable(Box<Error>),
}

#[derive(Error, Debug)]
pub(crate) enum Input {
    #[error("the {0} must not be empty")]
    EmptyField(&'static str),
    #[error("no screen is declared for {0}")]
    UnknownScreen(String),
    #[error("the passwords do not match")]
    PasswordMismatch,
    #[error("{0} is outside the API")]
    ForeignEndpoint(String),
}

#[derive(Error, Debug)]
pub(crate) enum Api {
    #[error("API request failed: {0}")]
    Status(reqwest::StatusCode),
    #[error("request could not be sent: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no project directories are available for this user")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}
