// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Identity, Role};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Login,
    Register,
}

impl Endpoint {
    /// Location relative to the API base URL.
    pub(crate) const fn path(self) -> &'static str {
        match self {
            Self::Login => "auth/login",
            Self::Register => "auth/register",
        }
    }

    /// What to tell the user when the server rejects the request without
    /// saying why.
    pub(crate) const fn failure_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Register => "Signup failed",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'req> {
    pub(crate) email: &'req str,
    pub(crate) password: &'req str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'req> {
    pub(crate) name: &'req str,
    pub(crate) email: &'req str,
    pub(crate) password: &'req str,
    pub(crate) role: Role,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) token: String,
    pub(crate) user: Identity,
}

/// Shapes the authentication service uses to explain a rejection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Detailed {
        message: Option<String>,
        error: Option<String>,
    },
    Text(String),
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        match self {
            Self::Detailed { message, error } => message.or(error),
            Self::Text(text) => Some(text),
        }
        .filter(|message| !message.trim().is_empty())
    }
}
