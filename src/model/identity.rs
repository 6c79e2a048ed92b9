// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use clap::ValueEnum;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq as _;
use tabled::Tabled;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Lawyer,
    Client,
    Student,
    Admin,
}

impl Role {
    pub(crate) const ALL: [Self; 4] = [Self::Lawyer, Self::Client, Self::Student, Self::Admin];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Lawyer => "lawyer",
            Self::Client => "client",
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The profile of an authenticated user, as issued by the authentication
/// service. The role in particular is never changed locally.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Identity {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Email")]
    pub(crate) email: String,
    #[tabled(rename = "Role")]
    pub(crate) role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Profile Picture", display_with = "Self::format_profile_picture")]
    pub(crate) profile_picture: Option<String>,
}

impl Identity {
    /// Checks that every required field carries a value, returning the name
    /// of the first one that does not.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        [("id", &self.id), ("name", &self.name), ("email", &self.email)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map_or(Ok(()), |(field, _)| Err(field))
    }

    fn format_profile_picture(picture: &Option<String>) -> String {
        picture.clone().unwrap_or_default()
    }
}

/// Opaque bearer credential. Its contents never show up in `Debug` output.
#[derive(Clone, Debug)]
pub(crate) struct Token(SecretString);

impl Token {
    pub(crate) fn new(value: String) -> Self {
        Self(SecretString::new(value))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.expose().as_bytes().ct_eq(other.expose().as_bytes()).into()
    }
}

impl Eq for Token {}
