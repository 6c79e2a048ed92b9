// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{ffi::OsString, path::Path};

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use subtle::ConstantTimeEq as _;
use tokio::task;

use crate::{
    error::{self, Result},
    metadata,
};

#[derive(Debug, Default, Clone)]
pub(crate) struct Request {
    account: String,
    confirm: bool,
}

pub(crate) struct RequestBuilder {
    account: String,
    confirm: bool,
}

impl RequestBuilder {
    pub(crate) fn new(account: &str) -> Self {
        Self {
            account: account.to_owned(),
            confirm: false,
        }
    }

    /// Ask for the password twice, as when choosing a new one.
    pub(crate) const fn with_confirmation(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub(crate) fn into_request(self) -> Request {
        Request {
            account: self.account,
            confirm: self.confirm,
        }
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

/// Runs the prompt chain and insists on an answer.
pub(crate) async fn require(prompt: &dyn Prompt, req: Request) -> Result<SecretString> {
    prompt
        .prompt(req)
        .await?
        .ok_or_else(|| error::Password::NoPrompt.into())
}

pub(crate) struct PinentryPrompt {
    executable: Option<OsString>,
}

impl PinentryPrompt {
    pub(crate) const fn new() -> Self {
        Self { executable: None }
    }

    pub(crate) fn new_with_executable<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: Some(executable.as_ref().as_os_str().into()),
        }
    }
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        fn interact<'input>(
            mut input: pinentry::PassphraseInput<'input>,
            title: &'input str,
            description: &'input str,
            confirm: bool,
        ) -> Result<SecretString> {
            _ = input.required("A password is required to continue.");
            _ = input.with_title(title);
            _ = input.with_description(description);
            _ = input.with_prompt("Password");
            if confirm {
                _ = input.with_confirmation("Confirm", "The passwords do not match.");
            }

            Ok(input.interact()?)
        }

        let title = format!("Password - {}", *metadata::CLIENT_DISPLAY_NAME);
        let description = format!("Enter the password for {}.", req.account);

        let input = self
            .executable
            .as_ref()
            .and_then(pinentry::PassphraseInput::with_binary)
            .or_else(pinentry::PassphraseInput::with_default_binary)
            .map(|input| {
                task::spawn_blocking(move || interact(input, &title, &description, req.confirm))
            });

        Ok(match input {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        let password = task::spawn_blocking(move || -> Result<SecretString> {
            let password =
                SecretString::new(rpassword::prompt_password(format!("Password for {}: ", req.account))?);
            if req.confirm {
                let again = SecretString::new(rpassword::prompt_password("Confirm password: ")?);
                let same: bool = password
                    .expose_secret()
                    .as_bytes()
                    .ct_eq(again.expose_secret().as_bytes())
                    .into();
                if !same {
                    return Err(error::Input::PasswordMismatch.into());
                }
            }
            Ok(password)
        })
        .await??;

        Ok(Some(password))
    }
}
