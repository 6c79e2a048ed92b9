// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{convert::Infallible, sync::Arc};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    api::Backend,
    error::Result,
    gateway::{Gateway, Transport},
    guard::Routes,
    password::Prompt,
    session::Store,
};

pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod request;
pub(crate) mod signup;
pub(crate) mod visit;
pub(crate) mod whoami;

/// Everything a command may touch, already restored and wired together.
pub(crate) struct Context {
    pub(crate) store: Arc<Store>,
    pub(crate) routes: Arc<Routes>,
    pub(crate) gateway: Gateway<Box<dyn Transport>>,
    pub(crate) backend: Backend,
    pub(crate) prompt: Box<dyn Prompt>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, context: &Context) -> Result<()>;
}

pub(crate) fn secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::new(value.to_owned()))
}
