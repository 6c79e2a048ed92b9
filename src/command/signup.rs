// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use log::error;
use secrecy::SecretString;

use crate::{
    error::{self, Result},
    guard::Navigator,
    model::Role,
    password::{self, RequestBuilder},
};

use super::Context;

/// Create an account and sign in as it.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Your full name.
    #[arg(long, short)]
    name: String,

    /// The email address to register.
    #[arg(long, short, env = "LAWCONNECT_EMAIL")]
    email: String,

    /// What you will use LawConnect as.
    #[arg(long, short, value_enum)]
    role: Role,

    /// The password to choose. You are asked for it, twice, when it is not
    /// given.
    #[arg(long, env = "LAWCONNECT_PASSWORD", hide_env_values = true, value_parser = super::secret)]
    password: Option<SecretString>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let mut navigator = Navigator::new(Arc::clone(&context.routes), &context.store);

        let password = match self.password {
            Some(password) => password,
            None => {
                password::require(
                    context.prompt.as_ref(),
                    RequestBuilder::new(&self.email)
                        .with_confirmation()
                        .into_request(),
                )
                .await?
            }
        };

        let Some(identity) = context
            .gateway
            .signup(&self.name, &self.email, &password, self.role)
            .await?
        else {
            error!("Another session change overtook this registration");
            return Err(error::Error::Command);
        };

        println!(
            "Registered {} <{}> ({})",
            identity.name, identity.email, identity.role
        );
        println!(
            "{}",
            navigator
                .poll()
                .unwrap_or_else(|| context.routes.home(identity.role))
        );
        Ok(())
    }
}
