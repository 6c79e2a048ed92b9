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
    password::{self, RequestBuilder},
};

use super::Context;

/// Sign in and print the dashboard to continue to.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address of the account.
    #[arg(long, short, env = "LAWCONNECT_EMAIL")]
    email: String,

    /// The account password. You are asked for it when it is not given.
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
                    RequestBuilder::new(&self.email).into_request(),
                )
                .await?
            }
        };

        let Some(identity) = context.gateway.login(&self.email, &password).await? else {
            error!("Another session change overtook this sign-in");
            return Err(error::Error::Command);
        };

        println!(
            "Signed in as {} <{}> ({})",
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
