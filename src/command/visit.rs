// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    error::{self, Result},
    guard::{Decision, Guard},
};

use super::Context;

/// Check whether a screen is open to the current session. Prints `granted`,
/// or the path to go to instead when access is denied.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The path of the screen, as declared in the route table.
    #[clap()]
    path: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let screen = context.routes.screen(&self.path)?.clone();
        let mut guard = Guard::mount(Arc::clone(&context.routes), screen, &context.store);

        let decision = guard.resolve().await;
        if decision == Decision::Granted {
            println!("{decision}");
            return Ok(());
        }

        if let Some(redirect) = decision.redirect() {
            println!("{redirect}");
        }
        error!("Access to {} was {}", self.path, decision);
        Err(error::Error::Command)
    }
}
