// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tabled::{settings::Style, Table};

use crate::error::{self, Result};

use super::Context;

/// Show who is signed in.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let session = context.store.snapshot();
        let Some(identity) = session.identity() else {
            error!("Nobody is signed in");
            return Err(error::Error::Command);
        };

        println!("{}", Table::new([identity]).with(Style::rounded()));
        Ok(())
    }
}
