// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, guard::Navigator};

use super::Context;

/// Sign out and forget the stored session.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let mut navigator = Navigator::new(Arc::clone(&context.routes), &context.store);
        context.store.clear().await?;

        println!(
            "{}",
            navigator
                .poll()
                .unwrap_or_else(|| context.routes.landing().to_owned())
        );
        Ok(())
    }
}
