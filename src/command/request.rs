// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use reqwest::Method;

use crate::error::Result;

use super::Context;

/// Send a request to the backend API on behalf of the signed-in user and
/// print the JSON response.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The HTTP method to use.
    #[arg(value_parser = parse_method)]
    method: Method,

    /// The endpoint, relative to the API base URL (e.g. `cases/floating`).
    #[clap()]
    endpoint: String,

    /// A JSON document to send as the request body.
    #[arg(long, short, value_parser = parse_json)]
    data: Option<serde_json::Value>,
}

fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

fn parse_json(value: &str) -> serde_json::Result<serde_json::Value> {
    serde_json::from_str(value)
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let response = context
            .backend
            .request(self.method, &self.endpoint, self.data.as_ref())
            .await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}
