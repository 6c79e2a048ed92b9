// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::{
    error::{self, Result},
    gateway::{Reply, Transport},
    metadata,
    model::auth::Endpoint,
};

pub(crate) fn client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    Ok(builder(timeout).build().map_err(error::Api::from)?)
}

fn builder(timeout: Option<Duration>) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder().user_agent(metadata::USER_AGENT.as_str());
    match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    }
}

/// Makes `endpoint`-style relative paths resolve underneath `url` rather
/// than next to its last segment.
pub(crate) fn base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub(crate) struct HttpTransport {
    http: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub(crate) fn new(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            base: base(url),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
    ) -> Result<Reply, error::Gateway> {
        let url = self
            .base
            .join(endpoint.path())
            .map_err(|e| error::Gateway::Protocol(e.to_string()))?;

        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(Reply { status, body })
    }
}
