// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretVec};

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    attributes: HashMap<String, String>,
}

impl SecretService {
    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain([("lawconnect.key", key)])
            .collect()
    }

    async fn item(&self, key: &str) -> Result<Option<oo7::Item>> {
        Ok(self
            .keyring
            .search_items(self.attributes(key))
            .await
            .map_err(error::Storage::from)?
            .into_iter()
            .next())
    }

    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            attributes: HashMap::from([
                ("lawconnect.kind".to_owned(), "session".to_owned()),
                ("lawconnect.url".to_owned(), url.as_str().to_owned()),
            ]),
        })
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for SecretService {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value = match self.item(key).await? {
            Some(item) => {
                let secret = item.secret().await.map_err(error::Storage::from)?;
                Some(String::from_utf8_lossy(&secret).into_owned())
            }
            None => None,
        };
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let label = format!("{} {}", *metadata::CLIENT_DISPLAY_NAME, key);
        self.keyring
            .create_item(
                &label,
                self.attributes(key),
                SecretVec::new(value.as_bytes().to_vec()).expose_secret(),
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(item) = self.item(key).await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
