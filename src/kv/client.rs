//! Consul HTTP KV and catalog client.
//!
//! # Responsibilities
//! - Build `/v1/kv/...` and `/v1/catalog/services` URLs from a base address
//! - Normalise the base address to carry a scheme
//! - Map transport failures and non-2xx statuses to `KvError`
//!
//! # Design Decisions
//! - The base address is passed per call: fleet replay may target a
//!   different Consul than the one in `EngineConfig`
//! - `404` on a raw GET means "key absent", never an error
//! - Catalog keys are returned sorted so replay output is stable

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::kv::address::with_scheme;

/// Errors returned by KV store operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// The Consul address cannot form a valid URL.
    #[error("Invalid Consul address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// The Consul address cannot carry a path.
    #[error("Consul address '{address}' cannot be used as a base URL")]
    NotABase { address: String },

    /// The HTTP request could not be completed.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Consul answered with an unexpected status.
    #[error("Consul returned status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response body could not be decoded.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Capability over a Consul-style KV store and service catalog.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`.
    async fn put(&self, address: &str, key: &str, value: &str) -> Result<(), KvError>;

    /// Read the raw value of `key`; `None` when the key does not exist.
    async fn get_raw(&self, address: &str, key: &str) -> Result<Option<String>, KvError>;

    /// List the names of every service in the catalog.
    async fn services(&self, address: &str) -> Result<Vec<String>, KvError>;

    /// Delete every key under `prefix`.
    async fn delete_tree(&self, address: &str, prefix: &str) -> Result<(), KvError>;
}

/// `KvStore` backed by the Consul HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulKv {
    client: Client,
}

impl ConsulKv {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Append `path` to the base address, one encoded segment per `/`.
    fn url(address: &str, path: &str) -> Result<Url, KvError> {
        let mut url = Url::parse(&with_scheme(address)).map_err(|source| {
            KvError::InvalidAddress {
                address: address.to_string(),
                source,
            }
        })?;
        url.path_segments_mut()
            .map_err(|()| KvError::NotABase {
                address: address.to_string(),
            })?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    fn kv_url(address: &str, key: &str) -> Result<Url, KvError> {
        Self::url(address, &format!("v1/kv/{}", key))
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<reqwest::Response, KvError> {
        request.send().await.map_err(|source| KvError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl KvStore for ConsulKv {
    async fn put(&self, address: &str, key: &str, value: &str) -> Result<(), KvError> {
        let url = Self::kv_url(address, key)?;
        let response = self
            .send(self.client.put(url.clone()).body(value.to_string()), &url)
            .await?;

        if !response.status().is_success() {
            return Err(KvError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        tracing::debug!(key = %key, "KV value stored");
        Ok(())
    }

    async fn get_raw(&self, address: &str, key: &str) -> Result<Option<String>, KvError> {
        let mut url = Self::kv_url(address, key)?;
        url.set_query(Some("raw"));
        let response = self.send(self.client.get(url.clone()), &url).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await.map_err(|source| KvError::Decode {
                    url: url.to_string(),
                    source,
                })?;
                Ok(Some(body))
            }
            status => Err(KvError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn services(&self, address: &str) -> Result<Vec<String>, KvError> {
        let url = Self::url(address, "v1/catalog/services")?;
        let response = self.send(self.client.get(url.clone()), &url).await?;

        if !response.status().is_success() {
            return Err(KvError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let catalog: BTreeMap<String, serde_json::Value> =
            response.json().await.map_err(|source| KvError::Decode {
                url: url.to_string(),
                source,
            })?;

        Ok(catalog.into_keys().collect())
    }

    async fn delete_tree(&self, address: &str, prefix: &str) -> Result<(), KvError> {
        let mut url = Self::kv_url(address, prefix)?;
        url.set_query(Some("recurse"));
        let response = self.send(self.client.delete(url.clone()), &url).await?;

        if !response.status().is_success() {
            return Err(KvError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        tracing::debug!(prefix = %prefix, "KV tree deleted");
        Ok(())
    }
}
