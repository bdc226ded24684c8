//! # Remote Store
//!
//! [`BackingStore`] over the DAL's HTTP surface. Every request carries the
//! shared access token in `Authorization` and every answer is an
//! [`Envelope`]. A `404` on a single config key means the key does not exist.
use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header::AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::{
    error::StoreError,
    models::{ConfigValue, CounterSnapshot, Envelope, IncrementRequest},
    store::BackingStore,
};

pub struct RemoteStore {
    client: Client,
    endpoint: Url,
    token: String,
}

impl RemoteStore {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e| StoreError::Decode(e.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            token: token.to_string(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Decode(format!("{} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, StoreError> {
        let response = request.header(AUTHORIZATION, &self.token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, message });
        }

        Ok(response.json().await?)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        self.send(request)
            .await?
            .data
            .ok_or_else(|| StoreError::Decode("envelope without data".to_string()))
    }
}

#[async_trait]
impl BackingStore for RemoteStore {
    async fn read_counter(&self) -> Result<CounterSnapshot, StoreError> {
        let url = self.url(&["clicks"])?;

        self.fetch(self.client.get(url)).await
    }

    async fn increment_counter(&self, amount: u64) -> Result<CounterSnapshot, StoreError> {
        let url = self.url(&["clicks"])?;

        self.fetch(self.client.post(url).json(&IncrementRequest { amount }))
            .await
    }

    async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = self.url(&["configs", key])?;

        match self.fetch(self.client.get(url)).await {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let url = self.url(&["configs", key])?;
        let body = ConfigValue {
            value: value.to_string(),
        };

        self.send::<serde_json::Value>(self.client.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError> {
        let url = self.url(&["configs"])?;

        self.fetch(self.client.get(url)).await
    }
}
