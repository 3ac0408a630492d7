//! Bridge trait and the typed page-side client.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BridgeError;
use crate::message::{
    BridgeRequest, BridgeResponse, ProxiedRequest, ProxiedResponse, RewriteRequest,
    RewriteResponse, StreamMessage,
};

/// Stream of rewrite messages. Transport failures arrive as `StreamMessage::Error`.
pub type RewriteStream = Pin<Box<dyn Stream<Item = StreamMessage> + Send>>;

/// Message-passing boundary to the privileged background side.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Send one request and wait for its response.
    async fn request(&self, request: BridgeRequest) -> BridgeResponse;

    /// Open a streamed rewrite.
    async fn open_stream(&self, request: RewriteRequest) -> Result<RewriteStream, BridgeError>;
}

/// Typed facade used from the page context.
#[derive(Clone)]
pub struct BridgeClient {
    inner: Arc<dyn Bridge>,
}

impl BridgeClient {
    pub fn new(inner: Arc<dyn Bridge>) -> Self {
        Self { inner }
    }

    async fn call(&self, request: BridgeRequest) -> Result<Option<Value>, BridgeError> {
        let action = request.action();
        let response = self.inner.request(request).await;
        if response.success {
            Ok(response.data)
        } else {
            let message = response
                .error
                .unwrap_or_else(|| format!("{} failed without a message", action));
            Err(BridgeError::Failed(message))
        }
    }

    /// Rewrite text through the background side.
    pub async fn rewrite(&self, request: RewriteRequest) -> Result<String, BridgeError> {
        let data = self
            .call(BridgeRequest::Rewrite(request))
            .await?
            .ok_or_else(|| BridgeError::Remote("empty rewrite response".to_string()))?;
        let response: RewriteResponse = serde_json::from_value(data)?;
        match (response.success, response.enhanced_text) {
            (true, Some(text)) => Ok(text),
            (true, None) => Err(BridgeError::Remote("response had no enhanced text".to_string())),
            (false, _) => Err(BridgeError::Remote(
                response.error.unwrap_or_else(|| "rewrite failed".to_string()),
            )),
        }
    }

    pub async fn rewrite_stream(&self, request: RewriteRequest) -> Result<RewriteStream, BridgeError> {
        self.inner.open_stream(request).await
    }

    pub async fn open_page(&self, url: &str) -> Result<(), BridgeError> {
        self.call(BridgeRequest::OpenPage {
            url: url.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn fetch(&self, request: ProxiedRequest) -> Result<ProxiedResponse, BridgeError> {
        let data = self
            .call(BridgeRequest::Fetch(request))
            .await?
            .ok_or_else(|| BridgeError::Network("empty fetch response".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Read and decode a durable entry.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BridgeError> {
        let data = self.get_raw(key).await?;
        match data {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read a durable entry without decoding it.
    pub async fn get_raw(&self, key: &str) -> Result<Option<Value>, BridgeError> {
        let data = self
            .call(BridgeRequest::StorageGet {
                key: key.to_string(),
            })
            .await?;
        Ok(data.filter(|v| !v.is_null()))
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), BridgeError> {
        self.call(BridgeRequest::StorageSet {
            key: key.to_string(),
            value: serde_json::to_value(value)?,
        })
        .await
        .map(|_| ())
    }

    pub async fn remove(&self, key: &str) -> Result<(), BridgeError> {
        self.call(BridgeRequest::StorageRemove {
            key: key.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn keys(&self) -> Result<Vec<String>, BridgeError> {
        match self.call(BridgeRequest::StorageKeys).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }
}
