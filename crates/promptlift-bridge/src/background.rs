//! Background side of the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::bridge::{Bridge, RewriteStream};
use crate::error::BridgeError;
use crate::message::{BridgeRequest, BridgeResponse, ProxiedRequest, ProxiedResponse, RewriteRequest};
use crate::remote::RewriteClient;
use crate::storage::{self, DurableStore};

/// Opens pages in a new tab (or the closest equivalent).
#[async_trait]
pub trait TabOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), BridgeError>;
}

/// Hands the URL to the operating system's default browser.
pub struct SystemTabOpener;

#[async_trait]
impl TabOpener for SystemTabOpener {
    async fn open(&self, url: &str) -> Result<(), BridgeError> {
        #[cfg(target_os = "macos")]
        let mut cmd = {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        };

        #[cfg(target_os = "windows")]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let mut cmd = {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        };

        let status = cmd
            .status()
            .await
            .map_err(|e| BridgeError::TabOpen(format!("{}: {}", url, e)))?;
        if !status.success() {
            return Err(BridgeError::TabOpen(format!("{} exited with {}", url, status)));
        }
        info!("Opened {}", url);
        Ok(())
    }
}

/// Remembers opened URLs instead of opening them.
#[derive(Default)]
pub struct RecordingTabOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingTabOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl TabOpener for RecordingTabOpener {
    async fn open(&self, url: &str) -> Result<(), BridgeError> {
        info!("Recorded page open: {}", url);
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

/// Routes bridge requests to storage, tabs and the network.
pub struct BackgroundBridge {
    store: Arc<dyn DurableStore>,
    tabs: Arc<dyn TabOpener>,
    rewriter: RewriteClient,
    http: reqwest::Client,
}

impl BackgroundBridge {
    pub fn new(store: Arc<dyn DurableStore>, tabs: Arc<dyn TabOpener>, rewriter: RewriteClient) -> Self {
        Self {
            store,
            tabs,
            rewriter,
            http: reqwest::Client::new(),
        }
    }

    /// Startup housekeeping: prune entries outside the storage layout.
    pub async fn startup(&self) -> Result<Vec<String>, BridgeError> {
        storage::prune_unknown(self.store.as_ref()).await
    }

    async fn dispatch(&self, request: BridgeRequest) -> Result<Option<Value>, BridgeError> {
        match request {
            BridgeRequest::OpenPage { url } => {
                self.tabs.open(&url).await?;
                Ok(None)
            }
            BridgeRequest::Fetch(req) => {
                let response = self.fetch(req).await?;
                Ok(Some(serde_json::to_value(response)?))
            }
            BridgeRequest::Rewrite(req) => {
                let response = self.rewriter.rewrite(&req).await?;
                Ok(Some(serde_json::to_value(response)?))
            }
            BridgeRequest::StorageGet { key } => self.store.get(&key).await,
            BridgeRequest::StorageSet { key, value } => {
                self.store.set(&key, value).await?;
                Ok(None)
            }
            BridgeRequest::StorageRemove { key } => {
                self.store.remove(&key).await?;
                Ok(None)
            }
            BridgeRequest::StorageKeys => {
                let keys = self.store.keys().await?;
                Ok(Some(serde_json::to_value(keys)?))
            }
        }
    }

    async fn fetch(&self, req: ProxiedRequest) -> Result<ProxiedResponse, BridgeError> {
        let method = reqwest::Method::from_bytes(req.method.to_uppercase().as_bytes())
            .map_err(|_| BridgeError::UnsupportedAction(format!("fetch method {}", req.method)))?;
        let mut builder = self.http.request(method, &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Proxied fetch {} -> {}", req.url, status);
        Ok(ProxiedResponse { status, body })
    }
}

#[async_trait]
impl Bridge for BackgroundBridge {
    async fn request(&self, request: BridgeRequest) -> BridgeResponse {
        let action = request.action();
        match self.dispatch(request).await {
            Ok(data) => BridgeResponse::ok(data),
            Err(e) => {
                warn!("Bridge action {} failed: {}", action, e);
                BridgeResponse::fail(e.to_string())
            }
        }
    }

    async fn open_stream(&self, request: RewriteRequest) -> Result<RewriteStream, BridgeError> {
        self.rewriter.rewrite_stream(&request).await
    }
}
