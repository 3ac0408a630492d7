//! Bridge message contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from the page context, serialized as `{action, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum BridgeRequest {
    /// Open a page in a new tab.
    OpenPage { url: String },
    /// Network call the page context may not make itself.
    Fetch(ProxiedRequest),
    /// Non-streamed call to the rewriting service.
    Rewrite(RewriteRequest),
    StorageGet { key: String },
    StorageSet { key: String, value: Value },
    StorageRemove { key: String },
    StorageKeys,
}

impl BridgeRequest {
    /// Action name as it appears on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            BridgeRequest::OpenPage { .. } => "openPage",
            BridgeRequest::Fetch(_) => "fetch",
            BridgeRequest::Rewrite(_) => "rewrite",
            BridgeRequest::StorageGet { .. } => "storageGet",
            BridgeRequest::StorageSet { .. } => "storageSet",
            BridgeRequest::StorageRemove { .. } => "storageRemove",
            BridgeRequest::StorageKeys => "storageKeys",
        }
    }
}

/// Response envelope, `{success, data}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Proxied network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxiedRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: String,
}

/// Request body for the rewriting service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub prompt: String,
    pub style: String,
    pub platform: String,
    pub intent_hint: String,
}

/// Non-streamed rewriting response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    pub success: bool,
    #[serde(default)]
    pub enhanced_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One message of a streamed rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Chunk { chunk: String },
    Error { error: String },
    Complete { complete: bool },
}

impl StreamMessage {
    pub fn chunk(text: impl Into<String>) -> Self {
        StreamMessage::Chunk { chunk: text.into() }
    }

    pub fn complete() -> Self {
        StreamMessage::Complete { complete: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error {
            error: message.into(),
        }
    }
}
