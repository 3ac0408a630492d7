//! Cross-context bridge for promptlift.
//!
//! The page context cannot open tabs, make cross-origin requests or keep
//! state across navigations. Those actions are sent as `{action, payload}`
//! messages to a privileged background side, which answers with
//! `{success, data | error}`.
//!
//! ```text
//! ┌──────────────────┐   BridgeRequest    ┌────────────────────┐
//! │  Page context    │ ─────────────────► │ BackgroundBridge   │
//! │  (BridgeClient)  │ ◄───────────────── │ store/tabs/remote  │
//! └──────────────────┘   BridgeResponse   └────────────────────┘
//! ```
//!
//! Calls are independent. Nothing here orders concurrent requests, so callers
//! must not rely on one bridge call finishing before another.

mod background;
mod bridge;
mod error;
mod message;
pub mod remote;
pub mod storage;

pub use background::{BackgroundBridge, RecordingTabOpener, SystemTabOpener, TabOpener};
pub use bridge::{Bridge, BridgeClient, RewriteStream};
pub use error::BridgeError;
pub use message::{
    BridgeRequest, BridgeResponse, ProxiedRequest, ProxiedResponse, RewriteRequest,
    RewriteResponse, StreamMessage,
};
pub use remote::RewriteClient;
pub use storage::{DurableStore, FileStore, MemoryStore};
