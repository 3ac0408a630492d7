//! Page engine for promptlift.
//!
//! Finds the prompt input on third-party AI chat pages, frames it with a
//! draggable action control, sends the draft out for rewriting and writes
//! the result back in a way the host page's own framework accepts.
//!
//! The engine talks to the page only through [`page::PageTree`] and to the
//! privileged side only through [`promptlift_bridge::BridgeClient`].

pub mod controller;
pub mod error;
pub mod injection;
pub mod intent;
pub mod notice;
pub mod overlay;
pub mod page;
pub mod pending;
pub mod platform;
pub mod resolver;
pub mod session;

pub use controller::{DeliveryOutcome, EnhanceOutcome, InitReport, PageController};
pub use error::EngineError;
pub use injection::{CommitStrategy, InjectionEngine};
pub use intent::IntentHint;
pub use notice::NoticeKind;
pub use overlay::{AnchorCorner, LayoutSignal, RefreshOutcome};
pub use page::{PageTree, SnapshotPage};
pub use pending::{PendingInsertion, PendingInsertionStore};
pub use platform::{PlatformProfile, PlatformRegistry};
pub use resolver::{MutationSignal, ResolvedTarget};
pub use session::ControlState;
