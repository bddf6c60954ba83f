//! Core state of the interception layer: the surrogate/real identity map,
//! the per-object shadow tables, argument rewriting, and deferred-operation
//! bookkeeping. Everything here is owned by a [`context::LayerContext`]; the
//! per-entry-point adapters live in `vkshim-layer`.

pub mod config;
pub mod context;
pub mod deferred;
pub mod error;
pub mod identity_map;
pub mod rewrite;
pub mod shadow;

pub use config::LayerSettings;
pub use context::LayerContext;
pub use deferred::DeferredOperationTracker;
pub use error::CoreError;
pub use identity_map::IdentityMap;
pub use shadow::{RenderPassUsage, ShadowStateStore, ShadowTable};
