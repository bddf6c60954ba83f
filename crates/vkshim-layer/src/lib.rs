//! Per-entry-point adapters of the interception layer.
//!
//! Each adapter resolves incoming surrogate identities, builds a rewritten
//! copy of the call's arguments, forwards to the underlying [`Driver`],
//! copies output fields back, and wraps newly created objects. The client
//! only ever sees surrogate identities; the driver only ever sees real ones.

use vkshim_core::{LayerContext, LayerSettings};

pub mod deferred;
pub mod descriptor;
pub mod display;
pub mod driver;
pub mod pipeline;
pub mod renderpass;
pub mod swapchain;

pub use driver::Driver;

/// One interception layer instance: the process-scoped context plus the
/// underlying implementation it forwards to.
pub struct Layer<D: Driver> {
    pub(crate) ctx: LayerContext,
    pub(crate) driver: D,
}

impl<D: Driver> Layer<D> {
    /// Build a layer with settings loaded from the environment.
    pub fn new(driver: D) -> Self {
        Self::with_settings(LayerSettings::load(), driver)
    }

    pub fn with_settings(settings: LayerSettings, driver: D) -> Self {
        Self {
            ctx: LayerContext::new(settings),
            driver,
        }
    }

    pub fn context(&self) -> &LayerContext {
        &self.ctx
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}
