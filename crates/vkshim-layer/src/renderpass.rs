//! Render pass entry points.

use vkshim_core::RenderPassUsage;
use vkshim_protocol::types::RenderPassDescription;
use vkshim_protocol::{ObjectType, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    /// Create a render pass. On success the per-subpass attachment usage is
    /// recorded before the new identity is handed out, so a pipeline created
    /// against the pass on another thread immediately finds it.
    pub fn create_render_pass(&self, desc: &RenderPassDescription) -> (Status, SurrogateId) {
        let (status, real) = self.driver.create_render_pass(desc);
        if status != Status::Success {
            return (status, SurrogateId::NULL);
        }
        let surrogate = match self.ctx.mint(ObjectType::RenderPass, real) {
            Ok(surrogate) => surrogate,
            Err(err) => return (err.status(), SurrogateId::NULL),
        };
        if self.ctx.wrapping() {
            self.ctx
                .shadow
                .render_passes
                .put(surrogate, RenderPassUsage::from_description(desc));
        }
        (status, surrogate)
    }

    /// Destroying null destroys nothing; destroying twice forwards null the
    /// second time.
    pub fn destroy_render_pass(&self, render_pass: SurrogateId) {
        if render_pass.is_null() {
            return;
        }
        let real = self.ctx.retire(ObjectType::RenderPass, render_pass);
        self.driver.destroy_render_pass(real);
        self.ctx.shadow.render_passes.erase(render_pass);
    }
}
