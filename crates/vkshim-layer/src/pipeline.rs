//! Graphics and compute pipeline creation.

use vkshim_core::rewrite;
use vkshim_protocol::types::{ComputePipelineCreateInfo, GraphicsPipelineCreateInfo};
use vkshim_protocol::{ObjectType, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    /// Create a batch of graphics pipelines. The forwarded copies carry real
    /// identities and only the attachment state their target subpass
    /// actually uses; driver-written creation feedback is copied back into
    /// the caller's chains whatever the outcome, while new identities are
    /// minted only when the call did not fail outright.
    pub fn create_graphics_pipelines(
        &self,
        cache: SurrogateId,
        infos: &mut [GraphicsPipelineCreateInfo<SurrogateId>],
        pipelines: &mut [SurrogateId],
    ) -> Status {
        let mut local_infos: Vec<_> = infos
            .iter()
            .map(|info| rewrite::resolve_graphics_pipeline(&self.ctx, info))
            .collect();
        let cache = self.ctx.resolve(cache);

        let (status, reals) = self.driver.create_graphics_pipelines(cache, &mut local_infos);

        for (local, caller) in local_infos.iter().zip(infos.iter_mut()) {
            rewrite::copy_back_creation_feedback(&local.chain, &mut caller.chain);
        }
        if status.is_error() {
            return status;
        }
        match rewrite::wrap_outputs(&self.ctx, ObjectType::Pipeline, &reals) {
            Ok(wrapped) => {
                for (dst, surrogate) in pipelines.iter_mut().zip(wrapped) {
                    *dst = surrogate;
                }
                status
            }
            Err(err) => err.status(),
        }
    }

    pub fn create_compute_pipelines(
        &self,
        cache: SurrogateId,
        infos: &mut [ComputePipelineCreateInfo<SurrogateId>],
        pipelines: &mut [SurrogateId],
    ) -> Status {
        let mut local_infos: Vec<_> = infos
            .iter()
            .map(|info| rewrite::resolve_compute_pipeline(&self.ctx, info))
            .collect();
        let cache = self.ctx.resolve(cache);

        let (status, reals) = self.driver.create_compute_pipelines(cache, &mut local_infos);

        for (local, caller) in local_infos.iter().zip(infos.iter_mut()) {
            rewrite::copy_back_creation_feedback(&local.chain, &mut caller.chain);
        }
        if status.is_error() {
            return status;
        }
        match rewrite::wrap_outputs(&self.ctx, ObjectType::Pipeline, &reals) {
            Ok(wrapped) => {
                for (dst, surrogate) in pipelines.iter_mut().zip(wrapped) {
                    *dst = surrogate;
                }
                status
            }
            Err(err) => err.status(),
        }
    }

    pub fn destroy_pipeline(&self, pipeline: SurrogateId) {
        if pipeline.is_null() {
            return;
        }
        let real = self.ctx.retire(ObjectType::Pipeline, pipeline);
        self.driver.destroy_pipeline(real);
    }
}
