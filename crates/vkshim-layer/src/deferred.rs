//! Deferred-operation entry points.
//!
//! A deferred creation call returns its new identities immediately; only the
//! work behind them completes later, on whichever thread joins the operation
//! or polls its result first. The layer therefore wraps the outputs right
//! away and queues the rest of its bookkeeping -- releasing the retained
//! argument copies, publishing the produced list -- to run exactly once at
//! whichever completion event comes first.

use vkshim_core::rewrite;
use vkshim_protocol::types::RayTracingPipelineCreateInfo;
use vkshim_protocol::{ObjectType, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    pub fn create_deferred_operation(&self) -> (Status, SurrogateId) {
        let (status, real) = self.driver.create_deferred_operation();
        if status != Status::Success {
            return (status, SurrogateId::NULL);
        }
        match self.ctx.mint(ObjectType::DeferredOperation, real) {
            Ok(surrogate) => (status, surrogate),
            Err(err) => (err.status(), SurrogateId::NULL),
        }
    }

    pub fn destroy_deferred_operation(&self, operation: SurrogateId) {
        if operation.is_null() {
            return;
        }
        self.ctx.deferred.forget(operation);
        let real = self.ctx.retire(ObjectType::DeferredOperation, operation);
        self.driver.destroy_deferred_operation(real);
    }

    /// Create ray tracing pipelines, possibly deferred. When the driver
    /// reports the operation deferred, it keeps reading the forwarded
    /// argument copies and the unwrapped output list until the work is done;
    /// ownership of both moves into the completion action, so they live
    /// exactly as long as "the action has not run yet".
    pub fn create_ray_tracing_pipelines(
        &self,
        deferred_operation: SurrogateId,
        cache: SurrogateId,
        infos: &mut [RayTracingPipelineCreateInfo<SurrogateId>],
        pipelines: &mut [SurrogateId],
    ) -> Status {
        let mut local_infos: Vec<_> = infos
            .iter()
            .map(|info| rewrite::resolve_ray_tracing_pipeline(&self.ctx, info))
            .collect();
        let real_operation = self.ctx.resolve(deferred_operation);
        let real_cache = self.ctx.resolve(cache);

        let (status, reals) =
            self.driver
                .create_ray_tracing_pipelines(real_operation, real_cache, &mut local_infos);

        for (local, caller) in local_infos.iter().zip(infos.iter_mut()) {
            rewrite::copy_back_creation_feedback(&local.chain, &mut caller.chain);
        }
        if status.is_error() {
            return status;
        }

        // The client must never see a real identity, so wrapping happens now
        // even when the build itself is still running.
        let wrapped = match rewrite::wrap_outputs(&self.ctx, ObjectType::Pipeline, &reals) {
            Ok(wrapped) => wrapped,
            Err(err) => return err.status(),
        };
        for (dst, surrogate) in pipelines.iter_mut().zip(wrapped.iter()) {
            *dst = *surrogate;
        }

        let deferred = !deferred_operation.is_null() && status == Status::OperationDeferred;
        if deferred {
            self.ctx.deferred.record_produced(deferred_operation, wrapped);
            let retained = (local_infos, reals);
            self.ctx
                .deferred
                .queue_completion(deferred_operation, Box::new(move || drop(retained)));
        }
        status
    }

    pub fn deferred_operation_join(&self, operation: SurrogateId) -> Status {
        let real = self.ctx.resolve(operation);
        let status = self.driver.deferred_operation_join(real);
        // Only the thread that saw the operation through to overall success
        // performs the retained bookkeeping.
        if status == Status::Success {
            self.ctx.deferred.consume(operation);
        }
        status
    }

    /// A caller may skip joining entirely and poll for the result instead;
    /// the bookkeeping has to run either way, and only once.
    pub fn get_deferred_operation_result(&self, operation: SurrogateId) -> Status {
        let real = self.ctx.resolve(operation);
        let status = self.driver.get_deferred_operation_result(real);
        if status == Status::Success {
            self.ctx.deferred.consume(operation);
        }
        status
    }
}
