//! Descriptor pool, set, and update-template entry points.

use tracing::warn;
use vkshim_core::rewrite;
use vkshim_protocol::types::{
    DescriptorPoolCreateInfo, DescriptorSetAllocateInfo, TemplateDescription,
};
use vkshim_protocol::{ObjectType, RealId, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    pub fn create_descriptor_pool(&self, info: &DescriptorPoolCreateInfo) -> (Status, SurrogateId) {
        let (status, real) = self.driver.create_descriptor_pool(info);
        if status != Status::Success {
            return (status, SurrogateId::NULL);
        }
        match self.ctx.mint(ObjectType::DescriptorPool, real) {
            Ok(surrogate) => (status, surrogate),
            Err(err) => (err.status(), SurrogateId::NULL),
        }
    }

    /// Destroying a pool implicitly frees every set still allocated from it,
    /// so their identities are retired before the pool's own.
    pub fn destroy_descriptor_pool(&self, pool: SurrogateId) {
        if pool.is_null() {
            return;
        }
        if let Some(members) = self.ctx.shadow.pool_sets.get(pool) {
            for set in members {
                self.ctx.retire(ObjectType::DescriptorSet, set);
            }
        }
        self.ctx.shadow.pool_sets.erase(pool);
        let real = self.ctx.retire(ObjectType::DescriptorPool, pool);
        self.driver.destroy_descriptor_pool(real);
    }

    /// Reset returns every set to the pool; their identities are retired
    /// only once the underlying reset actually succeeded.
    pub fn reset_descriptor_pool(&self, pool: SurrogateId) -> Status {
        let real = self.ctx.resolve(pool);
        let status = self.driver.reset_descriptor_pool(real);
        if status == Status::Success && self.ctx.wrapping() {
            self.ctx.shadow.pool_sets.mutate(pool, |members| {
                for set in members.drain() {
                    self.ctx.identities.pop(set);
                }
            });
        }
        status
    }

    pub fn allocate_descriptor_sets(
        &self,
        info: &DescriptorSetAllocateInfo<SurrogateId>,
        sets: &mut [SurrogateId],
    ) -> Status {
        let local = rewrite::resolve_set_allocate_info(&self.ctx, info);
        let (status, reals) = self.driver.allocate_descriptor_sets(&local);
        if status != Status::Success {
            return status;
        }
        let wrapped = match rewrite::wrap_outputs(&self.ctx, ObjectType::DescriptorSet, &reals) {
            Ok(wrapped) => wrapped,
            Err(err) => return err.status(),
        };
        if self.ctx.wrapping() {
            self.ctx
                .shadow
                .pool_sets
                .mutate(info.pool, |members| members.extend(wrapped.iter().copied()));
        }
        for (dst, surrogate) in sets.iter_mut().zip(wrapped) {
            *dst = surrogate;
        }
        status
    }

    pub fn free_descriptor_sets(&self, pool: SurrogateId, sets: &[SurrogateId]) -> Status {
        let real_pool = self.ctx.resolve(pool);
        let reals: Vec<RealId> = sets.iter().map(|&s| self.ctx.resolve(s)).collect();
        let status = self.driver.free_descriptor_sets(real_pool, &reals);
        if status == Status::Success && self.ctx.wrapping() {
            self.ctx.shadow.pool_sets.mutate(pool, |members| {
                for set in sets {
                    members.remove(set);
                }
            });
            for &set in sets {
                self.ctx.retire(ObjectType::DescriptorSet, set);
            }
        }
        status
    }

    /// Create an update template. The already-resolved description is kept
    /// as shadow state: it is the only record of the raw-buffer layout that
    /// later template updates have to be decoded with.
    pub fn create_descriptor_update_template(
        &self,
        desc: &TemplateDescription<SurrogateId>,
    ) -> (Status, SurrogateId) {
        let local = rewrite::resolve_template_description(&self.ctx, desc);
        let (status, real) = self.driver.create_descriptor_update_template(&local);
        if status != Status::Success {
            return (status, SurrogateId::NULL);
        }
        let surrogate = match self.ctx.mint(ObjectType::DescriptorUpdateTemplate, real) {
            Ok(surrogate) => surrogate,
            Err(err) => return (err.status(), SurrogateId::NULL),
        };
        if self.ctx.wrapping() {
            self.ctx.shadow.templates.put(surrogate, local);
        }
        (status, surrogate)
    }

    pub fn destroy_descriptor_update_template(&self, template: SurrogateId) {
        if template.is_null() {
            return;
        }
        self.ctx.shadow.templates.erase(template);
        let real = self.ctx.retire(ObjectType::DescriptorUpdateTemplate, template);
        self.driver.destroy_descriptor_update_template(real);
    }

    /// Apply a template to a descriptor set. The application's raw buffer is
    /// flattened against the template's recorded layout into a scratch
    /// buffer owned by this call and released once the forwarded call
    /// returns.
    pub fn update_descriptor_set_with_template(
        &self,
        set: SurrogateId,
        template: SurrogateId,
        data: &[u8],
    ) -> Status {
        if !self.ctx.wrapping() {
            self.driver.update_descriptor_set_with_template(
                RealId(set.0),
                RealId(template.0),
                data,
            );
            return Status::Success;
        }
        let Some(layout) = self.ctx.shadow.templates.get(template) else {
            // A template identity with no recorded layout is stale or forged.
            warn!(template = template.0, "template update against unknown template");
            return Status::ErrorInvalidUsage;
        };
        let real_set = self.ctx.resolve(set);
        let real_template = self.ctx.resolve(template);
        let flattened = match rewrite::flatten_template_buffer(&self.ctx, &layout.entries, data) {
            Ok(buffer) => buffer,
            Err(err) => return err.status(),
        };
        self.driver
            .update_descriptor_set_with_template(real_set, real_template, &flattened);
        Status::Success
    }

    /// Command-buffer variant of the template update. Command buffers are
    /// dispatchable and never wrapped, so the identity passes through as-is.
    pub fn push_descriptor_set_with_template(
        &self,
        command_buffer: RealId,
        template: SurrogateId,
        layout: SurrogateId,
        set: u32,
        data: &[u8],
    ) -> Status {
        if !self.ctx.wrapping() {
            self.driver.push_descriptor_set_with_template(
                command_buffer,
                RealId(template.0),
                RealId(layout.0),
                set,
                data,
            );
            return Status::Success;
        }
        let Some(template_layout) = self.ctx.shadow.templates.get(template) else {
            warn!(template = template.0, "template push against unknown template");
            return Status::ErrorInvalidUsage;
        };
        let real_template = self.ctx.resolve(template);
        let real_layout = self.ctx.resolve(layout);
        let flattened =
            match rewrite::flatten_template_buffer(&self.ctx, &template_layout.entries, data) {
                Ok(buffer) => buffer,
                Err(err) => return err.status(),
            };
        self.driver.push_descriptor_set_with_template(
            command_buffer,
            real_template,
            real_layout,
            set,
            &flattened,
        );
        Status::Success
    }
}
