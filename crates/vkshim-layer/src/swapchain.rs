//! Swapchain and present entry points.

use vkshim_core::rewrite;
use vkshim_protocol::types::{PresentInfo, SwapchainCreateInfo};
use vkshim_protocol::{ObjectType, RealId, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    pub fn create_swapchain(&self, info: &SwapchainCreateInfo<SurrogateId>) -> (Status, SurrogateId) {
        let local = rewrite::resolve_swapchain_create_info(&self.ctx, info);
        let (status, real) = self.driver.create_swapchain(&local);
        if status != Status::Success {
            return (status, SurrogateId::NULL);
        }
        match self.ctx.mint(ObjectType::Swapchain, real) {
            Ok(surrogate) => (status, surrogate),
            Err(err) => (err.status(), SurrogateId::NULL),
        }
    }

    /// Query a swapchain's images. The image list grows lazily: a query that
    /// reaches further than any previous one mints identities for the new
    /// tail only, and every index keeps the identity it was first given, so
    /// repeated queries agree with each other.
    pub fn get_swapchain_images(
        &self,
        swapchain: SurrogateId,
        count: &mut u32,
        images: Option<&mut [SurrogateId]>,
    ) -> Status {
        let real_swapchain = self.ctx.resolve(swapchain);
        let Some(out) = images else {
            return self.driver.get_swapchain_images(real_swapchain, count, None);
        };

        let mut reals = vec![RealId::NULL; out.len()];
        let status = self
            .driver
            .get_swapchain_images(real_swapchain, count, Some(&mut reals));
        if !status.wrote_output() || *count == 0 {
            return status;
        }
        let written = (*count as usize).min(out.len());

        if !self.ctx.wrapping() {
            for (dst, real) in out.iter_mut().zip(&reals[..written]) {
                *dst = SurrogateId(real.0);
            }
            return status;
        }

        let wrapped = self.ctx.shadow.swapchain_images.mutate(swapchain, |list| {
            for index in list.len()..written {
                list.push(self.ctx.identities.wrap_new(reals[index])?);
            }
            Ok::<_, vkshim_core::CoreError>(list[..written].to_vec())
        });
        match wrapped {
            Ok(wrapped) => {
                out[..written].copy_from_slice(&wrapped);
                status
            }
            Err(err) => err.status(),
        }
    }

    /// Destroy a swapchain and retire every image identity minted for it.
    /// The images belong to the swapchain; the underlying implementation is
    /// free to reuse them the moment it goes away.
    pub fn destroy_swapchain(&self, swapchain: SurrogateId) {
        if swapchain.is_null() {
            return;
        }
        if let Some(image_list) = self.ctx.shadow.swapchain_images.get(swapchain) {
            for image in image_list {
                self.ctx.retire(ObjectType::Image, image);
            }
        }
        self.ctx.shadow.swapchain_images.erase(swapchain);
        let real = self.ctx.retire(ObjectType::Swapchain, swapchain);
        self.driver.destroy_swapchain(real);
    }

    /// Present: the forwarded copy carries resolved identities and its own
    /// result slots; the slots are copied back into the caller's structure,
    /// which is the only place that copy happens.
    pub fn queue_present(&self, info: &mut PresentInfo<SurrogateId>) -> Status {
        let mut local = rewrite::resolve_present_info(&self.ctx, info);
        let status = self.driver.queue_present(&mut local);
        rewrite::copy_back_present_results(&local, info);
        status
    }
}
