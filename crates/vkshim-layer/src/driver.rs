use vkshim_protocol::types::{
    ComputePipelineCreateInfo, DescriptorPoolCreateInfo, DescriptorSetAllocateInfo,
    DisplayModeProperties, DisplayProperties, GraphicsPipelineCreateInfo, PresentInfo,
    RayTracingPipelineCreateInfo, RenderPassDescription, SwapchainCreateInfo,
    TemplateDescription,
};
use vkshim_protocol::{RealId, Status};

/// The underlying implementation's entry points the layer forwards to.
/// Production wires this to the loaded driver; tests substitute a mock.
///
/// Conventions shared with the layer's own entry points:
/// - enumeration calls take `count` in/out with an optional output slice
///   whose length is the capacity; `Incomplete` means more was available;
/// - creation calls return one real identity per requested element, null for
///   elements that were not produced;
/// - create-info structures may carry driver-written output nodes (creation
///   feedback), which is why they are passed mutably.
pub trait Driver: Send + Sync {
    // ── Render pass ─────────────────────────────────────────
    fn create_render_pass(&self, desc: &RenderPassDescription) -> (Status, RealId);
    fn destroy_render_pass(&self, render_pass: RealId);

    // ── Pipelines ───────────────────────────────────────────
    fn create_graphics_pipelines(
        &self,
        cache: RealId,
        infos: &mut [GraphicsPipelineCreateInfo<RealId>],
    ) -> (Status, Vec<RealId>);
    fn create_compute_pipelines(
        &self,
        cache: RealId,
        infos: &mut [ComputePipelineCreateInfo<RealId>],
    ) -> (Status, Vec<RealId>);
    fn destroy_pipeline(&self, pipeline: RealId);

    // ── Deferred operations ─────────────────────────────────
    fn create_deferred_operation(&self) -> (Status, RealId);
    fn destroy_deferred_operation(&self, operation: RealId);
    fn create_ray_tracing_pipelines(
        &self,
        deferred_operation: RealId,
        cache: RealId,
        infos: &mut [RayTracingPipelineCreateInfo<RealId>],
    ) -> (Status, Vec<RealId>);
    fn deferred_operation_join(&self, operation: RealId) -> Status;
    fn get_deferred_operation_result(&self, operation: RealId) -> Status;

    // ── Swapchain / present ─────────────────────────────────
    fn create_swapchain(&self, info: &SwapchainCreateInfo<RealId>) -> (Status, RealId);
    fn destroy_swapchain(&self, swapchain: RealId);
    fn get_swapchain_images(
        &self,
        swapchain: RealId,
        count: &mut u32,
        images: Option<&mut [RealId]>,
    ) -> Status;
    fn queue_present(&self, info: &mut PresentInfo<RealId>) -> Status;

    // ── Descriptors ─────────────────────────────────────────
    fn create_descriptor_pool(&self, info: &DescriptorPoolCreateInfo) -> (Status, RealId);
    fn destroy_descriptor_pool(&self, pool: RealId);
    fn reset_descriptor_pool(&self, pool: RealId) -> Status;
    fn allocate_descriptor_sets(
        &self,
        info: &DescriptorSetAllocateInfo<RealId>,
    ) -> (Status, Vec<RealId>);
    fn free_descriptor_sets(&self, pool: RealId, sets: &[RealId]) -> Status;
    fn create_descriptor_update_template(
        &self,
        desc: &TemplateDescription<RealId>,
    ) -> (Status, RealId);
    fn destroy_descriptor_update_template(&self, template: RealId);
    fn update_descriptor_set_with_template(&self, set: RealId, template: RealId, data: &[u8]);
    fn push_descriptor_set_with_template(
        &self,
        command_buffer: RealId,
        template: RealId,
        layout: RealId,
        set: u32,
        data: &[u8],
    );

    // ── Display discovery ───────────────────────────────────
    fn get_display_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [DisplayProperties<RealId>]>,
    ) -> Status;
    fn get_display_mode_properties(
        &self,
        display: RealId,
        count: &mut u32,
        properties: Option<&mut [DisplayModeProperties<RealId>]>,
    ) -> Status;
}
