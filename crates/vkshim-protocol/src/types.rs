use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::chain::ExtensionNode;
use crate::status::Status;

// ============================================================================
// Owned argument structures of the intercepted interface
// ============================================================================
//
// Structures that carry object identities are generic over the identity space
// `H`: adapters receive them instantiated with `SurrogateId` and hand the
// driver copies instantiated with `RealId`. Flag and enum fields ride along
// as the interface's raw numeric values.

/// Sentinel meaning "this attachment slot is intentionally not used".
pub const ATTACHMENT_UNUSED: u32 = u32::MAX;

/// The undefined image format sentinel.
pub const FORMAT_UNDEFINED: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

// ── Render pass ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDescription {
    pub flags: u32,
    pub format: u32,
    pub samples: u32,
    pub load_op: u32,
    pub store_op: u32,
    /// Foreign-memory format annotation. A resolve attachment carrying one
    /// can stand in for an unused color attachment slot.
    pub external_format: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub attachment: u32,
    pub layout: u32,
}

impl AttachmentReference {
    pub const UNUSED: AttachmentReference = AttachmentReference {
        attachment: ATTACHMENT_UNUSED,
        layout: 0,
    };

    pub fn is_unused(&self) -> bool {
        self.attachment == ATTACHMENT_UNUSED
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubpassDescription {
    pub flags: u32,
    pub input_attachments: Vec<AttachmentReference>,
    pub color_attachments: Vec<AttachmentReference>,
    pub resolve_attachments: Vec<AttachmentReference>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: u32,
    pub dst_stage_mask: u32,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
}

/// Render pass creation description. Carries no object identities, so it is
/// forwarded as-is; the layer's interest in it is the per-subpass attachment
/// usage it derives at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderPassDescription {
    pub flags: u32,
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDescription>,
    pub dependencies: Vec<SubpassDependency>,
}

/// Dynamic-rendering equivalent of a render pass description, supplied as a
/// pipeline extension node instead of a render pass object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderingInfo {
    pub view_mask: u32,
    pub color_attachment_formats: Vec<u32>,
    pub depth_attachment_format: u32,
    pub stencil_attachment_format: u32,
}

// ── Pipelines ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderStage<H> {
    pub stage: u32,
    pub module: H,
    pub entry_point: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportState {
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Extent2D>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
    pub src_color_factor: u32,
    pub dst_color_factor: u32,
    pub color_write_mask: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorBlendState {
    pub logic_op_enable: bool,
    pub attachments: Vec<ColorBlendAttachment>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: u32,
    pub stencil_test_enable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsPipelineCreateInfo<H> {
    pub flags: u32,
    pub stages: Vec<ShaderStage<H>>,
    pub viewport_state: Option<ViewportState>,
    /// Only meaningful when the target subpass writes a color attachment;
    /// dropped from the forwarded copy otherwise.
    pub color_blend_state: Option<ColorBlendState>,
    /// Only meaningful when the target subpass uses a depth-stencil
    /// attachment; dropped from the forwarded copy otherwise.
    pub depth_stencil_state: Option<DepthStencilState>,
    pub layout: H,
    pub render_pass: H,
    pub subpass: u32,
    pub base_pipeline: H,
    pub chain: Vec<ExtensionNode<H>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputePipelineCreateInfo<H> {
    pub flags: u32,
    pub stage: ShaderStage<H>,
    pub layout: H,
    pub base_pipeline: H,
    pub chain: Vec<ExtensionNode<H>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RayTracingShaderGroup {
    pub group_type: u32,
    pub general_shader: u32,
    pub closest_hit_shader: u32,
    pub any_hit_shader: u32,
    pub intersection_shader: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineLibraryInfo<H> {
    pub libraries: Vec<H>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RayTracingPipelineCreateInfo<H> {
    pub flags: u32,
    pub stages: Vec<ShaderStage<H>>,
    pub groups: Vec<RayTracingShaderGroup>,
    pub max_recursion_depth: u32,
    pub library_info: Option<PipelineLibraryInfo<H>>,
    pub layout: H,
    pub base_pipeline: H,
    pub chain: Vec<ExtensionNode<H>>,
}

// ── Descriptors ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    InputAttachment,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    UniformTexelBuffer,
    StorageTexelBuffer,
    /// Raw bytes written straight into the descriptor set. For this kind the
    /// descriptor count of a template entry is a byte count.
    InlineUniformBlock,
    AccelerationStructure,
}

impl DescriptorKind {
    /// Element size of this kind inside a template-described raw buffer, or
    /// `None` for inline blocks, which occupy `descriptor_count` bytes in a
    /// single span instead of per-index elements.
    pub fn element_size(self) -> Option<usize> {
        match self {
            DescriptorKind::Sampler
            | DescriptorKind::CombinedImageSampler
            | DescriptorKind::SampledImage
            | DescriptorKind::StorageImage
            | DescriptorKind::InputAttachment => Some(std::mem::size_of::<ImageSamplerElement>()),
            DescriptorKind::UniformBuffer
            | DescriptorKind::StorageBuffer
            | DescriptorKind::UniformBufferDynamic
            | DescriptorKind::StorageBufferDynamic => Some(std::mem::size_of::<BufferElement>()),
            DescriptorKind::UniformTexelBuffer | DescriptorKind::StorageTexelBuffer => {
                Some(std::mem::size_of::<BufferViewElement>())
            }
            DescriptorKind::AccelerationStructure => {
                Some(std::mem::size_of::<AccelerationStructureElement>())
            }
            DescriptorKind::InlineUniformBlock => None,
        }
    }
}

// Raw in-buffer element layouts for template-described updates. Identity
// fields hold the 64-bit identity value of whichever space the buffer is in.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageSamplerElement {
    pub sampler: u64,
    pub image_view: u64,
    pub image_layout: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferElement {
    pub buffer: u64,
    pub offset: u64,
    pub range: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferViewElement {
    pub buffer_view: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct AccelerationStructureElement {
    pub acceleration_structure: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DescriptorPoolSize {
    pub kind: DescriptorKind,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorPoolCreateInfo {
    pub flags: u32,
    pub max_sets: u32,
    pub pool_sizes: Vec<DescriptorPoolSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorSetAllocateInfo<H> {
    pub pool: H,
    pub set_layouts: Vec<H>,
}

/// One entry of a descriptor update template: where elements live in the
/// application's raw buffer and what shape they have.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub binding: u32,
    pub array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_kind: DescriptorKind,
    pub offset: usize,
    pub stride: usize,
}

/// What a template binds against when applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TemplateBinding<H> {
    DescriptorSet { set_layout: H },
    PushDescriptors { pipeline_layout: H, set: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDescription<H> {
    pub entries: Vec<TemplateEntry>,
    pub binding: TemplateBinding<H>,
}

// ── Swapchain / present ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapchainCreateInfo<H> {
    pub surface: H,
    pub min_image_count: u32,
    pub image_format: u32,
    pub image_extent: Extent2D,
    pub old_swapchain: H,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentInfo<H> {
    pub wait_semaphores: Vec<H>,
    pub swapchains: Vec<H>,
    pub image_indices: Vec<u32>,
    /// Per-swapchain result slots. `Some` requests one status per swapchain;
    /// the layer copies them back from its forwarded copy after the call.
    pub results: Option<Vec<Status>>,
}

// ── Display discovery ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayProperties<H> {
    pub display: H,
    pub display_name: String,
    pub physical_resolution: Extent2D,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayModeProperties<H> {
    pub display_mode: H,
    pub visible_region: Extent2D,
    pub refresh_rate: u32,
}
