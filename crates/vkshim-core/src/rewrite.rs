//! Argument rewriting: deep copies of call argument structures with every
//! surrogate identity replaced by its real identity, flattening of
//! template-described raw buffers, and copy-back of driver-written output
//! fields into caller-owned structures.
//!
//! The rewritten image is a separate owned value the caller never sees;
//! output fields therefore have to be copied back explicitly after the
//! forwarded call returns, and that copy happens here and nowhere else.

use bytemuck::Pod;
use vkshim_protocol::chain::{ExtensionNode, ShaderGroup};
use vkshim_protocol::types::{
    AccelerationStructureElement, BufferElement, BufferViewElement, ComputePipelineCreateInfo,
    DescriptorKind, DescriptorSetAllocateInfo, GraphicsPipelineCreateInfo, ImageSamplerElement,
    PipelineLibraryInfo, PresentInfo, RayTracingPipelineCreateInfo, ShaderStage,
    SwapchainCreateInfo, TemplateBinding, TemplateDescription, TemplateEntry,
};
use vkshim_protocol::{ObjectType, RealId, Status, SurrogateId};

use crate::context::LayerContext;
use crate::error::CoreError;
use crate::shadow::RenderPassUsage;

// ── Chain deep-copy ─────────────────────────────────────────

pub fn resolve_stage(ctx: &LayerContext, stage: &ShaderStage<SurrogateId>) -> ShaderStage<RealId> {
    ShaderStage {
        stage: stage.stage,
        module: ctx.resolve(stage.module),
        entry_point: stage.entry_point.clone(),
    }
}

/// Clone an auxiliary-structure chain, resolving every embedded surrogate,
/// including those nested in arrays inside a node. Kinds with nothing to
/// resolve are copied as-is. The match is exhaustive on purpose: a new node
/// kind must state what resolution it needs before this compiles again.
pub fn resolve_chain(
    ctx: &LayerContext,
    chain: &[ExtensionNode<SurrogateId>],
) -> Vec<ExtensionNode<RealId>> {
    chain
        .iter()
        .map(|node| match node {
            ExtensionNode::Rendering(info) => ExtensionNode::Rendering(info.clone()),
            ExtensionNode::PipelineLibraries { libraries } => ExtensionNode::PipelineLibraries {
                libraries: libraries.iter().map(|&lib| ctx.resolve(lib)).collect(),
            },
            ExtensionNode::ShaderGroups { groups, pipelines } => ExtensionNode::ShaderGroups {
                groups: groups
                    .iter()
                    .map(|group| ShaderGroup {
                        stages: group
                            .stages
                            .iter()
                            .map(|stage| resolve_stage(ctx, stage))
                            .collect(),
                    })
                    .collect(),
                pipelines: pipelines.iter().map(|&p| ctx.resolve(p)).collect(),
            },
            ExtensionNode::CreationFeedback(feedback) => {
                ExtensionNode::CreationFeedback(feedback.clone())
            }
        })
        .collect()
}

// ── Pipeline create infos ───────────────────────────────────

/// Deep-copy one graphics pipeline description for forwarding. The target
/// subpass's recorded attachment usage (or the dynamic-rendering node, when
/// one is chained) decides whether the copy keeps the color-blend and
/// depth-stencil state: state for an attachment kind the subpass never
/// touches is dropped rather than forwarded.
pub fn resolve_graphics_pipeline(
    ctx: &LayerContext,
    info: &GraphicsPipelineCreateInfo<SurrogateId>,
) -> GraphicsPipelineCreateInfo<RealId> {
    let (mut uses_color, mut uses_depth_stencil) = (true, true);
    if ctx.wrapping() {
        let usage = ctx.shadow.render_passes.get(info.render_pass);
        uses_color = usage.as_ref().is_some_and(|u| u.uses_color(info.subpass));
        uses_depth_stencil = usage
            .as_ref()
            .is_some_and(|u| u.uses_depth_stencil(info.subpass));

        if let Some(rendering) = ExtensionNode::find_rendering(&info.chain) {
            let usage = RenderPassUsage::from_rendering_info(rendering);
            uses_color = usage.uses_color(0);
            uses_depth_stencil = usage.uses_depth_stencil(0);
        }
    }

    GraphicsPipelineCreateInfo {
        flags: info.flags,
        stages: info
            .stages
            .iter()
            .map(|stage| resolve_stage(ctx, stage))
            .collect(),
        viewport_state: info.viewport_state.clone(),
        color_blend_state: if uses_color {
            info.color_blend_state.clone()
        } else {
            None
        },
        depth_stencil_state: if uses_depth_stencil {
            info.depth_stencil_state.clone()
        } else {
            None
        },
        layout: ctx.resolve(info.layout),
        render_pass: ctx.resolve(info.render_pass),
        subpass: info.subpass,
        base_pipeline: ctx.resolve(info.base_pipeline),
        chain: resolve_chain(ctx, &info.chain),
    }
}

pub fn resolve_compute_pipeline(
    ctx: &LayerContext,
    info: &ComputePipelineCreateInfo<SurrogateId>,
) -> ComputePipelineCreateInfo<RealId> {
    ComputePipelineCreateInfo {
        flags: info.flags,
        stage: resolve_stage(ctx, &info.stage),
        layout: ctx.resolve(info.layout),
        base_pipeline: ctx.resolve(info.base_pipeline),
        chain: resolve_chain(ctx, &info.chain),
    }
}

pub fn resolve_ray_tracing_pipeline(
    ctx: &LayerContext,
    info: &RayTracingPipelineCreateInfo<SurrogateId>,
) -> RayTracingPipelineCreateInfo<RealId> {
    RayTracingPipelineCreateInfo {
        flags: info.flags,
        stages: info
            .stages
            .iter()
            .map(|stage| resolve_stage(ctx, stage))
            .collect(),
        groups: info.groups.clone(),
        max_recursion_depth: info.max_recursion_depth,
        library_info: info.library_info.as_ref().map(|li| PipelineLibraryInfo {
            libraries: li.libraries.iter().map(|&lib| ctx.resolve(lib)).collect(),
        }),
        layout: ctx.resolve(info.layout),
        base_pipeline: ctx.resolve(info.base_pipeline),
        chain: resolve_chain(ctx, &info.chain),
    }
}

// ── Other argument structures ───────────────────────────────

pub fn resolve_swapchain_create_info(
    ctx: &LayerContext,
    info: &SwapchainCreateInfo<SurrogateId>,
) -> SwapchainCreateInfo<RealId> {
    SwapchainCreateInfo {
        surface: ctx.resolve(info.surface),
        min_image_count: info.min_image_count,
        image_format: info.image_format,
        image_extent: info.image_extent,
        old_swapchain: ctx.resolve(info.old_swapchain),
    }
}

pub fn resolve_present_info(
    ctx: &LayerContext,
    info: &PresentInfo<SurrogateId>,
) -> PresentInfo<RealId> {
    PresentInfo {
        wait_semaphores: info
            .wait_semaphores
            .iter()
            .map(|&s| ctx.resolve(s))
            .collect(),
        swapchains: info.swapchains.iter().map(|&s| ctx.resolve(s)).collect(),
        image_indices: info.image_indices.clone(),
        // Fresh slots for the driver to fill; copied back after the call.
        results: info
            .results
            .as_ref()
            .map(|slots| vec![Status::Success; slots.len()]),
    }
}

pub fn resolve_set_allocate_info(
    ctx: &LayerContext,
    info: &DescriptorSetAllocateInfo<SurrogateId>,
) -> DescriptorSetAllocateInfo<RealId> {
    DescriptorSetAllocateInfo {
        pool: ctx.resolve(info.pool),
        set_layouts: info.set_layouts.iter().map(|&l| ctx.resolve(l)).collect(),
    }
}

pub fn resolve_template_description(
    ctx: &LayerContext,
    desc: &TemplateDescription<SurrogateId>,
) -> TemplateDescription<RealId> {
    TemplateDescription {
        entries: desc.entries.clone(),
        binding: match desc.binding {
            TemplateBinding::DescriptorSet { set_layout } => TemplateBinding::DescriptorSet {
                set_layout: ctx.resolve(set_layout),
            },
            TemplateBinding::PushDescriptors {
                pipeline_layout,
                set,
            } => TemplateBinding::PushDescriptors {
                pipeline_layout: ctx.resolve(pipeline_layout),
                set,
            },
        },
    }
}

// ── Output copy-back ────────────────────────────────────────

/// Copy driver-written per-swapchain results from the forwarded copy back
/// into the caller's structure.
pub fn copy_back_present_results(
    local: &PresentInfo<RealId>,
    caller: &mut PresentInfo<SurrogateId>,
) {
    if let (Some(local_results), Some(caller_results)) = (&local.results, caller.results.as_mut())
    {
        for (dst, src) in caller_results.iter_mut().zip(local_results) {
            *dst = *src;
        }
    }
}

/// Copy driver-written creation feedback from a forwarded chain back into
/// the caller's chain. Feedback nodes are paired in order; the forwarded
/// chain is a clone of the caller's, so the kinds line up.
pub fn copy_back_creation_feedback(
    local_chain: &[ExtensionNode<RealId>],
    caller_chain: &mut [ExtensionNode<SurrogateId>],
) {
    let mut locals = local_chain.iter().filter_map(|node| match node {
        ExtensionNode::CreationFeedback(feedback) => Some(feedback),
        _ => None,
    });
    for node in caller_chain.iter_mut() {
        if let ExtensionNode::CreationFeedback(dst) = node {
            if let Some(src) = locals.next() {
                *dst = src.clone();
            }
        }
    }
}

// ── Re-minting ──────────────────────────────────────────────

/// Wrap every real identity a creation call produced, strictly after the
/// underlying call reported (possibly partial) success. Null entries were
/// not produced and stay null.
pub fn wrap_outputs(
    ctx: &LayerContext,
    ty: ObjectType,
    reals: &[RealId],
) -> Result<Vec<SurrogateId>, CoreError> {
    let mut out = Vec::with_capacity(reals.len());
    for &real in reals {
        out.push(ctx.mint(ty, real)?);
    }
    Ok(out)
}

// ── Template-buffer flattening ──────────────────────────────

/// Flatten an application-supplied raw update buffer into a driver-ready
/// buffer: each described element is located at `offset + index * stride`,
/// decoded by its descriptor kind, identity-resolved, and written to the
/// same offset of a fresh buffer sized to the furthest byte any entry
/// touches. Entries are not assumed packed or ordered. Inline-block entries
/// are one verbatim byte span, not per-index elements. The returned buffer
/// belongs to the calling dispatch, which releases it after forwarding.
pub fn flatten_template_buffer(
    ctx: &LayerContext,
    entries: &[TemplateEntry],
    data: &[u8],
) -> Result<Vec<u8>, CoreError> {
    let mut allocation_size = 0usize;
    for entry in entries {
        match entry.descriptor_kind.element_size() {
            Some(size) => {
                for index in 0..entry.descriptor_count as usize {
                    let offset = entry.offset + index * entry.stride;
                    allocation_size = allocation_size.max(offset + size);
                }
            }
            None => {
                allocation_size =
                    allocation_size.max(entry.offset + entry.descriptor_count as usize);
            }
        }
    }

    let mut out = Vec::new();
    out.try_reserve_exact(allocation_size)
        .map_err(|_| CoreError::Exhausted {
            bytes: allocation_size,
        })?;
    out.resize(allocation_size, 0);

    for entry in entries {
        match entry.descriptor_kind {
            DescriptorKind::Sampler
            | DescriptorKind::CombinedImageSampler
            | DescriptorKind::SampledImage
            | DescriptorKind::StorageImage
            | DescriptorKind::InputAttachment => {
                for_each_element(entry, |offset| {
                    let mut element: ImageSamplerElement = read_element(data, offset)?;
                    element.sampler = ctx.resolve(SurrogateId(element.sampler)).0;
                    element.image_view = ctx.resolve(SurrogateId(element.image_view)).0;
                    write_element(&mut out, offset, &element);
                    Ok(())
                })?;
            }
            DescriptorKind::UniformBuffer
            | DescriptorKind::StorageBuffer
            | DescriptorKind::UniformBufferDynamic
            | DescriptorKind::StorageBufferDynamic => {
                for_each_element(entry, |offset| {
                    let mut element: BufferElement = read_element(data, offset)?;
                    element.buffer = ctx.resolve(SurrogateId(element.buffer)).0;
                    write_element(&mut out, offset, &element);
                    Ok(())
                })?;
            }
            DescriptorKind::UniformTexelBuffer | DescriptorKind::StorageTexelBuffer => {
                for_each_element(entry, |offset| {
                    let mut element: BufferViewElement = read_element(data, offset)?;
                    element.buffer_view = ctx.resolve(SurrogateId(element.buffer_view)).0;
                    write_element(&mut out, offset, &element);
                    Ok(())
                })?;
            }
            DescriptorKind::AccelerationStructure => {
                for_each_element(entry, |offset| {
                    let mut element: AccelerationStructureElement = read_element(data, offset)?;
                    element.acceleration_structure =
                        ctx.resolve(SurrogateId(element.acceleration_structure)).0;
                    write_element(&mut out, offset, &element);
                    Ok(())
                })?;
            }
            DescriptorKind::InlineUniformBlock => {
                let len = entry.descriptor_count as usize;
                let end = entry.offset + len;
                let src = data
                    .get(entry.offset..end)
                    .ok_or(CoreError::TemplateOutOfBounds {
                        offset: entry.offset,
                        need: len,
                        have: data.len(),
                    })?;
                out[entry.offset..end].copy_from_slice(src);
            }
        }
    }

    Ok(out)
}

fn for_each_element(
    entry: &TemplateEntry,
    mut f: impl FnMut(usize) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    for index in 0..entry.descriptor_count as usize {
        f(entry.offset + index * entry.stride)?;
    }
    Ok(())
}

fn read_element<T: Pod>(data: &[u8], offset: usize) -> Result<T, CoreError> {
    let size = std::mem::size_of::<T>();
    let bytes = data
        .get(offset..offset + size)
        .ok_or(CoreError::TemplateOutOfBounds {
            offset,
            need: size,
            have: data.len(),
        })?;
    Ok(bytemuck::pod_read_unaligned(bytes))
}

fn write_element<T: Pod>(out: &mut [u8], offset: usize, value: &T) {
    let bytes = bytemuck::bytes_of(value);
    out[offset..offset + bytes.len()].copy_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkshim_protocol::chain::CreationFeedback;
    use vkshim_protocol::types::{ColorBlendState, DepthStencilState, RenderingInfo};

    fn ctx_with(reals: &[u64]) -> (LayerContext, Vec<SurrogateId>) {
        let ctx = LayerContext::default();
        let surrogates = reals
            .iter()
            .map(|&r| ctx.identities.wrap_new(RealId(r)).unwrap())
            .collect();
        (ctx, surrogates)
    }

    #[test]
    fn chain_resolution_reaches_nested_arrays() {
        let (ctx, s) = ctx_with(&[0xA, 0xB, 0xC]);
        let chain = vec![
            ExtensionNode::PipelineLibraries {
                libraries: vec![s[0], s[1]],
            },
            ExtensionNode::ShaderGroups {
                groups: vec![ShaderGroup {
                    stages: vec![ShaderStage {
                        stage: 1,
                        module: s[2],
                        entry_point: "main".to_string(),
                    }],
                }],
                pipelines: vec![s[0]],
            },
        ];

        let resolved = resolve_chain(&ctx, &chain);
        match &resolved[0] {
            ExtensionNode::PipelineLibraries { libraries } => {
                assert_eq!(libraries, &vec![RealId(0xA), RealId(0xB)]);
            }
            other => panic!("unexpected node {other:?}"),
        }
        match &resolved[1] {
            ExtensionNode::ShaderGroups { groups, pipelines } => {
                assert_eq!(groups[0].stages[0].module, RealId(0xC));
                assert_eq!(pipelines, &vec![RealId(0xA)]);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn dynamic_rendering_overrides_pipeline_state_pruning() {
        let (ctx, s) = ctx_with(&[0x10, 0x11]);
        let info = GraphicsPipelineCreateInfo {
            flags: 0,
            stages: Vec::new(),
            viewport_state: None,
            color_blend_state: Some(ColorBlendState {
                logic_op_enable: false,
                attachments: Vec::new(),
            }),
            depth_stencil_state: Some(DepthStencilState {
                depth_test_enable: true,
                depth_write_enable: true,
                depth_compare_op: 3,
                stencil_test_enable: false,
            }),
            layout: s[0],
            render_pass: SurrogateId::NULL,
            subpass: 0,
            base_pipeline: s[1],
            chain: vec![ExtensionNode::Rendering(RenderingInfo {
                view_mask: 0,
                color_attachment_formats: vec![44],
                depth_attachment_format: 0,
                stencil_attachment_format: 0,
            })],
        };

        let local = resolve_graphics_pipeline(&ctx, &info);
        assert!(local.color_blend_state.is_some());
        assert!(local.depth_stencil_state.is_none());
        assert_eq!(local.layout, RealId(0x10));
        assert_eq!(local.base_pipeline, RealId(0x11));
        assert_eq!(local.render_pass, RealId::NULL);
    }

    #[test]
    fn feedback_copy_back_pairs_nodes_in_order() {
        let local_chain: Vec<ExtensionNode<RealId>> =
            vec![ExtensionNode::CreationFeedback(CreationFeedback {
                flags: 1,
                duration_ns: 42,
                stage_feedbacks: Vec::new(),
            })];
        let mut caller_chain: Vec<ExtensionNode<SurrogateId>> =
            vec![ExtensionNode::CreationFeedback(CreationFeedback::default())];

        copy_back_creation_feedback(&local_chain, &mut caller_chain);
        match &caller_chain[0] {
            ExtensionNode::CreationFeedback(feedback) => {
                assert_eq!(feedback.duration_ns, 42);
                assert_eq!(feedback.flags, 1);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn flatten_resolves_mixed_out_of_order_entries() {
        let (ctx, s) = ctx_with(&[0xAA, 0xBB, 0xCC, 0xDD]);
        // Layout: a buffer element at 64, an image pair at 0, a buffer view
        // at 128, inline bytes at 40. Deliberately not offset-ordered.
        let entries = vec![
            TemplateEntry {
                binding: 1,
                array_element: 0,
                descriptor_count: 1,
                descriptor_kind: DescriptorKind::StorageBuffer,
                offset: 64,
                stride: std::mem::size_of::<BufferElement>(),
            },
            TemplateEntry {
                binding: 0,
                array_element: 0,
                descriptor_count: 1,
                descriptor_kind: DescriptorKind::CombinedImageSampler,
                offset: 0,
                stride: std::mem::size_of::<ImageSamplerElement>(),
            },
            TemplateEntry {
                binding: 2,
                array_element: 0,
                descriptor_count: 1,
                descriptor_kind: DescriptorKind::UniformTexelBuffer,
                offset: 128,
                stride: std::mem::size_of::<BufferViewElement>(),
            },
            TemplateEntry {
                binding: 3,
                array_element: 0,
                descriptor_count: 8,
                descriptor_kind: DescriptorKind::InlineUniformBlock,
                offset: 40,
                stride: 0,
            },
        ];

        let mut data = vec![0u8; 136];
        write_element(
            &mut data,
            0,
            &ImageSamplerElement {
                sampler: s[0].0,
                image_view: s[1].0,
                image_layout: 5,
                _pad: 0,
            },
        );
        write_element(
            &mut data,
            64,
            &BufferElement {
                buffer: s[2].0,
                offset: 256,
                range: 512,
            },
        );
        write_element(&mut data, 128, &BufferViewElement { buffer_view: s[3].0 });
        data[40..48].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let flattened = flatten_template_buffer(&ctx, &entries, &data).unwrap();
        assert_eq!(flattened.len(), 136);

        let image: ImageSamplerElement = read_element(&flattened, 0).unwrap();
        assert_eq!(image.sampler, 0xAA);
        assert_eq!(image.image_view, 0xBB);
        assert_eq!(image.image_layout, 5);

        let buffer: BufferElement = read_element(&flattened, 64).unwrap();
        assert_eq!(buffer.buffer, 0xCC);
        assert_eq!(buffer.offset, 256);
        assert_eq!(buffer.range, 512);

        let view: BufferViewElement = read_element(&flattened, 128).unwrap();
        assert_eq!(view.buffer_view, 0xDD);

        assert_eq!(&flattened[40..48], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn flatten_walks_strided_arrays() {
        let (ctx, s) = ctx_with(&[1, 2, 3]);
        // Three buffer elements with a stride wider than the element.
        let stride = std::mem::size_of::<BufferElement>() + 8;
        let entries = vec![TemplateEntry {
            binding: 0,
            array_element: 0,
            descriptor_count: 3,
            descriptor_kind: DescriptorKind::UniformBuffer,
            offset: 16,
            stride,
        }];

        let mut data = vec![0u8; 16 + 3 * stride];
        for (index, surrogate) in s.iter().enumerate() {
            write_element(
                &mut data,
                16 + index * stride,
                &BufferElement {
                    buffer: surrogate.0,
                    offset: index as u64,
                    range: 64,
                },
            );
        }

        let flattened = flatten_template_buffer(&ctx, &entries, &data).unwrap();
        for index in 0..3 {
            let element: BufferElement = read_element(&flattened, 16 + index * stride).unwrap();
            assert_eq!(element.buffer, (index + 1) as u64);
            assert_eq!(element.offset, index as u64);
        }
    }

    #[test]
    fn flatten_rejects_truncated_input() {
        let ctx = LayerContext::default();
        let entries = vec![TemplateEntry {
            binding: 0,
            array_element: 0,
            descriptor_count: 1,
            descriptor_kind: DescriptorKind::UniformBuffer,
            offset: 8,
            stride: std::mem::size_of::<BufferElement>(),
        }];
        let data = vec![0u8; 8];
        assert!(matches!(
            flatten_template_buffer(&ctx, &entries, &data),
            Err(CoreError::TemplateOutOfBounds { .. })
        ));
    }

    #[test]
    fn flatten_treats_unknown_identities_as_null() {
        let ctx = LayerContext::default();
        let entries = vec![TemplateEntry {
            binding: 0,
            array_element: 0,
            descriptor_count: 1,
            descriptor_kind: DescriptorKind::UniformTexelBuffer,
            offset: 0,
            stride: std::mem::size_of::<BufferViewElement>(),
        }];
        let mut data = vec![0u8; std::mem::size_of::<BufferViewElement>()];
        write_element(&mut data, 0, &BufferViewElement { buffer_view: 0x777 });

        let flattened = flatten_template_buffer(&ctx, &entries, &data).unwrap();
        let view: BufferViewElement = read_element(&flattened, 0).unwrap();
        assert_eq!(view.buffer_view, 0);
    }
}
