use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use vkshim_protocol::types::{
    RenderPassDescription, RenderingInfo, TemplateDescription, FORMAT_UNDEFINED,
};
use vkshim_protocol::{RealId, SurrogateId};

/// Side table of per-object shadow state, keyed by the owner's surrogate
/// identity. Reads take the shared lock, structural changes the exclusive
/// lock; `erase` never cascades into other tables -- retiring member
/// identities is the caller's job, which keeps this table and the identity
/// map independently testable.
pub struct ShadowTable<T> {
    entries: RwLock<HashMap<SurrogateId, T>>,
}

impl<T> ShadowTable<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the entry for an owner.
    pub fn put(&self, owner: SurrogateId, entry: T) {
        self.entries.write().insert(owner, entry);
    }

    /// Remove the entry. Returns what was there, if anything.
    pub fn erase(&self, owner: SurrogateId) -> Option<T> {
        self.entries.write().remove(&owner)
    }
}

impl<T: Clone> ShadowTable<T> {
    /// Current entry for an owner. `None` means the owner was never
    /// registered, which is distinct from an owner registered with empty
    /// contents.
    pub fn get(&self, owner: SurrogateId) -> Option<T> {
        self.entries.read().get(&owner).cloned()
    }
}

impl<T: Default> ShadowTable<T> {
    /// In-place update under the exclusive lock. Owners seen for the first
    /// time start from an empty entry.
    pub fn mutate<R>(&self, owner: SurrogateId, f: impl FnOnce(&mut T) -> R) -> R {
        let mut entries = self.entries.write();
        f(entries.entry(owner).or_default())
    }
}

impl<T> Default for ShadowTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which subpasses of a render pass touch a color attachment and which touch
/// a depth-stencil attachment. Derived once at render pass creation and
/// consulted when a pipeline is later created against that pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPassUsage {
    pub color_subpasses: HashSet<u32>,
    pub depth_stencil_subpasses: HashSet<u32>,
}

impl RenderPassUsage {
    pub fn from_description(desc: &RenderPassDescription) -> Self {
        let mut usage = RenderPassUsage::default();
        for (index, subpass) in desc.subpasses.iter().enumerate() {
            let index = index as u32;

            let mut uses_color = subpass.color_attachments.iter().any(|r| !r.is_unused());
            // An unused color slot whose resolve attachment carries a foreign
            // memory format still produces color output through the resolve.
            if !uses_color {
                for reference in &subpass.resolve_attachments {
                    if reference.is_unused() {
                        continue;
                    }
                    let annotated = desc
                        .attachments
                        .get(reference.attachment as usize)
                        .is_some_and(|a| a.external_format.is_some());
                    if annotated {
                        uses_color = true;
                        break;
                    }
                }
            }
            if uses_color {
                usage.color_subpasses.insert(index);
            }

            let uses_depth_stencil = subpass
                .depth_stencil_attachment
                .is_some_and(|r| !r.is_unused());
            if uses_depth_stencil {
                usage.depth_stencil_subpasses.insert(index);
            }
        }
        usage
    }

    /// Dynamic rendering has exactly one implicit subpass.
    pub fn from_rendering_info(info: &RenderingInfo) -> Self {
        let mut usage = RenderPassUsage::default();
        if !info.color_attachment_formats.is_empty() {
            usage.color_subpasses.insert(0);
        }
        if info.depth_attachment_format != FORMAT_UNDEFINED
            || info.stencil_attachment_format != FORMAT_UNDEFINED
        {
            usage.depth_stencil_subpasses.insert(0);
        }
        usage
    }

    pub fn uses_color(&self, subpass: u32) -> bool {
        self.color_subpasses.contains(&subpass)
    }

    pub fn uses_depth_stencil(&self, subpass: u32) -> bool {
        self.depth_stencil_subpasses.contains(&subpass)
    }
}

/// The four per-category side tables of the layer.
///
/// - render pass -> per-subpass attachment usage
/// - update template -> its already-resolved creation description
/// - swapchain -> surrogate identities of its images, in query order
/// - descriptor pool -> surrogate identities of sets allocated from it
#[derive(Default)]
pub struct ShadowStateStore {
    pub render_passes: ShadowTable<RenderPassUsage>,
    pub templates: ShadowTable<TemplateDescription<RealId>>,
    pub swapchain_images: ShadowTable<Vec<SurrogateId>>,
    pub pool_sets: ShadowTable<HashSet<SurrogateId>>,
}

impl ShadowStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkshim_protocol::types::{
        AttachmentDescription, AttachmentReference, SubpassDescription,
    };

    fn attachment(external_format: Option<u64>) -> AttachmentDescription {
        AttachmentDescription {
            flags: 0,
            format: 44,
            samples: 1,
            load_op: 0,
            store_op: 0,
            external_format,
        }
    }

    fn reference(attachment: u32) -> AttachmentReference {
        AttachmentReference {
            attachment,
            layout: 2,
        }
    }

    #[test]
    fn classifies_color_and_depth_stencil_per_subpass() {
        let desc = RenderPassDescription {
            attachments: vec![attachment(None), attachment(None)],
            subpasses: vec![
                SubpassDescription {
                    depth_stencil_attachment: Some(reference(0)),
                    ..Default::default()
                },
                SubpassDescription {
                    color_attachments: vec![reference(1)],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let usage = RenderPassUsage::from_description(&desc);
        assert!(!usage.uses_color(0));
        assert!(usage.uses_depth_stencil(0));
        assert!(usage.uses_color(1));
        assert!(!usage.uses_depth_stencil(1));
    }

    #[test]
    fn unused_references_do_not_count() {
        let desc = RenderPassDescription {
            attachments: vec![attachment(None)],
            subpasses: vec![SubpassDescription {
                color_attachments: vec![AttachmentReference::UNUSED],
                depth_stencil_attachment: Some(AttachmentReference::UNUSED),
                ..Default::default()
            }],
            ..Default::default()
        };
        let usage = RenderPassUsage::from_description(&desc);
        assert!(usage.color_subpasses.is_empty());
        assert!(usage.depth_stencil_subpasses.is_empty());
    }

    #[test]
    fn foreign_format_resolve_counts_as_color() {
        let desc = RenderPassDescription {
            attachments: vec![attachment(None), attachment(Some(0x3231564e))],
            subpasses: vec![SubpassDescription {
                color_attachments: vec![AttachmentReference::UNUSED],
                resolve_attachments: vec![reference(1)],
                ..Default::default()
            }],
            ..Default::default()
        };
        let usage = RenderPassUsage::from_description(&desc);
        assert!(usage.uses_color(0));
    }

    #[test]
    fn plain_resolve_does_not_count_as_color() {
        let desc = RenderPassDescription {
            attachments: vec![attachment(None), attachment(None)],
            subpasses: vec![SubpassDescription {
                color_attachments: vec![AttachmentReference::UNUSED],
                resolve_attachments: vec![reference(1)],
                ..Default::default()
            }],
            ..Default::default()
        };
        let usage = RenderPassUsage::from_description(&desc);
        assert!(!usage.uses_color(0));
    }

    #[test]
    fn dynamic_rendering_classification() {
        let none = RenderingInfo {
            view_mask: 0,
            color_attachment_formats: Vec::new(),
            depth_attachment_format: FORMAT_UNDEFINED,
            stencil_attachment_format: FORMAT_UNDEFINED,
        };
        let usage = RenderPassUsage::from_rendering_info(&none);
        assert!(!usage.uses_color(0));
        assert!(!usage.uses_depth_stencil(0));

        let stencil_only = RenderingInfo {
            stencil_attachment_format: 9,
            ..none.clone()
        };
        let usage = RenderPassUsage::from_rendering_info(&stencil_only);
        assert!(!usage.uses_color(0));
        assert!(usage.uses_depth_stencil(0));
    }

    #[test]
    fn mutate_starts_from_empty_entry() {
        let table: ShadowTable<Vec<SurrogateId>> = ShadowTable::new();
        let owner = SurrogateId(0x2000);
        table.mutate(owner, |list| list.push(SurrogateId(1)));
        table.mutate(owner, |list| list.push(SurrogateId(2)));
        assert_eq!(
            table.get(owner),
            Some(vec![SurrogateId(1), SurrogateId(2)])
        );
    }

    #[test]
    fn absent_is_distinct_from_empty() {
        let table: ShadowTable<Vec<SurrogateId>> = ShadowTable::new();
        let owner = SurrogateId(0x2000);
        assert_eq!(table.get(owner), None);
        table.put(owner, Vec::new());
        assert_eq!(table.get(owner), Some(Vec::new()));
        assert_eq!(table.erase(owner), Some(Vec::new()));
        assert_eq!(table.get(owner), None);
    }
}
