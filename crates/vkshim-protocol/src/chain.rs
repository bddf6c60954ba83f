use serde::{Deserialize, Serialize};

use crate::types::{RenderingInfo, ShaderStage};

/// One node of the auxiliary-structure chain attached to a primary argument
/// structure. Each variant corresponds to one extension structure kind; code
/// that resolves or copies chains matches exhaustively so a new variant is a
/// compile error everywhere it matters, not a runtime assert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtensionNode<H> {
    /// Dynamic-rendering attachment formats for a pipeline created without a
    /// render pass object.
    Rendering(RenderingInfo),
    /// Pipeline libraries linked into the pipeline being created.
    PipelineLibraries { libraries: Vec<H> },
    /// Shader groups assembled from fresh stages and from already-created
    /// pipelines.
    ShaderGroups {
        groups: Vec<ShaderGroup<H>>,
        pipelines: Vec<H>,
    },
    /// Driver-filled creation timing feedback. Output-only: the layer copies
    /// it from its forwarded copy back into the caller's chain.
    CreationFeedback(CreationFeedback),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderGroup<H> {
    pub stages: Vec<ShaderStage<H>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreationFeedback {
    pub flags: u32,
    pub duration_ns: u64,
    pub stage_feedbacks: Vec<StageFeedback>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageFeedback {
    pub flags: u32,
    pub duration_ns: u64,
}

impl<H> ExtensionNode<H> {
    /// Find the first dynamic-rendering node in a chain.
    pub fn find_rendering(chain: &[ExtensionNode<H>]) -> Option<&RenderingInfo> {
        chain.iter().find_map(|node| match node {
            ExtensionNode::Rendering(info) => Some(info),
            _ => None,
        })
    }
}
