use serde::{Deserialize, Serialize};

/// The identity a client holds for an object. Minted by the layer; opaque to
/// both sides. Never equal to a live [`RealId`] bit pattern by contract, only
/// by coincidence -- the two spaces are kept apart at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurrogateId(pub u64);

/// The identity the underlying implementation assigned to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RealId(pub u64);

impl SurrogateId {
    pub const NULL: SurrogateId = SurrogateId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl RealId {
    pub const NULL: RealId = RealId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Object category tag, carried alongside identities for logging and
/// diagnostics. The identity maps themselves are untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    RenderPass,
    Framebuffer,
    ShaderModule,
    Pipeline,
    PipelineCache,
    PipelineLayout,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    DescriptorUpdateTemplate,
    Sampler,
    Image,
    ImageView,
    Buffer,
    BufferView,
    AccelerationStructure,
    Semaphore,
    Surface,
    Swapchain,
    DeferredOperation,
    Display,
    DisplayMode,
}
