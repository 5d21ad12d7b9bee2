use core::fmt;

use crate::error::{WireError, WireResult};

/// Identifies one object instance on one side of the channel.
///
/// Id `0` is the null handle. A live id is bound to exactly one generation;
/// once released, the id comes back only with a larger generation so late
/// references to the old object are detected as stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    pub id: u32,
    pub generation: u32,
}

impl Handle {
    pub const NULL: Handle = Handle {
        id: 0,
        generation: 0,
    };

    /// Encoded size: id then generation, both little-endian `u32`.
    pub const WIRE_SIZE: usize = 8;

    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    pub const fn is_null(self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.generation)
    }
}

/// Object kinds with their own id space.
///
/// The instance and the device queue are implicit in the channel and never
/// named by handle. Adapters and devices are obtained through asynchronous
/// requests; device-level commands act on the channel's device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ObjectType {
    Buffer = 0,
    Texture = 1,
    TextureView = 2,
    Sampler = 3,
    ShaderModule = 4,
    BindGroupLayout = 5,
    BindGroup = 6,
    PipelineLayout = 7,
    ComputePipeline = 8,
    RenderPipeline = 9,
    CommandEncoder = 10,
    CommandBuffer = 11,
    RenderPassEncoder = 12,
    ComputePassEncoder = 13,
    Adapter = 14,
    Device = 15,
}

impl ObjectType {
    pub const COUNT: usize = 16;

    pub const ALL: [ObjectType; Self::COUNT] = [
        ObjectType::Buffer,
        ObjectType::Texture,
        ObjectType::TextureView,
        ObjectType::Sampler,
        ObjectType::ShaderModule,
        ObjectType::BindGroupLayout,
        ObjectType::BindGroup,
        ObjectType::PipelineLayout,
        ObjectType::ComputePipeline,
        ObjectType::RenderPipeline,
        ObjectType::CommandEncoder,
        ObjectType::CommandBuffer,
        ObjectType::RenderPassEncoder,
        ObjectType::ComputePassEncoder,
        ObjectType::Adapter,
        ObjectType::Device,
    ];

    pub fn from_u32(value: u32) -> WireResult<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(WireError::UnknownObjectType(value))
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Buffer => "Buffer",
            ObjectType::Texture => "Texture",
            ObjectType::TextureView => "TextureView",
            ObjectType::Sampler => "Sampler",
            ObjectType::ShaderModule => "ShaderModule",
            ObjectType::BindGroupLayout => "BindGroupLayout",
            ObjectType::BindGroup => "BindGroup",
            ObjectType::PipelineLayout => "PipelineLayout",
            ObjectType::ComputePipeline => "ComputePipeline",
            ObjectType::RenderPipeline => "RenderPipeline",
            ObjectType::CommandEncoder => "CommandEncoder",
            ObjectType::CommandBuffer => "CommandBuffer",
            ObjectType::RenderPassEncoder => "RenderPassEncoder",
            ObjectType::ComputePassEncoder => "ComputePassEncoder",
            ObjectType::Adapter => "Adapter",
            ObjectType::Device => "Device",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
