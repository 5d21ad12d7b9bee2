//! Typed views of the enums and flag sets carried in wire fields.
//!
//! Values that only the native backend interprets (texture formats, load ops,
//! compare functions, ...) stay raw `u32`s on the wire. The types here are the
//! ones the protocol itself needs to understand.

use bitflags::bitflags;

/// Outcome of an asynchronous request.
///
/// Unknown wire values decode as [`RequestStatus::Unknown`] rather than
/// failing; a newer peer may report statuses this build does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestStatus {
    Success = 0,
    Error = 1,
    Unknown = 2,
    DeviceLost = 3,
    Aborted = 4,
}

impl RequestStatus {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::Error,
            3 => Self::DeviceLost,
            4 => Self::Aborted,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorType {
    NoError = 0,
    Validation = 1,
    OutOfMemory = 2,
    Internal = 3,
    Unknown = 4,
    DeviceLost = 5,
}

impl ErrorType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::Validation,
            2 => Self::OutOfMemory,
            3 => Self::Internal,
            5 => Self::DeviceLost,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Filter passed to `DevicePushErrorScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorFilter {
    Validation = 0,
    OutOfMemory = 1,
    Internal = 2,
}

impl ErrorFilter {
    /// `None` for values outside the known filters; the native backend decides
    /// how to report those.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Validation),
            1 => Some(Self::OutOfMemory),
            2 => Some(Self::Internal),
            _ => None,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceLostReason {
    Unknown = 0,
    Destroyed = 1,
    ConnectionLost = 2,
}

impl DeviceLostReason {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Destroyed,
            2 => Self::ConnectionLost,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum LoggingLevel {
    Verbose = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LoggingLevel {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Verbose,
            1 => Self::Info,
            2 => Self::Warning,
            _ => Self::Error,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CompilationMessageType {
    Error = 0,
    Warning = 1,
    Info = 2,
}

impl CompilationMessageType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Warning,
            2 => Self::Info,
            _ => Self::Error,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// One diagnostic produced while compiling a shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub message: String,
    pub kind: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PowerPreference {
    #[default]
    Undefined = 0,
    LowPower = 1,
    HighPerformance = 2,
}

impl PowerPreference {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::LowPower,
            2 => Self::HighPerformance,
            _ => Self::Undefined,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Options for `InstanceRequestAdapter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestAdapterOptions {
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AdapterType {
    DiscreteGpu = 0,
    IntegratedGpu = 1,
    Cpu = 2,
    Unknown = 3,
}

impl AdapterType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::DiscreteGpu,
            1 => Self::IntegratedGpu,
            2 => Self::Cpu,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Optional device capabilities.
///
/// Features a peer reports that this build does not know decode as
/// [`FeatureName::Unknown`]; the client leaves them out of the lists it hands
/// to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum FeatureName {
    Unknown = 0,
    DepthClipControl = 1,
    Depth32FloatStencil8 = 2,
    TimestampQuery = 3,
    TextureCompressionBc = 4,
    TextureCompressionEtc2 = 5,
    TextureCompressionAstc = 6,
    IndirectFirstInstance = 7,
    ShaderF16 = 8,
}

impl FeatureName {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::DepthClipControl,
            2 => Self::Depth32FloatStencil8,
            3 => Self::TimestampQuery,
            4 => Self::TextureCompressionBc,
            5 => Self::TextureCompressionEtc2,
            6 => Self::TextureCompressionAstc,
            7 => Self::IndirectFirstInstance,
            8 => Self::ShaderF16,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Adapter identity reported by `InstanceRequestAdapter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProperties {
    pub vendor_id: u32,
    pub device_id: u32,
    pub name: String,
    pub driver_description: String,
    pub adapter_type: AdapterType,
    /// Backend-defined; the wire does not interpret it.
    pub backend_type: u32,
}

/// Limits of an adapter or device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedLimits {
    pub max_texture_dimension_1d: u32,
    pub max_texture_dimension_2d: u32,
    pub max_texture_dimension_3d: u32,
    pub max_bind_groups: u32,
    pub max_buffer_size: u64,
    pub max_compute_workgroups_per_dimension: u32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsages: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
        const INDIRECT = 1 << 8;
        const QUERY_RESOLVE = 1 << 9;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsages: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}
