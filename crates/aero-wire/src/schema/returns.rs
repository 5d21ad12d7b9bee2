//! Return commands (server to client).
//!
//! These carry raw handles only; the client looks them up itself and ignores
//! callbacks for objects it has already released.

use super::commands::FEATURE_NAME;
use super::StructLayout;

static DEVICE_LOST: StructLayout = layout!("DeviceLost" {
    reason: u32,
    message: string,
});

static DEVICE_UNCAPTURED_ERROR: StructLayout = layout!("DeviceUncapturedError" {
    error_type: u32,
    message: string,
});

static DEVICE_LOGGING: StructLayout = layout!("DeviceLogging" {
    level: u32,
    message: string,
});

static BUFFER_MAP_ASYNC_CALLBACK: StructLayout = layout!("BufferMapAsyncCallback" {
    buffer: handle,
    request_serial: u64,
    status: u32,
    data: bytes,
});

static QUEUE_WORK_DONE_CALLBACK: StructLayout = layout!("QueueWorkDoneCallback" {
    request_serial: u64,
    status: u32,
});

static CREATE_COMPUTE_PIPELINE_ASYNC_CALLBACK: StructLayout = layout!("CreateComputePipelineAsyncCallback" {
    request_serial: u64,
    status: u32,
    message: string,
});

static CREATE_RENDER_PIPELINE_ASYNC_CALLBACK: StructLayout = layout!("CreateRenderPipelineAsyncCallback" {
    request_serial: u64,
    status: u32,
    message: string,
});

static POP_ERROR_SCOPE_CALLBACK: StructLayout = layout!("PopErrorScopeCallback" {
    request_serial: u64,
    status: u32,
    error_type: u32,
    message: string,
});

static COMPILATION_MESSAGE: StructLayout = layout!("CompilationMessage" {
    message: string,
    kind: u32,
    line_num: u64,
    line_pos: u64,
    offset: u64,
    length: u64,
});

static SHADER_MODULE_GET_COMPILATION_INFO_CALLBACK: StructLayout = layout!("ShaderModuleGetCompilationInfoCallback" {
    module: handle,
    request_serial: u64,
    status: u32,
    messages: array(COMPILATION_MESSAGE),
});

static ADAPTER_PROPERTIES: StructLayout = layout!("AdapterProperties" {
    vendor_id: u32,
    device_id: u32,
    name: string,
    driver_description: string,
    adapter_type: u32,
    backend_type: u32,
});

static SUPPORTED_LIMITS: StructLayout = layout!("SupportedLimits" {
    max_texture_dimension_1d: u32,
    max_texture_dimension_2d: u32,
    max_texture_dimension_3d: u32,
    max_bind_groups: u32,
    max_buffer_size: u64,
    max_compute_workgroups_per_dimension: u32,
});

/// Properties and limits are present on success only.
static INSTANCE_REQUEST_ADAPTER_CALLBACK: StructLayout = layout!("InstanceRequestAdapterCallback" {
    request_serial: u64,
    status: u32,
    message: string,
    properties: optional_struct(ADAPTER_PROPERTIES),
    limits: optional_struct(SUPPORTED_LIMITS),
    features: array(FEATURE_NAME),
});

static ADAPTER_REQUEST_DEVICE_CALLBACK: StructLayout = layout!("AdapterRequestDeviceCallback" {
    adapter: handle,
    request_serial: u64,
    status: u32,
    message: string,
    limits: optional_struct(SUPPORTED_LIMITS),
    features: array(FEATURE_NAME),
});

command_table! {
    /// Every command the server can send back.
    pub enum ReturnKind {
        DeviceLost = 0 => DEVICE_LOST,
        DeviceUncapturedError = 1 => DEVICE_UNCAPTURED_ERROR,
        DeviceLogging = 2 => DEVICE_LOGGING,
        BufferMapAsyncCallback = 3 => BUFFER_MAP_ASYNC_CALLBACK,
        QueueWorkDoneCallback = 4 => QUEUE_WORK_DONE_CALLBACK,
        CreateComputePipelineAsyncCallback = 5 => CREATE_COMPUTE_PIPELINE_ASYNC_CALLBACK,
        CreateRenderPipelineAsyncCallback = 6 => CREATE_RENDER_PIPELINE_ASYNC_CALLBACK,
        PopErrorScopeCallback = 7 => POP_ERROR_SCOPE_CALLBACK,
        ShaderModuleGetCompilationInfoCallback = 8 => SHADER_MODULE_GET_COMPILATION_INFO_CALLBACK,
        InstanceRequestAdapterCallback = 9 => INSTANCE_REQUEST_ADAPTER_CALLBACK,
        AdapterRequestDeviceCallback = 10 => ADAPTER_REQUEST_DEVICE_CALLBACK,
    }
}
