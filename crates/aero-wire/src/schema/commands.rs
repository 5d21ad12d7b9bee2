//! Forward commands (client to server).
//!
//! Asynchronous commands carry a `request_serial` field that the matching
//! return command echoes back.

use super::{CommandSchema, StructLayout};

static DESTROY_OBJECT: StructLayout = layout!("DestroyObject" {
    object_type: u32,
    object: handle,
});

static SET_LABEL: StructLayout = layout!("SetLabel" {
    object_type: u32,
    object: handle,
    label: string,
});

static CREATE_BUFFER: StructLayout = layout!("CreateBuffer" {
    result: new(Buffer),
    label: string,
});

static BUFFER_STORAGE: StructLayout = layout!("BufferStorage" {
    buffer: object(Buffer),
    size: u64,
    usage: u32,
    mapped_at_creation: bool,
});

static BUFFER_MAP_ASYNC: StructLayout = layout!("BufferMapAsync" {
    buffer: object(Buffer),
    request_serial: u64,
    mode: u32,
    offset: u64,
    size: u64,
});

static BUFFER_UPDATE_MAPPED_DATA: StructLayout = layout!("BufferUpdateMappedData" {
    buffer: object(Buffer),
    offset: u64,
    data: bytes,
});

static BUFFER_UNMAP: StructLayout = layout!("BufferUnmap" {
    buffer: object(Buffer),
});

static BUFFER_DESTROY: StructLayout = layout!("BufferDestroy" {
    buffer: object(Buffer),
});

static VIEW_FORMAT: StructLayout = layout!("ViewFormat" {
    format: u32,
});

static CREATE_TEXTURE: StructLayout = layout!("CreateTexture" {
    result: new(Texture),
    label: string,
    width: u32,
    height: u32,
    depth_or_array_layers: u32,
    mip_level_count: u32,
    sample_count: u32,
    dimension: u32,
    format: u32,
    usage: u32,
    view_formats: array(VIEW_FORMAT),
});

static TEXTURE_CREATE_VIEW: StructLayout = layout!("TextureCreateView" {
    texture: object(Texture),
    result: new(TextureView),
    label: string,
    format: u32,
    dimension: u32,
    aspect: u32,
    base_mip_level: u32,
    mip_level_count: u32,
    base_array_layer: u32,
    array_layer_count: u32,
});

static TEXTURE_DESTROY: StructLayout = layout!("TextureDestroy" {
    texture: object(Texture),
});

static CREATE_SAMPLER: StructLayout = layout!("CreateSampler" {
    result: new(Sampler),
    label: string,
    address_mode_u: u32,
    address_mode_v: u32,
    address_mode_w: u32,
    mag_filter: u32,
    min_filter: u32,
    mipmap_filter: u32,
    lod_min_clamp: f32,
    lod_max_clamp: f32,
    compare: u32,
    max_anisotropy: u16,
});

static CREATE_SHADER_MODULE: StructLayout = layout!("CreateShaderModule" {
    result: new(ShaderModule),
    label: string,
    code: string,
});

static SHADER_MODULE_GET_COMPILATION_INFO: StructLayout = layout!("ShaderModuleGetCompilationInfo" {
    module: object(ShaderModule),
    request_serial: u64,
});

static BIND_GROUP_LAYOUT_ENTRY: StructLayout = layout!("BindGroupLayoutEntry" {
    binding: u32,
    visibility: u32,
    binding_type: u32,
    has_dynamic_offset: bool,
    min_binding_size: u64,
});

static CREATE_BIND_GROUP_LAYOUT: StructLayout = layout!("CreateBindGroupLayout" {
    result: new(BindGroupLayout),
    label: string,
    entries: array(BIND_GROUP_LAYOUT_ENTRY),
});

static BIND_GROUP_ENTRY: StructLayout = layout!("BindGroupEntry" {
    binding: u32,
    buffer: optional(Buffer),
    offset: u64,
    size: u64,
    sampler: optional(Sampler),
    texture_view: optional(TextureView),
});

static CREATE_BIND_GROUP: StructLayout = layout!("CreateBindGroup" {
    result: new(BindGroup),
    label: string,
    layout: object(BindGroupLayout),
    entries: array(BIND_GROUP_ENTRY),
});

static PIPELINE_LAYOUT_ENTRY: StructLayout = layout!("PipelineLayoutEntry" {
    layout: object(BindGroupLayout),
});

static CREATE_PIPELINE_LAYOUT: StructLayout = layout!("CreatePipelineLayout" {
    result: new(PipelineLayout),
    label: string,
    bind_group_layouts: array(PIPELINE_LAYOUT_ENTRY),
});

static CONSTANT_ENTRY: StructLayout = layout!("ConstantEntry" {
    key: string,
    value: f64,
});

static CREATE_COMPUTE_PIPELINE: StructLayout = layout!("CreateComputePipeline" {
    result: new(ComputePipeline),
    label: string,
    layout: optional(PipelineLayout),
    module: object(ShaderModule),
    entry_point: string,
    constants: array(CONSTANT_ENTRY),
});

static CREATE_COMPUTE_PIPELINE_ASYNC: StructLayout = layout!("CreateComputePipelineAsync" {
    request_serial: u64,
    result: new(ComputePipeline),
    label: string,
    layout: optional(PipelineLayout),
    module: object(ShaderModule),
    entry_point: string,
    constants: array(CONSTANT_ENTRY),
});

static VERTEX_ATTRIBUTE: StructLayout = layout!("VertexAttribute" {
    format: u32,
    offset: u64,
    shader_location: u32,
});

static VERTEX_BUFFER_LAYOUT: StructLayout = layout!("VertexBufferLayout" {
    array_stride: u64,
    step_mode: u32,
    attributes: array(VERTEX_ATTRIBUTE),
});

static DEPTH_STENCIL_STATE: StructLayout = layout!("DepthStencilState" {
    format: u32,
    depth_write_enabled: bool,
    depth_compare: u32,
});

static COLOR_TARGET_STATE: StructLayout = layout!("ColorTargetState" {
    format: u32,
    write_mask: u32,
});

static FRAGMENT_STATE: StructLayout = layout!("FragmentState" {
    module: object(ShaderModule),
    entry_point: string,
    targets: array(COLOR_TARGET_STATE),
});

static CREATE_RENDER_PIPELINE: StructLayout = layout!("CreateRenderPipeline" {
    result: new(RenderPipeline),
    label: string,
    layout: optional(PipelineLayout),
    vertex_module: object(ShaderModule),
    vertex_entry_point: string,
    vertex_buffers: array(VERTEX_BUFFER_LAYOUT),
    primitive_topology: u32,
    strip_index_format: u32,
    front_face: u32,
    cull_mode: u32,
    depth_stencil: optional_struct(DEPTH_STENCIL_STATE),
    sample_count: u32,
    sample_mask: u32,
    fragment: optional_struct(FRAGMENT_STATE),
});

static CREATE_RENDER_PIPELINE_ASYNC: StructLayout = layout!("CreateRenderPipelineAsync" {
    request_serial: u64,
    result: new(RenderPipeline),
    label: string,
    layout: optional(PipelineLayout),
    vertex_module: object(ShaderModule),
    vertex_entry_point: string,
    vertex_buffers: array(VERTEX_BUFFER_LAYOUT),
    primitive_topology: u32,
    strip_index_format: u32,
    front_face: u32,
    cull_mode: u32,
    depth_stencil: optional_struct(DEPTH_STENCIL_STATE),
    sample_count: u32,
    sample_mask: u32,
    fragment: optional_struct(FRAGMENT_STATE),
});

static RENDER_PIPELINE_GET_BIND_GROUP_LAYOUT: StructLayout = layout!("RenderPipelineGetBindGroupLayout" {
    pipeline: object(RenderPipeline),
    group_index: u32,
    result: new(BindGroupLayout),
});

static COMPUTE_PIPELINE_GET_BIND_GROUP_LAYOUT: StructLayout = layout!("ComputePipelineGetBindGroupLayout" {
    pipeline: object(ComputePipeline),
    group_index: u32,
    result: new(BindGroupLayout),
});

static CREATE_COMMAND_ENCODER: StructLayout = layout!("CreateCommandEncoder" {
    result: new(CommandEncoder),
    label: string,
});

static COLOR_ATTACHMENT: StructLayout = layout!("RenderPassColorAttachment" {
    view: optional(TextureView),
    resolve_target: optional(TextureView),
    load_op: u32,
    store_op: u32,
    clear_r: f64,
    clear_g: f64,
    clear_b: f64,
    clear_a: f64,
});

static DEPTH_STENCIL_ATTACHMENT: StructLayout = layout!("RenderPassDepthStencilAttachment" {
    view: object(TextureView),
    depth_load_op: u32,
    depth_store_op: u32,
    depth_clear_value: f32,
    depth_read_only: bool,
    stencil_load_op: u32,
    stencil_store_op: u32,
    stencil_clear_value: u32,
    stencil_read_only: bool,
});

static COMMAND_ENCODER_BEGIN_RENDER_PASS: StructLayout = layout!("CommandEncoderBeginRenderPass" {
    encoder: object(CommandEncoder),
    result: new(RenderPassEncoder),
    label: string,
    color_attachments: array(COLOR_ATTACHMENT),
    depth_stencil_attachment: optional_struct(DEPTH_STENCIL_ATTACHMENT),
});

static COMMAND_ENCODER_BEGIN_COMPUTE_PASS: StructLayout = layout!("CommandEncoderBeginComputePass" {
    encoder: object(CommandEncoder),
    result: new(ComputePassEncoder),
    label: string,
});

static COMMAND_ENCODER_COPY_BUFFER_TO_BUFFER: StructLayout = layout!("CommandEncoderCopyBufferToBuffer" {
    encoder: object(CommandEncoder),
    source: object(Buffer),
    source_offset: u64,
    destination: object(Buffer),
    destination_offset: u64,
    size: u64,
});

static COMMAND_ENCODER_CLEAR_BUFFER: StructLayout = layout!("CommandEncoderClearBuffer" {
    encoder: object(CommandEncoder),
    buffer: object(Buffer),
    offset: u64,
    size: u64,
});

static COMMAND_ENCODER_FINISH: StructLayout = layout!("CommandEncoderFinish" {
    encoder: object(CommandEncoder),
    result: new(CommandBuffer),
    label: string,
});

static RENDER_PASS_SET_PIPELINE: StructLayout = layout!("RenderPassSetPipeline" {
    pass: object(RenderPassEncoder),
    pipeline: object(RenderPipeline),
});

static DYNAMIC_OFFSET: StructLayout = layout!("DynamicOffset" {
    offset: u32,
});

static RENDER_PASS_SET_BIND_GROUP: StructLayout = layout!("RenderPassSetBindGroup" {
    pass: object(RenderPassEncoder),
    group_index: u32,
    group: optional(BindGroup),
    dynamic_offsets: array(DYNAMIC_OFFSET),
});

static RENDER_PASS_SET_VERTEX_BUFFER: StructLayout = layout!("RenderPassSetVertexBuffer" {
    pass: object(RenderPassEncoder),
    slot: u32,
    buffer: optional(Buffer),
    offset: u64,
    size: u64,
});

static RENDER_PASS_SET_INDEX_BUFFER: StructLayout = layout!("RenderPassSetIndexBuffer" {
    pass: object(RenderPassEncoder),
    buffer: object(Buffer),
    format: u32,
    offset: u64,
    size: u64,
});

static RENDER_PASS_SET_VIEWPORT: StructLayout = layout!("RenderPassSetViewport" {
    pass: object(RenderPassEncoder),
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    min_depth: f32,
    max_depth: f32,
});

static RENDER_PASS_SET_SCISSOR_RECT: StructLayout = layout!("RenderPassSetScissorRect" {
    pass: object(RenderPassEncoder),
    x: u32,
    y: u32,
    width: u32,
    height: u32,
});

static RENDER_PASS_DRAW: StructLayout = layout!("RenderPassDraw" {
    pass: object(RenderPassEncoder),
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
});

static RENDER_PASS_DRAW_INDEXED: StructLayout = layout!("RenderPassDrawIndexed" {
    pass: object(RenderPassEncoder),
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    base_vertex: i32,
    first_instance: u32,
});

static RENDER_PASS_END: StructLayout = layout!("RenderPassEnd" {
    pass: object(RenderPassEncoder),
});

static COMPUTE_PASS_SET_PIPELINE: StructLayout = layout!("ComputePassSetPipeline" {
    pass: object(ComputePassEncoder),
    pipeline: object(ComputePipeline),
});

static COMPUTE_PASS_SET_BIND_GROUP: StructLayout = layout!("ComputePassSetBindGroup" {
    pass: object(ComputePassEncoder),
    group_index: u32,
    group: optional(BindGroup),
    dynamic_offsets: array(DYNAMIC_OFFSET),
});

static COMPUTE_PASS_DISPATCH_WORKGROUPS: StructLayout = layout!("ComputePassDispatchWorkgroups" {
    pass: object(ComputePassEncoder),
    x: u32,
    y: u32,
    z: u32,
});

static COMPUTE_PASS_END: StructLayout = layout!("ComputePassEnd" {
    pass: object(ComputePassEncoder),
});

static SUBMITTED_COMMAND_BUFFER: StructLayout = layout!("SubmittedCommandBuffer" {
    command_buffer: object(CommandBuffer),
});

static QUEUE_SUBMIT: StructLayout = layout!("QueueSubmit" {
    command_buffers: array(SUBMITTED_COMMAND_BUFFER),
});

static QUEUE_WRITE_BUFFER: StructLayout = layout!("QueueWriteBuffer" {
    buffer: object(Buffer),
    offset: u64,
    data: bytes,
});

static QUEUE_WRITE_TEXTURE: StructLayout = layout!("QueueWriteTexture" {
    texture: object(Texture),
    mip_level: u32,
    origin_x: u32,
    origin_y: u32,
    origin_z: u32,
    aspect: u32,
    data: bytes,
    offset: u64,
    bytes_per_row: u32,
    rows_per_image: u32,
    width: u32,
    height: u32,
    depth_or_array_layers: u32,
});

static QUEUE_ON_SUBMITTED_WORK_DONE: StructLayout = layout!("QueueOnSubmittedWorkDone" {
    request_serial: u64,
});

static DEVICE_PUSH_ERROR_SCOPE: StructLayout = layout!("DevicePushErrorScope" {
    filter: u32,
});

static DEVICE_POP_ERROR_SCOPE: StructLayout = layout!("DevicePopErrorScope" {
    request_serial: u64,
});

static DEVICE_INJECT_ERROR: StructLayout = layout!("DeviceInjectError" {
    error_type: u32,
    message: string,
});

static DEVICE_TICK: StructLayout = layout!("DeviceTick" {});

static DEVICE_DESTROY: StructLayout = layout!("DeviceDestroy" {});

static INSTANCE_REQUEST_ADAPTER: StructLayout = layout!("InstanceRequestAdapter" {
    request_serial: u64,
    result: new(Adapter),
    power_preference: u32,
    force_fallback_adapter: bool,
});

pub(super) static FEATURE_NAME: StructLayout = layout!("FeatureName" {
    feature: u32,
});

static ADAPTER_REQUEST_DEVICE: StructLayout = layout!("AdapterRequestDevice" {
    adapter: object(Adapter),
    request_serial: u64,
    result: new(Device),
    label: string,
    required_features: array(FEATURE_NAME),
});

static COMMAND_ENCODER_COPY_BUFFER_TO_TEXTURE: StructLayout = layout!("CommandEncoderCopyBufferToTexture" {
    encoder: object(CommandEncoder),
    source: object(Buffer),
    source_offset: u64,
    source_bytes_per_row: u32,
    source_rows_per_image: u32,
    destination: object(Texture),
    destination_mip_level: u32,
    destination_origin_x: u32,
    destination_origin_y: u32,
    destination_origin_z: u32,
    destination_aspect: u32,
    width: u32,
    height: u32,
    depth_or_array_layers: u32,
});

static COMMAND_ENCODER_COPY_TEXTURE_TO_BUFFER: StructLayout = layout!("CommandEncoderCopyTextureToBuffer" {
    encoder: object(CommandEncoder),
    source: object(Texture),
    source_mip_level: u32,
    source_origin_x: u32,
    source_origin_y: u32,
    source_origin_z: u32,
    source_aspect: u32,
    destination: object(Buffer),
    destination_offset: u64,
    destination_bytes_per_row: u32,
    destination_rows_per_image: u32,
    width: u32,
    height: u32,
    depth_or_array_layers: u32,
});

static COMMAND_ENCODER_COPY_TEXTURE_TO_TEXTURE: StructLayout = layout!("CommandEncoderCopyTextureToTexture" {
    encoder: object(CommandEncoder),
    source: object(Texture),
    source_mip_level: u32,
    source_origin_x: u32,
    source_origin_y: u32,
    source_origin_z: u32,
    source_aspect: u32,
    destination: object(Texture),
    destination_mip_level: u32,
    destination_origin_x: u32,
    destination_origin_y: u32,
    destination_origin_z: u32,
    destination_aspect: u32,
    width: u32,
    height: u32,
    depth_or_array_layers: u32,
});

static COMMAND_ENCODER_PUSH_DEBUG_GROUP: StructLayout = layout!("CommandEncoderPushDebugGroup" {
    encoder: object(CommandEncoder),
    group_label: string,
});

static COMMAND_ENCODER_POP_DEBUG_GROUP: StructLayout = layout!("CommandEncoderPopDebugGroup" {
    encoder: object(CommandEncoder),
});

static COMMAND_ENCODER_INSERT_DEBUG_MARKER: StructLayout = layout!("CommandEncoderInsertDebugMarker" {
    encoder: object(CommandEncoder),
    marker_label: string,
});

static COMPUTE_PASS_PUSH_DEBUG_GROUP: StructLayout = layout!("ComputePassPushDebugGroup" {
    pass: object(ComputePassEncoder),
    group_label: string,
});

static COMPUTE_PASS_POP_DEBUG_GROUP: StructLayout = layout!("ComputePassPopDebugGroup" {
    pass: object(ComputePassEncoder),
});

static COMPUTE_PASS_INSERT_DEBUG_MARKER: StructLayout = layout!("ComputePassInsertDebugMarker" {
    pass: object(ComputePassEncoder),
    marker_label: string,
});

static COMPUTE_PASS_DISPATCH_WORKGROUPS_INDIRECT: StructLayout = layout!("ComputePassDispatchWorkgroupsIndirect" {
    pass: object(ComputePassEncoder),
    indirect_buffer: object(Buffer),
    indirect_offset: u64,
});

static RENDER_PASS_PUSH_DEBUG_GROUP: StructLayout = layout!("RenderPassPushDebugGroup" {
    pass: object(RenderPassEncoder),
    group_label: string,
});

static RENDER_PASS_POP_DEBUG_GROUP: StructLayout = layout!("RenderPassPopDebugGroup" {
    pass: object(RenderPassEncoder),
});

static RENDER_PASS_INSERT_DEBUG_MARKER: StructLayout = layout!("RenderPassInsertDebugMarker" {
    pass: object(RenderPassEncoder),
    marker_label: string,
});

static RENDER_PASS_DRAW_INDIRECT: StructLayout = layout!("RenderPassDrawIndirect" {
    pass: object(RenderPassEncoder),
    indirect_buffer: object(Buffer),
    indirect_offset: u64,
});

static RENDER_PASS_DRAW_INDEXED_INDIRECT: StructLayout = layout!("RenderPassDrawIndexedIndirect" {
    pass: object(RenderPassEncoder),
    indirect_buffer: object(Buffer),
    indirect_offset: u64,
});

static RENDER_PASS_SET_BLEND_CONSTANT: StructLayout = layout!("RenderPassSetBlendConstant" {
    pass: object(RenderPassEncoder),
    r: f64,
    g: f64,
    b: f64,
    a: f64,
});

static RENDER_PASS_SET_STENCIL_REFERENCE: StructLayout = layout!("RenderPassSetStencilReference" {
    pass: object(RenderPassEncoder),
    reference: u32,
});

command_table! {
    /// Every command the client can send.
    pub enum CommandKind {
        DestroyObject = 0 => DESTROY_OBJECT,
        SetLabel = 1 => SET_LABEL,
        CreateBuffer = 2 => CREATE_BUFFER,
        BufferStorage = 3 => BUFFER_STORAGE,
        BufferMapAsync = 4 => BUFFER_MAP_ASYNC,
        BufferUpdateMappedData = 5 => BUFFER_UPDATE_MAPPED_DATA,
        BufferUnmap = 6 => BUFFER_UNMAP,
        BufferDestroy = 7 => BUFFER_DESTROY,
        CreateTexture = 8 => CREATE_TEXTURE,
        TextureCreateView = 9 => TEXTURE_CREATE_VIEW,
        TextureDestroy = 10 => TEXTURE_DESTROY,
        CreateSampler = 11 => CREATE_SAMPLER,
        CreateShaderModule = 12 => CREATE_SHADER_MODULE,
        ShaderModuleGetCompilationInfo = 13 => SHADER_MODULE_GET_COMPILATION_INFO,
        CreateBindGroupLayout = 14 => CREATE_BIND_GROUP_LAYOUT,
        CreateBindGroup = 15 => CREATE_BIND_GROUP,
        CreatePipelineLayout = 16 => CREATE_PIPELINE_LAYOUT,
        CreateComputePipeline = 17 => CREATE_COMPUTE_PIPELINE,
        CreateComputePipelineAsync = 18 => CREATE_COMPUTE_PIPELINE_ASYNC,
        CreateRenderPipeline = 19 => CREATE_RENDER_PIPELINE,
        CreateRenderPipelineAsync = 20 => CREATE_RENDER_PIPELINE_ASYNC,
        RenderPipelineGetBindGroupLayout = 21 => RENDER_PIPELINE_GET_BIND_GROUP_LAYOUT,
        ComputePipelineGetBindGroupLayout = 22 => COMPUTE_PIPELINE_GET_BIND_GROUP_LAYOUT,
        CreateCommandEncoder = 23 => CREATE_COMMAND_ENCODER,
        CommandEncoderBeginRenderPass = 24 => COMMAND_ENCODER_BEGIN_RENDER_PASS,
        CommandEncoderBeginComputePass = 25 => COMMAND_ENCODER_BEGIN_COMPUTE_PASS,
        CommandEncoderCopyBufferToBuffer = 26 => COMMAND_ENCODER_COPY_BUFFER_TO_BUFFER,
        CommandEncoderClearBuffer = 27 => COMMAND_ENCODER_CLEAR_BUFFER,
        CommandEncoderFinish = 28 => COMMAND_ENCODER_FINISH,
        RenderPassSetPipeline = 29 => RENDER_PASS_SET_PIPELINE,
        RenderPassSetBindGroup = 30 => RENDER_PASS_SET_BIND_GROUP,
        RenderPassSetVertexBuffer = 31 => RENDER_PASS_SET_VERTEX_BUFFER,
        RenderPassSetIndexBuffer = 32 => RENDER_PASS_SET_INDEX_BUFFER,
        RenderPassSetViewport = 33 => RENDER_PASS_SET_VIEWPORT,
        RenderPassSetScissorRect = 34 => RENDER_PASS_SET_SCISSOR_RECT,
        RenderPassDraw = 35 => RENDER_PASS_DRAW,
        RenderPassDrawIndexed = 36 => RENDER_PASS_DRAW_INDEXED,
        RenderPassEnd = 37 => RENDER_PASS_END,
        ComputePassSetPipeline = 38 => COMPUTE_PASS_SET_PIPELINE,
        ComputePassSetBindGroup = 39 => COMPUTE_PASS_SET_BIND_GROUP,
        ComputePassDispatchWorkgroups = 40 => COMPUTE_PASS_DISPATCH_WORKGROUPS,
        ComputePassEnd = 41 => COMPUTE_PASS_END,
        QueueSubmit = 42 => QUEUE_SUBMIT,
        QueueWriteBuffer = 43 => QUEUE_WRITE_BUFFER,
        QueueWriteTexture = 44 => QUEUE_WRITE_TEXTURE,
        QueueOnSubmittedWorkDone = 45 => QUEUE_ON_SUBMITTED_WORK_DONE,
        DevicePushErrorScope = 46 => DEVICE_PUSH_ERROR_SCOPE,
        DevicePopErrorScope = 47 => DEVICE_POP_ERROR_SCOPE,
        DeviceInjectError = 48 => DEVICE_INJECT_ERROR,
        DeviceTick = 49 => DEVICE_TICK,
        DeviceDestroy = 50 => DEVICE_DESTROY,
        InstanceRequestAdapter = 51 => INSTANCE_REQUEST_ADAPTER,
        AdapterRequestDevice = 52 => ADAPTER_REQUEST_DEVICE,
        CommandEncoderCopyBufferToTexture = 53 => COMMAND_ENCODER_COPY_BUFFER_TO_TEXTURE,
        CommandEncoderCopyTextureToBuffer = 54 => COMMAND_ENCODER_COPY_TEXTURE_TO_BUFFER,
        CommandEncoderCopyTextureToTexture = 55 => COMMAND_ENCODER_COPY_TEXTURE_TO_TEXTURE,
        CommandEncoderPushDebugGroup = 56 => COMMAND_ENCODER_PUSH_DEBUG_GROUP,
        CommandEncoderPopDebugGroup = 57 => COMMAND_ENCODER_POP_DEBUG_GROUP,
        CommandEncoderInsertDebugMarker = 58 => COMMAND_ENCODER_INSERT_DEBUG_MARKER,
        ComputePassPushDebugGroup = 59 => COMPUTE_PASS_PUSH_DEBUG_GROUP,
        ComputePassPopDebugGroup = 60 => COMPUTE_PASS_POP_DEBUG_GROUP,
        ComputePassInsertDebugMarker = 61 => COMPUTE_PASS_INSERT_DEBUG_MARKER,
        ComputePassDispatchWorkgroupsIndirect = 62 => COMPUTE_PASS_DISPATCH_WORKGROUPS_INDIRECT,
        RenderPassPushDebugGroup = 63 => RENDER_PASS_PUSH_DEBUG_GROUP,
        RenderPassPopDebugGroup = 64 => RENDER_PASS_POP_DEBUG_GROUP,
        RenderPassInsertDebugMarker = 65 => RENDER_PASS_INSERT_DEBUG_MARKER,
        RenderPassDrawIndirect = 66 => RENDER_PASS_DRAW_INDIRECT,
        RenderPassDrawIndexedIndirect = 67 => RENDER_PASS_DRAW_INDEXED_INDIRECT,
        RenderPassSetBlendConstant = 68 => RENDER_PASS_SET_BLEND_CONSTANT,
        RenderPassSetStencilReference = 69 => RENDER_PASS_SET_STENCIL_REFERENCE,
    }
}

impl CommandKind {
    /// Asynchronous commands carry a `request_serial` and get a callback.
    pub fn is_async(self) -> bool {
        self.layout().field_index("request_serial").is_some()
    }
}
