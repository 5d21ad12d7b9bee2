//! The boundary between the wire server and the graphics backend that actually
//! executes commands.
//!
//! The dispatcher decodes a command, resolves its handles, and calls exactly
//! one [`NativeApi`] method with borrowed native objects and typed values.
//! Backends never see handles or wire bytes. Validation of the values
//! themselves (formats, ranges, usage combinations) is the backend's job and
//! is reported through [`DeviceEvents`], not by failing the channel.

use crate::handle::ObjectType;
use crate::types::{
    BufferUsages, ColorWrites, ErrorFilter, ErrorType, FeatureName, MapMode,
    RequestAdapterOptions, ShaderStages, TextureUsages,
};

use super::completion::{
    AdapterCompletion, CompilationInfoCompletion, DeviceCompletion, DeviceEvents,
    MapAsyncCompletion, PipelineCompletion, PopErrorScopeCompletion, WorkDoneCompletion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: u32,
    pub format: u32,
    pub usage: TextureUsages,
    pub view_formats: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureViewDescriptor<'a> {
    pub label: &'a str,
    pub format: u32,
    pub dimension: u32,
    pub aspect: u32,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor<'a> {
    pub label: &'a str,
    /// u, v, w.
    pub address_modes: [u32; 3],
    pub mag_filter: u32,
    pub min_filter: u32,
    pub mipmap_filter: u32,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: u32,
    pub max_anisotropy: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub binding_type: u32,
    pub has_dynamic_offset: bool,
    pub min_binding_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindGroupLayoutDescriptor<'a> {
    pub label: &'a str,
    pub entries: Vec<BindGroupLayoutEntry>,
}

/// Exactly one of the resource fields is normally set; the backend validates.
#[derive(Debug)]
pub struct BindGroupEntry<'a, O> {
    pub binding: u32,
    pub buffer: Option<&'a O>,
    pub offset: u64,
    pub size: u64,
    pub sampler: Option<&'a O>,
    pub texture_view: Option<&'a O>,
}

#[derive(Debug)]
pub struct BindGroupDescriptor<'a, O> {
    pub label: &'a str,
    pub layout: &'a O,
    pub entries: Vec<BindGroupEntry<'a, O>>,
}

#[derive(Debug)]
pub struct PipelineLayoutDescriptor<'a, O> {
    pub label: &'a str,
    pub bind_group_layouts: Vec<&'a O>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEntry<'a> {
    pub key: &'a str,
    pub value: f64,
}

#[derive(Debug)]
pub struct ProgrammableStage<'a, O> {
    pub module: &'a O,
    pub entry_point: &'a str,
    pub constants: Vec<ConstantEntry<'a>>,
}

#[derive(Debug)]
pub struct ComputePipelineDescriptor<'a, O> {
    pub label: &'a str,
    /// `None` asks the backend for an automatic layout.
    pub layout: Option<&'a O>,
    pub compute: ProgrammableStage<'a, O>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: u32,
    pub offset: u64,
    pub shader_location: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: u32,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug)]
pub struct VertexState<'a, O> {
    pub module: &'a O,
    pub entry_point: &'a str,
    pub buffers: Vec<VertexBufferLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveState {
    pub topology: u32,
    pub strip_index_format: u32,
    pub front_face: u32,
    pub cull_mode: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub format: u32,
    pub depth_write_enabled: bool,
    pub depth_compare: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisampleState {
    pub count: u32,
    pub mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTargetState {
    pub format: u32,
    pub write_mask: ColorWrites,
}

#[derive(Debug)]
pub struct FragmentState<'a, O> {
    pub module: &'a O,
    pub entry_point: &'a str,
    pub targets: Vec<ColorTargetState>,
}

#[derive(Debug)]
pub struct RenderPipelineDescriptor<'a, O> {
    pub label: &'a str,
    pub layout: Option<&'a O>,
    pub vertex: VertexState<'a, O>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: MultisampleState,
    pub fragment: Option<FragmentState<'a, O>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Debug)]
pub struct RenderPassColorAttachment<'a, O> {
    /// `None` leaves the slot unused.
    pub view: Option<&'a O>,
    pub resolve_target: Option<&'a O>,
    pub load_op: u32,
    pub store_op: u32,
    pub clear_value: Color,
}

#[derive(Debug)]
pub struct RenderPassDepthStencilAttachment<'a, O> {
    pub view: &'a O,
    pub depth_load_op: u32,
    pub depth_store_op: u32,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load_op: u32,
    pub stencil_store_op: u32,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

#[derive(Debug)]
pub struct RenderPassDescriptor<'a, O> {
    pub label: &'a str,
    pub color_attachments: Vec<RenderPassColorAttachment<'a, O>>,
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment<'a, O>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ImageCopyTexture<'a, O> {
    pub texture: &'a O,
    pub mip_level: u32,
    pub origin: Origin3d,
    pub aspect: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDataLayout {
    pub offset: u64,
    pub bytes_per_row: u32,
    pub rows_per_image: u32,
}

#[derive(Debug)]
pub struct ImageCopyBuffer<'a, O> {
    pub buffer: &'a O,
    pub layout: TextureDataLayout,
}

/// `AdapterRequestDevice` arguments. Features this build does not know arrive
/// as [`FeatureName::Unknown`] and are the backend's to reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor<'a> {
    pub label: &'a str,
    pub required_features: Vec<FeatureName>,
}

/// Graphics backend driven by a [`Server`](super::Server).
///
/// There is one method per forward command. Methods that create an object
/// return it; the server stores it under the handle the client chose and
/// hands it back through [`NativeApi::release`] when the client destroys it or
/// the channel is torn down. Asynchronous methods receive a completion that
/// must eventually be completed; dropping it reports
/// [`RequestStatus::Unknown`](crate::types::RequestStatus::Unknown) to the
/// client.
pub trait NativeApi {
    type Object;

    /// Called once, when the server is constructed.
    fn connect(&mut self, _events: DeviceEvents<Self::Object>) {}

    /// Called once on teardown, before live objects are released.
    fn connection_lost(&mut self) {}

    fn release(&mut self, ty: ObjectType, object: Self::Object);

    fn instance_request_adapter(
        &mut self,
        options: &RequestAdapterOptions,
        completion: AdapterCompletion<Self::Object>,
    );

    /// The device becomes the one device-level commands act on.
    fn adapter_request_device(
        &mut self,
        adapter: &Self::Object,
        desc: &DeviceDescriptor<'_>,
        completion: DeviceCompletion<Self::Object>,
    );

    fn set_label(&mut self, ty: ObjectType, object: &Self::Object, label: &str);

    fn create_buffer(&mut self, label: &str) -> Self::Object;

    fn buffer_storage(
        &mut self,
        buffer: &Self::Object,
        size: u64,
        usage: BufferUsages,
        mapped_at_creation: bool,
    );

    fn buffer_map_async(
        &mut self,
        buffer: &Self::Object,
        mode: MapMode,
        offset: u64,
        size: u64,
        completion: MapAsyncCompletion<Self::Object>,
    );

    fn buffer_update_mapped_data(&mut self, buffer: &Self::Object, offset: u64, data: &[u8]);

    fn buffer_unmap(&mut self, buffer: &Self::Object);

    fn buffer_destroy(&mut self, buffer: &Self::Object);

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Self::Object;

    fn texture_create_view(
        &mut self,
        texture: &Self::Object,
        desc: &TextureViewDescriptor<'_>,
    ) -> Self::Object;

    fn texture_destroy(&mut self, texture: &Self::Object);

    fn create_sampler(&mut self, desc: &SamplerDescriptor<'_>) -> Self::Object;

    fn create_shader_module(&mut self, label: &str, code: &str) -> Self::Object;

    fn shader_module_get_compilation_info(
        &mut self,
        module: &Self::Object,
        completion: CompilationInfoCompletion<Self::Object>,
    );

    fn create_bind_group_layout(&mut self, desc: &BindGroupLayoutDescriptor<'_>) -> Self::Object;

    fn create_bind_group(&mut self, desc: &BindGroupDescriptor<'_, Self::Object>) -> Self::Object;

    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDescriptor<'_, Self::Object>,
    ) -> Self::Object;

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor<'_, Self::Object>,
    ) -> Self::Object;

    fn create_compute_pipeline_async(
        &mut self,
        desc: &ComputePipelineDescriptor<'_, Self::Object>,
        completion: PipelineCompletion<Self::Object>,
    );

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor<'_, Self::Object>,
    ) -> Self::Object;

    fn create_render_pipeline_async(
        &mut self,
        desc: &RenderPipelineDescriptor<'_, Self::Object>,
        completion: PipelineCompletion<Self::Object>,
    );

    fn render_pipeline_get_bind_group_layout(
        &mut self,
        pipeline: &Self::Object,
        group_index: u32,
    ) -> Self::Object;

    fn compute_pipeline_get_bind_group_layout(
        &mut self,
        pipeline: &Self::Object,
        group_index: u32,
    ) -> Self::Object;

    fn create_command_encoder(&mut self, label: &str) -> Self::Object;

    fn command_encoder_begin_render_pass(
        &mut self,
        encoder: &Self::Object,
        desc: &RenderPassDescriptor<'_, Self::Object>,
    ) -> Self::Object;

    fn command_encoder_begin_compute_pass(
        &mut self,
        encoder: &Self::Object,
        label: &str,
    ) -> Self::Object;

    fn command_encoder_copy_buffer_to_buffer(
        &mut self,
        encoder: &Self::Object,
        source: &Self::Object,
        source_offset: u64,
        destination: &Self::Object,
        destination_offset: u64,
        size: u64,
    );

    fn command_encoder_clear_buffer(
        &mut self,
        encoder: &Self::Object,
        buffer: &Self::Object,
        offset: u64,
        size: u64,
    );

    fn command_encoder_copy_buffer_to_texture(
        &mut self,
        encoder: &Self::Object,
        source: &ImageCopyBuffer<'_, Self::Object>,
        destination: &ImageCopyTexture<'_, Self::Object>,
        size: Extent3d,
    );

    fn command_encoder_copy_texture_to_buffer(
        &mut self,
        encoder: &Self::Object,
        source: &ImageCopyTexture<'_, Self::Object>,
        destination: &ImageCopyBuffer<'_, Self::Object>,
        size: Extent3d,
    );

    fn command_encoder_copy_texture_to_texture(
        &mut self,
        encoder: &Self::Object,
        source: &ImageCopyTexture<'_, Self::Object>,
        destination: &ImageCopyTexture<'_, Self::Object>,
        size: Extent3d,
    );

    // Debug groups and markers only annotate captures; backends may ignore them.

    fn command_encoder_push_debug_group(&mut self, _encoder: &Self::Object, _label: &str) {}

    fn command_encoder_pop_debug_group(&mut self, _encoder: &Self::Object) {}

    fn command_encoder_insert_debug_marker(&mut self, _encoder: &Self::Object, _label: &str) {}

    fn command_encoder_finish(&mut self, encoder: &Self::Object, label: &str) -> Self::Object;

    fn render_pass_set_pipeline(&mut self, pass: &Self::Object, pipeline: &Self::Object);

    fn render_pass_set_bind_group(
        &mut self,
        pass: &Self::Object,
        group_index: u32,
        group: Option<&Self::Object>,
        dynamic_offsets: &[u32],
    );

    fn render_pass_set_vertex_buffer(
        &mut self,
        pass: &Self::Object,
        slot: u32,
        buffer: Option<&Self::Object>,
        offset: u64,
        size: u64,
    );

    fn render_pass_set_index_buffer(
        &mut self,
        pass: &Self::Object,
        buffer: &Self::Object,
        format: u32,
        offset: u64,
        size: u64,
    );

    fn render_pass_set_viewport(&mut self, pass: &Self::Object, viewport: &Viewport);

    fn render_pass_set_scissor_rect(&mut self, pass: &Self::Object, rect: &ScissorRect);

    fn render_pass_draw(
        &mut self,
        pass: &Self::Object,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn render_pass_draw_indexed(
        &mut self,
        pass: &Self::Object,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    );

    fn render_pass_draw_indirect(
        &mut self,
        pass: &Self::Object,
        indirect_buffer: &Self::Object,
        indirect_offset: u64,
    );

    fn render_pass_draw_indexed_indirect(
        &mut self,
        pass: &Self::Object,
        indirect_buffer: &Self::Object,
        indirect_offset: u64,
    );

    fn render_pass_set_blend_constant(&mut self, pass: &Self::Object, color: &Color);

    fn render_pass_set_stencil_reference(&mut self, pass: &Self::Object, reference: u32);

    fn render_pass_push_debug_group(&mut self, _pass: &Self::Object, _label: &str) {}

    fn render_pass_pop_debug_group(&mut self, _pass: &Self::Object) {}

    fn render_pass_insert_debug_marker(&mut self, _pass: &Self::Object, _label: &str) {}

    fn render_pass_end(&mut self, pass: &Self::Object);

    fn compute_pass_set_pipeline(&mut self, pass: &Self::Object, pipeline: &Self::Object);

    fn compute_pass_set_bind_group(
        &mut self,
        pass: &Self::Object,
        group_index: u32,
        group: Option<&Self::Object>,
        dynamic_offsets: &[u32],
    );

    fn compute_pass_dispatch_workgroups(&mut self, pass: &Self::Object, x: u32, y: u32, z: u32);

    fn compute_pass_dispatch_workgroups_indirect(
        &mut self,
        pass: &Self::Object,
        indirect_buffer: &Self::Object,
        indirect_offset: u64,
    );

    fn compute_pass_push_debug_group(&mut self, _pass: &Self::Object, _label: &str) {}

    fn compute_pass_pop_debug_group(&mut self, _pass: &Self::Object) {}

    fn compute_pass_insert_debug_marker(&mut self, _pass: &Self::Object, _label: &str) {}

    fn compute_pass_end(&mut self, pass: &Self::Object);

    fn queue_submit(&mut self, command_buffers: &[&Self::Object]);

    fn queue_write_buffer(&mut self, buffer: &Self::Object, offset: u64, data: &[u8]);

    fn queue_write_texture(
        &mut self,
        destination: &ImageCopyTexture<'_, Self::Object>,
        data: &[u8],
        layout: &TextureDataLayout,
        size: Extent3d,
    );

    fn queue_on_submitted_work_done(&mut self, completion: WorkDoneCompletion<Self::Object>);

    /// `None` for a filter value this build does not know.
    fn device_push_error_scope(&mut self, filter: Option<ErrorFilter>);

    fn device_pop_error_scope(&mut self, completion: PopErrorScopeCompletion<Self::Object>);

    fn device_inject_error(&mut self, error_type: ErrorType, message: &str);

    /// Give the backend a chance to make progress on pending work.
    fn device_tick(&mut self) {}

    fn device_destroy(&mut self);
}
