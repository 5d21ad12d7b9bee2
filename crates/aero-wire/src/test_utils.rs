use std::collections::{BTreeMap, BTreeSet};

use crate::client::Client;
use crate::config::WireConfig;
use crate::error::WireResult;
use crate::handle::{Handle, ObjectType};
use crate::schema::{CommandKind, CommandSchema, FieldKind, Record, ScalarKind, StructLayout, Value};
use crate::server::*;
use crate::types::{
    AdapterProperties, AdapterType, BufferUsages, CompilationMessage, CompilationMessageType,
    DeviceLostReason, ErrorFilter, ErrorType, FeatureName, MapMode, RequestAdapterOptions,
    RequestStatus, SupportedLimits,
};

/// Mock buffers larger than this keep no contents, so hostile sizes cannot
/// make the backend allocate.
const MOCK_BUFFER_LIMIT: u64 = 1 << 20;

/// Features the mock adapter offers. Device requests for anything else fail.
pub const MOCK_FEATURES: &[FeatureName] = &[
    FeatureName::DepthClipControl,
    FeatureName::TimestampQuery,
    FeatureName::IndirectFirstInstance,
    FeatureName::ShaderF16,
];

pub const MOCK_LIMITS: SupportedLimits = SupportedLimits {
    max_texture_dimension_1d: 8192,
    max_texture_dimension_2d: 8192,
    max_texture_dimension_3d: 2048,
    max_bind_groups: 4,
    max_buffer_size: 1 << 28,
    max_compute_workgroups_per_dimension: 65535,
};

/// Native object handed out by [`RecordingNative`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockObject {
    /// Unique per backend, starting at 1.
    pub serial: u64,
    /// Name of the method that created the object.
    pub origin: &'static str,
    pub label: String,
}

/// One recorded [`NativeApi`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    /// Serials of the objects the call received, in argument order.
    pub objects: Vec<u64>,
    /// Serial of the object the call created.
    pub created: Option<u64>,
    pub detail: String,
}

/// A [`NativeApi`] backend that records every call.
///
/// Asynchronous completions are held in the `pending_*` fields until the test
/// completes or drops them, unless `auto_complete` is set, in which case they
/// finish inside the call with plausible results: map reads return the bytes
/// written to the buffer, pipelines fail when their entry point is empty,
/// devices fail when they require a feature outside [`MOCK_FEATURES`], and
/// error scopes capture injected errors.
#[derive(Debug, Default)]
pub struct RecordingNative {
    pub auto_complete: bool,
    pub calls: Vec<Call>,
    pub released: Vec<(ObjectType, MockObject)>,
    pub events: Option<DeviceEvents<MockObject>>,
    pub connection_lost: bool,
    pub device_destroyed: bool,
    pub ticks: usize,

    pub pending_maps: Vec<MapAsyncCompletion<MockObject>>,
    pub pending_compilation_info: Vec<CompilationInfoCompletion<MockObject>>,
    pub pending_pipelines: Vec<(MockObject, PipelineCompletion<MockObject>)>,
    pub pending_work_done: Vec<WorkDoneCompletion<MockObject>>,
    pub pending_pop_error_scope: Vec<PopErrorScopeCompletion<MockObject>>,
    pub pending_adapters: Vec<(MockObject, AdapterInfo, AdapterCompletion<MockObject>)>,
    pub pending_devices: Vec<(
        MockObject,
        Result<DeviceInfo, String>,
        DeviceCompletion<MockObject>,
    )>,

    next_serial: u64,
    live: BTreeSet<u64>,
    buffer_data: BTreeMap<u64, Vec<u8>>,
    shader_code: BTreeMap<u64, String>,
    error_scopes: Vec<(Option<ErrorFilter>, Option<(ErrorType, String)>)>,
}

impl RecordingNative {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_completing() -> Self {
        Self {
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Serials of objects created and not yet released.
    pub fn live_serials(&self) -> &BTreeSet<u64> {
        &self.live
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls.iter().map(|call| call.method).collect()
    }

    pub fn calls_to(&self, method: &str) -> Vec<&Call> {
        self.calls.iter().filter(|call| call.method == method).collect()
    }

    pub fn buffer_contents(&self, buffer_serial: u64) -> Option<&[u8]> {
        self.buffer_data.get(&buffer_serial).map(Vec::as_slice)
    }

    fn record(&mut self, method: &'static str, objects: &[&MockObject], detail: String) {
        self.calls.push(Call {
            method,
            objects: objects.iter().map(|o| o.serial).collect(),
            created: None,
            detail,
        });
    }

    fn make(
        &mut self,
        method: &'static str,
        label: &str,
        objects: &[&MockObject],
        detail: String,
    ) -> MockObject {
        self.next_serial += 1;
        let serial = self.next_serial;
        self.live.insert(serial);
        self.calls.push(Call {
            method,
            objects: objects.iter().map(|o| o.serial).collect(),
            created: Some(serial),
            detail,
        });
        MockObject {
            serial,
            origin: method,
            label: label.to_owned(),
        }
    }

    fn write(&mut self, buffer: &MockObject, offset: u64, data: &[u8]) {
        let Some(end) = offset.checked_add(data.len() as u64) else {
            return;
        };
        if end > MOCK_BUFFER_LIMIT {
            return;
        }
        let contents = self.buffer_data.entry(buffer.serial).or_default();
        let (start, end) = (offset as usize, end as usize);
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[start..end].copy_from_slice(data);
    }

    fn read(&self, buffer: &MockObject, offset: u64, size: u64) -> Vec<u8> {
        if size > MOCK_BUFFER_LIMIT || offset > MOCK_BUFFER_LIMIT {
            return Vec::new();
        }
        let mut out = vec![0; size as usize];
        if let Some(contents) = self.buffer_data.get(&buffer.serial) {
            let start = (offset as usize).min(contents.len());
            let end = (offset as usize + size as usize).min(contents.len());
            out[..end - start].copy_from_slice(&contents[start..end]);
        }
        out
    }

    /// Objects handed back by a completion whose channel is gone.
    fn settle(&mut self, result: Result<(), MockObject>) {
        if let Err(object) = result {
            self.live.remove(&object.serial);
        }
    }

    /// Complete every held adapter and device request as planned at request
    /// time.
    pub fn grant_requests(&mut self) {
        for (object, info, completion) in std::mem::take(&mut self.pending_adapters) {
            let result = completion.complete(Ok((object, info)));
            self.settle(result);
        }
        for (object, planned, completion) in std::mem::take(&mut self.pending_devices) {
            self.finish_device(object, planned, completion);
        }
    }

    fn finish_device(
        &mut self,
        object: MockObject,
        planned: Result<DeviceInfo, String>,
        completion: DeviceCompletion<MockObject>,
    ) {
        let result = match planned {
            Ok(info) => completion.complete(Ok((object, info))),
            Err(message) => {
                self.live.remove(&object.serial);
                completion.complete(Err(message))
            }
        };
        self.settle(result);
    }

    fn pipeline(
        &mut self,
        method: &'static str,
        label: &str,
        objects: &[&MockObject],
        entry_point: &str,
        completion: PipelineCompletion<MockObject>,
    ) {
        let object = self.make(method, label, objects, format!("entry_point={entry_point}"));
        if !self.auto_complete {
            self.pending_pipelines.push((object, completion));
        } else if entry_point.is_empty() {
            self.live.remove(&object.serial);
            let result = completion.complete(Err("missing entry point".to_owned()));
            self.settle(result);
        } else {
            let result = completion.complete(Ok(object));
            self.settle(result);
        }
    }
}

fn filter_matches(filter: Option<ErrorFilter>, error_type: ErrorType) -> bool {
    matches!(
        (filter, error_type),
        (Some(ErrorFilter::Validation), ErrorType::Validation)
            | (Some(ErrorFilter::OutOfMemory), ErrorType::OutOfMemory)
            | (Some(ErrorFilter::Internal), ErrorType::Internal)
    )
}

impl NativeApi for RecordingNative {
    type Object = MockObject;

    fn connect(&mut self, events: DeviceEvents<MockObject>) {
        self.events = Some(events);
    }

    fn connection_lost(&mut self) {
        self.connection_lost = true;
        self.pending_maps.clear();
        self.pending_compilation_info.clear();
        self.pending_work_done.clear();
        self.pending_pop_error_scope.clear();
        for (object, completion) in std::mem::take(&mut self.pending_pipelines) {
            drop(completion);
            self.live.remove(&object.serial);
        }
        for (object, _, completion) in std::mem::take(&mut self.pending_adapters) {
            drop(completion);
            self.live.remove(&object.serial);
        }
        for (object, _, completion) in std::mem::take(&mut self.pending_devices) {
            drop(completion);
            self.live.remove(&object.serial);
        }
    }

    fn release(&mut self, ty: ObjectType, object: MockObject) {
        self.live.remove(&object.serial);
        self.released.push((ty, object));
    }

    fn instance_request_adapter(
        &mut self,
        options: &RequestAdapterOptions,
        completion: AdapterCompletion<MockObject>,
    ) {
        let object = self.make("instance_request_adapter", "", &[], format!("{options:?}"));
        let adapter_type = if options.force_fallback_adapter {
            AdapterType::Cpu
        } else {
            AdapterType::DiscreteGpu
        };
        let info = AdapterInfo {
            properties: AdapterProperties {
                vendor_id: 0x1af4,
                device_id: 0x1050,
                name: "Recording Adapter".to_owned(),
                driver_description: "mock".to_owned(),
                adapter_type,
                backend_type: 0,
            },
            limits: MOCK_LIMITS,
            features: MOCK_FEATURES.to_vec(),
        };
        if self.auto_complete {
            let result = completion.complete(Ok((object, info)));
            self.settle(result);
        } else {
            self.pending_adapters.push((object, info, completion));
        }
    }

    fn adapter_request_device(
        &mut self,
        adapter: &MockObject,
        desc: &DeviceDescriptor<'_>,
        completion: DeviceCompletion<MockObject>,
    ) {
        let object = self.make(
            "adapter_request_device",
            desc.label,
            &[adapter],
            format!("features={:?}", desc.required_features),
        );
        let planned = match desc
            .required_features
            .iter()
            .find(|&&f| !MOCK_FEATURES.contains(&f))
        {
            Some(missing) => Err(format!("unsupported feature {missing:?}")),
            None => Ok(DeviceInfo {
                limits: MOCK_LIMITS,
                features: desc.required_features.clone(),
            }),
        };
        if self.auto_complete {
            self.finish_device(object, planned, completion);
        } else {
            self.pending_devices.push((object, planned, completion));
        }
    }

    fn set_label(&mut self, ty: ObjectType, object: &MockObject, label: &str) {
        self.record("set_label", &[object], format!("{ty} {label}"));
    }

    fn create_buffer(&mut self, label: &str) -> MockObject {
        self.make("create_buffer", label, &[], label.to_owned())
    }

    fn buffer_storage(
        &mut self,
        buffer: &MockObject,
        size: u64,
        usage: BufferUsages,
        mapped_at_creation: bool,
    ) {
        if size <= MOCK_BUFFER_LIMIT {
            self.buffer_data.insert(buffer.serial, vec![0; size as usize]);
        }
        self.record(
            "buffer_storage",
            &[buffer],
            format!("size={size} usage={usage:?} mapped={mapped_at_creation}"),
        );
    }

    fn buffer_map_async(
        &mut self,
        buffer: &MockObject,
        mode: MapMode,
        offset: u64,
        size: u64,
        completion: MapAsyncCompletion<MockObject>,
    ) {
        self.record(
            "buffer_map_async",
            &[buffer],
            format!("mode={mode:?} offset={offset} size={size}"),
        );
        if !self.auto_complete {
            self.pending_maps.push(completion);
            return;
        }
        let data = if mode.contains(MapMode::READ) {
            self.read(buffer, offset, size)
        } else {
            Vec::new()
        };
        completion.complete(RequestStatus::Success, data);
    }

    fn buffer_update_mapped_data(&mut self, buffer: &MockObject, offset: u64, data: &[u8]) {
        self.write(buffer, offset, data);
        self.record(
            "buffer_update_mapped_data",
            &[buffer],
            format!("offset={offset} len={}", data.len()),
        );
    }

    fn buffer_unmap(&mut self, buffer: &MockObject) {
        self.record("buffer_unmap", &[buffer], String::new());
    }

    fn buffer_destroy(&mut self, buffer: &MockObject) {
        self.buffer_data.remove(&buffer.serial);
        self.record("buffer_destroy", &[buffer], String::new());
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> MockObject {
        self.make("create_texture", desc.label, &[], format!("{desc:?}"))
    }

    fn texture_create_view(
        &mut self,
        texture: &MockObject,
        desc: &TextureViewDescriptor<'_>,
    ) -> MockObject {
        self.make("texture_create_view", desc.label, &[texture], format!("{desc:?}"))
    }

    fn texture_destroy(&mut self, texture: &MockObject) {
        self.record("texture_destroy", &[texture], String::new());
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor<'_>) -> MockObject {
        self.make("create_sampler", desc.label, &[], format!("{desc:?}"))
    }

    fn create_shader_module(&mut self, label: &str, code: &str) -> MockObject {
        let module = self.make("create_shader_module", label, &[], code.to_owned());
        self.shader_code.insert(module.serial, code.to_owned());
        module
    }

    fn shader_module_get_compilation_info(
        &mut self,
        module: &MockObject,
        completion: CompilationInfoCompletion<MockObject>,
    ) {
        self.record("shader_module_get_compilation_info", &[module], String::new());
        if !self.auto_complete {
            self.pending_compilation_info.push(completion);
            return;
        }
        let code = self.shader_code.get(&module.serial).map_or("", String::as_str);
        let messages: Vec<CompilationMessage> = code
            .lines()
            .enumerate()
            .filter_map(|(line, text)| {
                let pos = text.find("error")?;
                Some(CompilationMessage {
                    message: text.trim().to_owned(),
                    kind: CompilationMessageType::Error,
                    line_num: line as u64 + 1,
                    line_pos: pos as u64 + 1,
                    offset: 0,
                    length: text.len() as u64,
                })
            })
            .collect();
        completion.complete(RequestStatus::Success, &messages);
    }

    fn create_bind_group_layout(&mut self, desc: &BindGroupLayoutDescriptor<'_>) -> MockObject {
        self.make("create_bind_group_layout", desc.label, &[], format!("{desc:?}"))
    }

    fn create_bind_group(&mut self, desc: &BindGroupDescriptor<'_, MockObject>) -> MockObject {
        let mut objects = vec![desc.layout];
        for entry in &desc.entries {
            objects.extend(entry.buffer);
            objects.extend(entry.sampler);
            objects.extend(entry.texture_view);
        }
        self.make(
            "create_bind_group",
            desc.label,
            &objects,
            format!("entries={}", desc.entries.len()),
        )
    }

    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDescriptor<'_, MockObject>,
    ) -> MockObject {
        self.make(
            "create_pipeline_layout",
            desc.label,
            &desc.bind_group_layouts,
            String::new(),
        )
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor<'_, MockObject>,
    ) -> MockObject {
        let mut objects: Vec<&MockObject> = desc.layout.into_iter().collect();
        objects.push(desc.compute.module);
        self.make(
            "create_compute_pipeline",
            desc.label,
            &objects,
            format!("entry_point={}", desc.compute.entry_point),
        )
    }

    fn create_compute_pipeline_async(
        &mut self,
        desc: &ComputePipelineDescriptor<'_, MockObject>,
        completion: PipelineCompletion<MockObject>,
    ) {
        let mut objects: Vec<&MockObject> = desc.layout.into_iter().collect();
        objects.push(desc.compute.module);
        self.pipeline(
            "create_compute_pipeline_async",
            desc.label,
            &objects,
            desc.compute.entry_point,
            completion,
        );
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor<'_, MockObject>,
    ) -> MockObject {
        let mut objects: Vec<&MockObject> = desc.layout.into_iter().collect();
        objects.push(desc.vertex.module);
        objects.extend(desc.fragment.as_ref().map(|f| f.module));
        self.make(
            "create_render_pipeline",
            desc.label,
            &objects,
            format!(
                "entry_point={} buffers={} depth_stencil={}",
                desc.vertex.entry_point,
                desc.vertex.buffers.len(),
                desc.depth_stencil.is_some()
            ),
        )
    }

    fn create_render_pipeline_async(
        &mut self,
        desc: &RenderPipelineDescriptor<'_, MockObject>,
        completion: PipelineCompletion<MockObject>,
    ) {
        let mut objects: Vec<&MockObject> = desc.layout.into_iter().collect();
        objects.push(desc.vertex.module);
        objects.extend(desc.fragment.as_ref().map(|f| f.module));
        self.pipeline(
            "create_render_pipeline_async",
            desc.label,
            &objects,
            desc.vertex.entry_point,
            completion,
        );
    }

    fn render_pipeline_get_bind_group_layout(
        &mut self,
        pipeline: &MockObject,
        group_index: u32,
    ) -> MockObject {
        self.make(
            "render_pipeline_get_bind_group_layout",
            "",
            &[pipeline],
            format!("group={group_index}"),
        )
    }

    fn compute_pipeline_get_bind_group_layout(
        &mut self,
        pipeline: &MockObject,
        group_index: u32,
    ) -> MockObject {
        self.make(
            "compute_pipeline_get_bind_group_layout",
            "",
            &[pipeline],
            format!("group={group_index}"),
        )
    }

    fn create_command_encoder(&mut self, label: &str) -> MockObject {
        self.make("create_command_encoder", label, &[], String::new())
    }

    fn command_encoder_begin_render_pass(
        &mut self,
        encoder: &MockObject,
        desc: &RenderPassDescriptor<'_, MockObject>,
    ) -> MockObject {
        let mut objects = vec![encoder];
        for attachment in &desc.color_attachments {
            objects.extend(attachment.view);
            objects.extend(attachment.resolve_target);
        }
        objects.extend(desc.depth_stencil_attachment.as_ref().map(|ds| ds.view));
        self.make(
            "command_encoder_begin_render_pass",
            desc.label,
            &objects,
            format!("color_attachments={}", desc.color_attachments.len()),
        )
    }

    fn command_encoder_begin_compute_pass(&mut self, encoder: &MockObject, label: &str) -> MockObject {
        self.make("command_encoder_begin_compute_pass", label, &[encoder], String::new())
    }

    fn command_encoder_copy_buffer_to_buffer(
        &mut self,
        encoder: &MockObject,
        source: &MockObject,
        source_offset: u64,
        destination: &MockObject,
        destination_offset: u64,
        size: u64,
    ) {
        self.record(
            "command_encoder_copy_buffer_to_buffer",
            &[encoder, source, destination],
            format!("{source_offset} -> {destination_offset} size={size}"),
        );
    }

    fn command_encoder_clear_buffer(
        &mut self,
        encoder: &MockObject,
        buffer: &MockObject,
        offset: u64,
        size: u64,
    ) {
        self.record(
            "command_encoder_clear_buffer",
            &[encoder, buffer],
            format!("offset={offset} size={size}"),
        );
    }

    fn command_encoder_copy_buffer_to_texture(
        &mut self,
        encoder: &MockObject,
        source: &ImageCopyBuffer<'_, MockObject>,
        destination: &ImageCopyTexture<'_, MockObject>,
        size: Extent3d,
    ) {
        self.record(
            "command_encoder_copy_buffer_to_texture",
            &[encoder, source.buffer, destination.texture],
            format!("{:?} mip={} {size:?}", source.layout, destination.mip_level),
        );
    }

    fn command_encoder_copy_texture_to_buffer(
        &mut self,
        encoder: &MockObject,
        source: &ImageCopyTexture<'_, MockObject>,
        destination: &ImageCopyBuffer<'_, MockObject>,
        size: Extent3d,
    ) {
        self.record(
            "command_encoder_copy_texture_to_buffer",
            &[encoder, source.texture, destination.buffer],
            format!("mip={} {:?} {size:?}", source.mip_level, destination.layout),
        );
    }

    fn command_encoder_copy_texture_to_texture(
        &mut self,
        encoder: &MockObject,
        source: &ImageCopyTexture<'_, MockObject>,
        destination: &ImageCopyTexture<'_, MockObject>,
        size: Extent3d,
    ) {
        self.record(
            "command_encoder_copy_texture_to_texture",
            &[encoder, source.texture, destination.texture],
            format!("{:?} -> {:?} {size:?}", source.origin, destination.origin),
        );
    }

    fn command_encoder_push_debug_group(&mut self, encoder: &MockObject, label: &str) {
        self.record("command_encoder_push_debug_group", &[encoder], label.to_owned());
    }

    fn command_encoder_pop_debug_group(&mut self, encoder: &MockObject) {
        self.record("command_encoder_pop_debug_group", &[encoder], String::new());
    }

    fn command_encoder_insert_debug_marker(&mut self, encoder: &MockObject, label: &str) {
        self.record("command_encoder_insert_debug_marker", &[encoder], label.to_owned());
    }

    fn command_encoder_finish(&mut self, encoder: &MockObject, label: &str) -> MockObject {
        self.make("command_encoder_finish", label, &[encoder], String::new())
    }

    fn render_pass_set_pipeline(&mut self, pass: &MockObject, pipeline: &MockObject) {
        self.record("render_pass_set_pipeline", &[pass, pipeline], String::new());
    }

    fn render_pass_set_bind_group(
        &mut self,
        pass: &MockObject,
        group_index: u32,
        group: Option<&MockObject>,
        dynamic_offsets: &[u32],
    ) {
        let mut objects = vec![pass];
        objects.extend(group);
        self.record(
            "render_pass_set_bind_group",
            &objects,
            format!("group={group_index} offsets={dynamic_offsets:?}"),
        );
    }

    fn render_pass_set_vertex_buffer(
        &mut self,
        pass: &MockObject,
        slot: u32,
        buffer: Option<&MockObject>,
        offset: u64,
        size: u64,
    ) {
        let mut objects = vec![pass];
        objects.extend(buffer);
        self.record(
            "render_pass_set_vertex_buffer",
            &objects,
            format!("slot={slot} offset={offset} size={size}"),
        );
    }

    fn render_pass_set_index_buffer(
        &mut self,
        pass: &MockObject,
        buffer: &MockObject,
        format: u32,
        offset: u64,
        size: u64,
    ) {
        self.record(
            "render_pass_set_index_buffer",
            &[pass, buffer],
            format!("format={format} offset={offset} size={size}"),
        );
    }

    fn render_pass_set_viewport(&mut self, pass: &MockObject, viewport: &Viewport) {
        self.record("render_pass_set_viewport", &[pass], format!("{viewport:?}"));
    }

    fn render_pass_set_scissor_rect(&mut self, pass: &MockObject, rect: &ScissorRect) {
        self.record("render_pass_set_scissor_rect", &[pass], format!("{rect:?}"));
    }

    fn render_pass_draw(
        &mut self,
        pass: &MockObject,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(
            "render_pass_draw",
            &[pass],
            format!("{vertex_count} {instance_count} {first_vertex} {first_instance}"),
        );
    }

    fn render_pass_draw_indexed(
        &mut self,
        pass: &MockObject,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        self.record(
            "render_pass_draw_indexed",
            &[pass],
            format!("{index_count} {instance_count} {first_index} {base_vertex} {first_instance}"),
        );
    }

    fn render_pass_draw_indirect(
        &mut self,
        pass: &MockObject,
        indirect_buffer: &MockObject,
        indirect_offset: u64,
    ) {
        self.record(
            "render_pass_draw_indirect",
            &[pass, indirect_buffer],
            format!("offset={indirect_offset}"),
        );
    }

    fn render_pass_draw_indexed_indirect(
        &mut self,
        pass: &MockObject,
        indirect_buffer: &MockObject,
        indirect_offset: u64,
    ) {
        self.record(
            "render_pass_draw_indexed_indirect",
            &[pass, indirect_buffer],
            format!("offset={indirect_offset}"),
        );
    }

    fn render_pass_set_blend_constant(&mut self, pass: &MockObject, color: &Color) {
        self.record("render_pass_set_blend_constant", &[pass], format!("{color:?}"));
    }

    fn render_pass_set_stencil_reference(&mut self, pass: &MockObject, reference: u32) {
        self.record("render_pass_set_stencil_reference", &[pass], reference.to_string());
    }

    fn render_pass_push_debug_group(&mut self, pass: &MockObject, label: &str) {
        self.record("render_pass_push_debug_group", &[pass], label.to_owned());
    }

    fn render_pass_pop_debug_group(&mut self, pass: &MockObject) {
        self.record("render_pass_pop_debug_group", &[pass], String::new());
    }

    fn render_pass_insert_debug_marker(&mut self, pass: &MockObject, label: &str) {
        self.record("render_pass_insert_debug_marker", &[pass], label.to_owned());
    }

    fn render_pass_end(&mut self, pass: &MockObject) {
        self.record("render_pass_end", &[pass], String::new());
    }

    fn compute_pass_set_pipeline(&mut self, pass: &MockObject, pipeline: &MockObject) {
        self.record("compute_pass_set_pipeline", &[pass, pipeline], String::new());
    }

    fn compute_pass_set_bind_group(
        &mut self,
        pass: &MockObject,
        group_index: u32,
        group: Option<&MockObject>,
        dynamic_offsets: &[u32],
    ) {
        let mut objects = vec![pass];
        objects.extend(group);
        self.record(
            "compute_pass_set_bind_group",
            &objects,
            format!("group={group_index} offsets={dynamic_offsets:?}"),
        );
    }

    fn compute_pass_dispatch_workgroups(&mut self, pass: &MockObject, x: u32, y: u32, z: u32) {
        self.record("compute_pass_dispatch_workgroups", &[pass], format!("{x}x{y}x{z}"));
    }

    fn compute_pass_dispatch_workgroups_indirect(
        &mut self,
        pass: &MockObject,
        indirect_buffer: &MockObject,
        indirect_offset: u64,
    ) {
        self.record(
            "compute_pass_dispatch_workgroups_indirect",
            &[pass, indirect_buffer],
            format!("offset={indirect_offset}"),
        );
    }

    fn compute_pass_push_debug_group(&mut self, pass: &MockObject, label: &str) {
        self.record("compute_pass_push_debug_group", &[pass], label.to_owned());
    }

    fn compute_pass_pop_debug_group(&mut self, pass: &MockObject) {
        self.record("compute_pass_pop_debug_group", &[pass], String::new());
    }

    fn compute_pass_insert_debug_marker(&mut self, pass: &MockObject, label: &str) {
        self.record("compute_pass_insert_debug_marker", &[pass], label.to_owned());
    }

    fn compute_pass_end(&mut self, pass: &MockObject) {
        self.record("compute_pass_end", &[pass], String::new());
    }

    fn queue_submit(&mut self, command_buffers: &[&MockObject]) {
        self.record("queue_submit", command_buffers, String::new());
    }

    fn queue_write_buffer(&mut self, buffer: &MockObject, offset: u64, data: &[u8]) {
        self.write(buffer, offset, data);
        self.record(
            "queue_write_buffer",
            &[buffer],
            format!("offset={offset} len={}", data.len()),
        );
    }

    fn queue_write_texture(
        &mut self,
        destination: &ImageCopyTexture<'_, MockObject>,
        data: &[u8],
        layout: &TextureDataLayout,
        size: Extent3d,
    ) {
        self.record(
            "queue_write_texture",
            &[destination.texture],
            format!("len={} {layout:?} {size:?}", data.len()),
        );
    }

    fn queue_on_submitted_work_done(&mut self, completion: WorkDoneCompletion<MockObject>) {
        self.record("queue_on_submitted_work_done", &[], String::new());
        if self.auto_complete {
            completion.complete(RequestStatus::Success);
        } else {
            self.pending_work_done.push(completion);
        }
    }

    fn device_push_error_scope(&mut self, filter: Option<ErrorFilter>) {
        self.record("device_push_error_scope", &[], format!("{filter:?}"));
        self.error_scopes.push((filter, None));
    }

    fn device_pop_error_scope(&mut self, completion: PopErrorScopeCompletion<MockObject>) {
        self.record("device_pop_error_scope", &[], String::new());
        if !self.auto_complete {
            self.pending_pop_error_scope.push(completion);
            return;
        }
        match self.error_scopes.pop() {
            Some((_, Some((error_type, message)))) => {
                completion.complete(RequestStatus::Success, error_type, &message)
            }
            Some((_, None)) => completion.complete(RequestStatus::Success, ErrorType::NoError, ""),
            None => completion.complete(RequestStatus::Error, ErrorType::Unknown, "no error scope"),
        }
    }

    fn device_inject_error(&mut self, error_type: ErrorType, message: &str) {
        self.record("device_inject_error", &[], format!("{error_type:?} {message}"));
        let scope = self
            .error_scopes
            .iter_mut()
            .rev()
            .find(|(filter, _)| filter_matches(*filter, error_type));
        match scope {
            Some((_, captured)) => {
                captured.get_or_insert_with(|| (error_type, message.to_owned()));
            }
            None => {
                if let Some(events) = &self.events {
                    events.uncaptured_error(error_type, message);
                }
            }
        }
    }

    fn device_tick(&mut self) {
        self.ticks += 1;
        self.record("device_tick", &[], String::new());
    }

    fn device_destroy(&mut self) {
        self.device_destroyed = true;
        self.record("device_destroy", &[], String::new());
        if let Some(events) = &self.events {
            events.device_lost(DeviceLostReason::Destroyed, "device destroyed");
        }
    }
}

/// A client and a server joined back to back in one process.
///
/// [`Loopback::flush`] moves client output to the server and server output
/// back to the client, split into `chunk_size` pieces.
pub struct Loopback {
    pub client: Client,
    pub server: Server<RecordingNative>,
    pub chunk_size: usize,
}

impl Loopback {
    pub fn new(native: RecordingNative) -> Self {
        Self::with_config(native, WireConfig::default())
    }

    pub fn with_config(native: RecordingNative, config: WireConfig) -> Self {
        Self {
            client: Client::new(config),
            server: Server::new(native, config),
            chunk_size: usize::MAX,
        }
    }

    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn native(&self) -> &RecordingNative {
        self.server.native()
    }

    pub fn native_mut(&mut self) -> &mut RecordingNative {
        self.server.native_mut()
    }

    /// Deliver pending client commands to the server.
    pub fn flush_forward(&mut self) -> WireResult<()> {
        let bytes = self.client.take_outgoing();
        for chunk in bytes.chunks(self.chunk_size.max(1)) {
            self.server.handle_commands(chunk)?;
        }
        Ok(())
    }

    /// Deliver pending server return commands to the client.
    pub fn flush_returns(&mut self) -> WireResult<()> {
        let bytes = self.server.take_outgoing();
        for chunk in bytes.chunks(self.chunk_size.max(1)) {
            self.client.handle_commands(chunk)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> WireResult<()> {
        self.flush_forward()?;
        self.flush_returns()
    }

    /// Flush, let the backend grant held adapter and device requests, and
    /// deliver the replies.
    pub fn grant(&mut self) -> WireResult<()> {
        self.flush_forward()?;
        self.native_mut().grant_requests();
        self.flush_returns()
    }

    /// Obtain an adapter and a device, then create one object of every other
    /// type through ordinary create commands. Returns all their handles.
    pub fn populate(&mut self) -> WireResult<BTreeMap<ObjectType, Handle>> {
        let mut live = BTreeMap::new();
        let adapter = self
            .client
            .request_adapter(RequestAdapterOptions::default(), |_| {})?;
        self.grant()?;
        let device = self.client.request_device(adapter, "populate", &[], |_| {})?;
        self.grant()?;
        live.insert(ObjectType::Adapter, adapter);
        live.insert(ObjectType::Device, device);

        let mut progress = true;
        while progress {
            progress = false;
            for &kind in CommandKind::ALL {
                if kind.is_async() {
                    continue;
                }
                let Some(ty) = created_type(kind.layout()) else {
                    continue;
                };
                if live.contains_key(&ty) || !required_objects(kind.layout(), &live) {
                    continue;
                }
                let objects = live.clone();
                let handle = self.client.create(kind, |result| {
                    sample_record(kind.layout(), 1, &mut |field| {
                        fill_handle(field, &objects, result)
                    })
                    .values
                })?;
                live.insert(ty, handle);
                progress = true;
            }
        }
        self.flush()?;
        Ok(live)
    }
}

pub fn created_type(layout: &StructLayout) -> Option<ObjectType> {
    layout.fields.iter().find_map(|field| match field.kind {
        FieldKind::NewObject(ty) => Some(ty),
        _ => None,
    })
}

/// True when every required object field of `layout`, nested ones included,
/// can be filled from `live`.
pub fn required_objects(layout: &StructLayout, live: &BTreeMap<ObjectType, Handle>) -> bool {
    layout.fields.iter().all(|field| match field.kind {
        FieldKind::Object {
            ty,
            optional: false,
        } => live.contains_key(&ty),
        FieldKind::Array(inner) | FieldKind::OptionalStruct(inner) => {
            required_objects(inner, live)
        }
        _ => true,
    })
}

/// Fill an object-bearing field from `live`; `created` is used for the new
/// object slot.
pub fn fill_handle(
    field: FieldKind,
    live: &BTreeMap<ObjectType, Handle>,
    created: Handle,
) -> Value<Handle> {
    match field {
        FieldKind::Object { ty, .. } => Value::Object(live.get(&ty).copied()),
        FieldKind::NewObject(_) => Value::NewObject(created),
        _ => Value::Handle(Handle::NULL),
    }
}

/// Deterministic values for every field of `layout`.
///
/// `seed` varies scalars, payload lengths and array counts (including empty
/// arrays and absent optional structs). Object, new-object and raw handle
/// fields are delegated to `handles`.
pub fn sample_record<F>(layout: &StructLayout, seed: u64, handles: &mut F) -> Record<Handle>
where
    F: FnMut(FieldKind) -> Value<Handle>,
{
    let values = layout
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let seed = seed.wrapping_mul(31).wrapping_add(index as u64);
            match field.kind {
                FieldKind::Scalar(scalar) => sample_scalar(scalar, seed),
                FieldKind::Object { .. } | FieldKind::NewObject(_) | FieldKind::Handle => {
                    handles(field.kind)
                }
                FieldKind::Bytes => Value::Bytes((0..seed % 7).map(|b| b as u8).collect()),
                FieldKind::String => Value::String(format!("{}-{seed}", field.name)),
                FieldKind::Array(inner) => Value::Array(
                    (0..seed % 3)
                        .map(|i| sample_record(inner, seed + i, handles))
                        .collect(),
                ),
                FieldKind::OptionalStruct(inner) => Value::Struct(
                    (seed % 2 == 1).then(|| sample_record(inner, seed, handles)),
                ),
            }
        })
        .collect();
    Record::new(values)
}

fn sample_scalar(scalar: ScalarKind, seed: u64) -> Value<Handle> {
    match scalar {
        ScalarKind::Bool => Value::Bool(seed % 2 == 0),
        ScalarKind::U16 => Value::U16(seed as u16),
        ScalarKind::U32 => Value::U32(seed as u32),
        ScalarKind::I32 => Value::I32(-(seed as i32)),
        ScalarKind::U64 => Value::U64(seed << 20),
        ScalarKind::F32 => Value::F32(seed as f32 * 0.5),
        ScalarKind::F64 => Value::F64(seed as f64 * 0.25),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_creates_every_object_type() {
        let mut lo = Loopback::new(RecordingNative::new());
        let live = lo.populate().unwrap();
        assert_eq!(live.len(), ObjectType::COUNT);
        assert_eq!(lo.server.live_objects(), ObjectType::COUNT);
        assert_eq!(lo.native().live_serials().len(), ObjectType::COUNT);
    }

    #[test]
    fn sample_record_varies_array_counts_with_the_seed() {
        let layout = CommandKind::QueueSubmit.layout();
        let counts: BTreeSet<usize> = (0..6)
            .map(|seed| {
                match &sample_record(layout, seed, &mut |_| Value::Object(None)).values[0] {
                    Value::Array(items) => items.len(),
                    other => panic!("unexpected {other:?}"),
                }
            })
            .collect();
        assert!(counts.contains(&0));
        assert!(counts.len() > 1);
    }
}
