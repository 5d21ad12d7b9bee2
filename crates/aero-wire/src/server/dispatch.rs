//! One forward command in, one native call out.

use crate::buffer::Consumer;
use crate::error::{WireError, WireResult};
use crate::handle::{Handle, ObjectType};
use crate::schema::{
    deserialize_args, Args, CommandHeader, CommandKind, CommandSchema, DeserializeAllocator,
    HandleIds,
};
use crate::types::{
    BufferUsages, ColorWrites, ErrorFilter, ErrorType, FeatureName, MapMode, PowerPreference,
    RequestAdapterOptions, ShaderStages, TextureUsages,
};

use super::completion::{
    AdapterCompletion, CompilationInfoCompletion, DeviceCompletion, MapAsyncCompletion,
    PipelineCompletion, PopErrorScopeCompletion, ReturnSink, WorkDoneCompletion,
};
use super::known::{ObjectRef, ObjectTables};
use super::native::*;

type Fields<'r, 'a, T> = Args<'r, ObjectRef<'a, T>>;

/// Table change to apply once the decoded command no longer borrows the
/// object tables.
enum Effect<T> {
    None,
    Insert(ObjectType, Handle, T),
    Reserve(ObjectType, Handle),
}

/// Decode and execute one whole command.
///
/// `bytes` is exactly one command as delivered by the chunked handler. Any
/// error is fatal to the channel.
pub(crate) fn dispatch<N: NativeApi>(
    bytes: &[u8],
    allocator: &mut DeserializeAllocator,
    objects: &mut ObjectTables<N::Object>,
    native: &mut N,
    sink: &ReturnSink<N::Object>,
) -> WireResult<()> {
    allocator.reset();
    let mut consumer = Consumer::new(bytes);
    let header = CommandHeader::read(&mut consumer)?;
    if header.size != bytes.len() {
        return Err(WireError::InvalidCommandSize {
            size: header.size,
            min: bytes.len(),
            max: bytes.len(),
        });
    }
    let kind =
        CommandKind::from_tag(header.tag).ok_or(WireError::UnknownCommand { tag: header.tag })?;
    let layout = kind.layout();
    tracing::trace!(command = kind.name(), size = header.size, "dispatching");

    if matches!(kind, CommandKind::DestroyObject | CommandKind::SetLabel) {
        let record = deserialize_args(layout, &mut consumer, allocator, &HandleIds)?;
        consumer.expect_empty()?;
        let mut args = record.args(layout);
        let ty = ObjectType::from_u32(args.u32()?)?;
        let handle = args.handle()?;
        if kind == CommandKind::DestroyObject {
            let object = objects.table_mut(ty).remove(handle)?;
            native.release(ty, object);
        } else {
            let label = args.string()?;
            native.set_label(ty, objects.table(ty).get(handle)?, label);
        }
        return Ok(());
    }

    let effect = {
        let resolver: &ObjectTables<N::Object> = objects;
        let record = deserialize_args(layout, &mut consumer, allocator, &resolver)?;
        consumer.expect_empty()?;
        execute(kind, &mut record.args(layout), resolver, native, sink)?
    };

    match effect {
        Effect::None => Ok(()),
        Effect::Insert(ty, handle, object) => objects.table_mut(ty).insert(handle, object),
        Effect::Reserve(ty, handle) => objects.table_mut(ty).reserve(handle),
    }
}

fn obj<'a, T>(args: &mut Fields<'_, 'a, T>) -> WireResult<&'a T> {
    Ok(args.object()?.object)
}

fn optional_obj<'a, T>(args: &mut Fields<'_, 'a, T>) -> WireResult<Option<&'a T>> {
    Ok(args.optional_object()?.map(|r| r.object))
}

/// Check the slot is free, then build the object.
fn create<T>(
    objects: &ObjectTables<T>,
    ty: ObjectType,
    handle: Handle,
    make: impl FnOnce() -> T,
) -> WireResult<Effect<T>> {
    objects.table(ty).check_vacant(handle)?;
    Ok(Effect::Insert(ty, handle, make()))
}

fn origin<T>(args: &mut Fields<'_, '_, T>) -> WireResult<Origin3d> {
    Ok(Origin3d {
        x: args.u32()?,
        y: args.u32()?,
        z: args.u32()?,
    })
}

fn extent<T>(args: &mut Fields<'_, '_, T>) -> WireResult<Extent3d> {
    Ok(Extent3d {
        width: args.u32()?,
        height: args.u32()?,
        depth_or_array_layers: args.u32()?,
    })
}

fn image_copy_texture<'a, T>(
    args: &mut Fields<'_, 'a, T>,
) -> WireResult<ImageCopyTexture<'a, T>> {
    Ok(ImageCopyTexture {
        texture: obj(args)?,
        mip_level: args.u32()?,
        origin: origin(args)?,
        aspect: args.u32()?,
    })
}

fn image_copy_buffer<'a, T>(args: &mut Fields<'_, 'a, T>) -> WireResult<ImageCopyBuffer<'a, T>> {
    Ok(ImageCopyBuffer {
        buffer: obj(args)?,
        layout: TextureDataLayout {
            offset: args.u64()?,
            bytes_per_row: args.u32()?,
            rows_per_image: args.u32()?,
        },
    })
}

fn dynamic_offsets<T>(args: &mut Fields<'_, '_, T>) -> WireResult<Vec<u32>> {
    args.collect(|item| item.u32())
}

fn compute_pipeline<'r, 'a: 'r, T>(
    args: &mut Fields<'r, 'a, T>,
) -> WireResult<ComputePipelineDescriptor<'r, T>> {
    let label = args.string()?;
    let layout = optional_obj(args)?;
    let module = obj(args)?;
    let entry_point = args.string()?;
    let constants = args.collect(|c| {
        Ok(ConstantEntry {
            key: c.string()?,
            value: c.f64()?,
        })
    })?;
    Ok(ComputePipelineDescriptor {
        label,
        layout,
        compute: ProgrammableStage {
            module,
            entry_point,
            constants,
        },
    })
}

fn render_pipeline<'r, 'a: 'r, T>(
    args: &mut Fields<'r, 'a, T>,
) -> WireResult<RenderPipelineDescriptor<'r, T>> {
    let label = args.string()?;
    let layout = optional_obj(args)?;
    let module = obj(args)?;
    let entry_point = args.string()?;
    let buffers = args.collect(|b| {
        Ok(VertexBufferLayout {
            array_stride: b.u64()?,
            step_mode: b.u32()?,
            attributes: b.collect(|a| {
                Ok(VertexAttribute {
                    format: a.u32()?,
                    offset: a.u64()?,
                    shader_location: a.u32()?,
                })
            })?,
        })
    })?;
    let primitive = PrimitiveState {
        topology: args.u32()?,
        strip_index_format: args.u32()?,
        front_face: args.u32()?,
        cull_mode: args.u32()?,
    };
    let depth_stencil = match args.optional_struct()? {
        Some(mut ds) => Some(DepthStencilState {
            format: ds.u32()?,
            depth_write_enabled: ds.bool()?,
            depth_compare: ds.u32()?,
        }),
        None => None,
    };
    let multisample = MultisampleState {
        count: args.u32()?,
        mask: args.u32()?,
    };
    let fragment = match args.optional_struct()? {
        Some(mut fs) => Some(FragmentState {
            module: obj(&mut fs)?,
            entry_point: fs.string()?,
            targets: fs.collect(|t| {
                Ok(ColorTargetState {
                    format: t.u32()?,
                    write_mask: ColorWrites::from_bits_retain(t.u32()?),
                })
            })?,
        }),
        None => None,
    };
    Ok(RenderPipelineDescriptor {
        label,
        layout,
        vertex: VertexState {
            module,
            entry_point,
            buffers,
        },
        primitive,
        depth_stencil,
        multisample,
        fragment,
    })
}

fn render_pass<'r, 'a: 'r, T>(
    args: &mut Fields<'r, 'a, T>,
) -> WireResult<RenderPassDescriptor<'r, T>> {
    let label = args.string()?;
    let color_attachments = args.collect(|c| {
        Ok(RenderPassColorAttachment {
            view: optional_obj(c)?,
            resolve_target: optional_obj(c)?,
            load_op: c.u32()?,
            store_op: c.u32()?,
            clear_value: Color {
                r: c.f64()?,
                g: c.f64()?,
                b: c.f64()?,
                a: c.f64()?,
            },
        })
    })?;
    let depth_stencil_attachment = match args.optional_struct()? {
        Some(mut ds) => Some(RenderPassDepthStencilAttachment {
            view: obj(&mut ds)?,
            depth_load_op: ds.u32()?,
            depth_store_op: ds.u32()?,
            depth_clear_value: ds.f32()?,
            depth_read_only: ds.bool()?,
            stencil_load_op: ds.u32()?,
            stencil_store_op: ds.u32()?,
            stencil_clear_value: ds.u32()?,
            stencil_read_only: ds.bool()?,
        }),
        None => None,
    };
    Ok(RenderPassDescriptor {
        label,
        color_attachments,
        depth_stencil_attachment,
    })
}

fn execute<'r, 'a: 'r, N: NativeApi>(
    kind: CommandKind,
    args: &mut Fields<'r, 'a, N::Object>,
    objects: &ObjectTables<N::Object>,
    native: &mut N,
    sink: &ReturnSink<N::Object>,
) -> WireResult<Effect<N::Object>> {
    use crate::schema::CommandKind as K;

    let effect = match kind {
        K::DestroyObject | K::SetLabel => {
            return Err(WireError::SchemaMismatch {
                layout: kind.layout().name,
                field: "object_type",
            })
        }
        K::InstanceRequestAdapter => {
            let serial = args.u64()?;
            let result = args.new_object()?;
            let options = RequestAdapterOptions {
                power_preference: PowerPreference::from_u32(args.u32()?),
                force_fallback_adapter: args.bool()?,
            };
            let ty = ObjectType::Adapter;
            objects.table(ty).check_vacant(result)?;
            let completion = AdapterCompletion::new(sink.clone(), result, serial);
            native.instance_request_adapter(&options, completion);
            Effect::Reserve(ty, result)
        }
        K::AdapterRequestDevice => {
            let adapter = args.object()?;
            let serial = args.u64()?;
            let result = args.new_object()?;
            let desc = DeviceDescriptor {
                label: args.string()?,
                required_features: args.collect(|f| Ok(FeatureName::from_u32(f.u32()?)))?,
            };
            let ty = ObjectType::Device;
            objects.table(ty).check_vacant(result)?;
            let completion = DeviceCompletion::new(sink.clone(), adapter.handle, result, serial);
            native.adapter_request_device(adapter.object, &desc, completion);
            Effect::Reserve(ty, result)
        }
        K::CreateBuffer => {
            let result = args.new_object()?;
            let label = args.string()?;
            create(objects, ObjectType::Buffer, result, || native.create_buffer(label))?
        }
        K::BufferStorage => {
            let buffer = obj(args)?;
            let size = args.u64()?;
            let usage = BufferUsages::from_bits_retain(args.u32()?);
            let mapped_at_creation = args.bool()?;
            native.buffer_storage(buffer, size, usage, mapped_at_creation);
            Effect::None
        }
        K::BufferMapAsync => {
            let buffer = args.object()?;
            let serial = args.u64()?;
            let mode = MapMode::from_bits_retain(args.u32()?);
            let offset = args.u64()?;
            let size = args.u64()?;
            let completion = MapAsyncCompletion::new(sink.clone(), buffer.handle, serial);
            native.buffer_map_async(buffer.object, mode, offset, size, completion);
            Effect::None
        }
        K::BufferUpdateMappedData => {
            let buffer = obj(args)?;
            let offset = args.u64()?;
            native.buffer_update_mapped_data(buffer, offset, args.bytes()?);
            Effect::None
        }
        K::BufferUnmap => {
            native.buffer_unmap(obj(args)?);
            Effect::None
        }
        K::BufferDestroy => {
            native.buffer_destroy(obj(args)?);
            Effect::None
        }
        K::CreateTexture => {
            let result = args.new_object()?;
            let desc = TextureDescriptor {
                label: args.string()?,
                size: Extent3d {
                    width: args.u32()?,
                    height: args.u32()?,
                    depth_or_array_layers: args.u32()?,
                },
                mip_level_count: args.u32()?,
                sample_count: args.u32()?,
                dimension: args.u32()?,
                format: args.u32()?,
                usage: TextureUsages::from_bits_retain(args.u32()?),
                view_formats: args.collect(|f| f.u32())?,
            };
            create(objects, ObjectType::Texture, result, || native.create_texture(&desc))?
        }
        K::TextureCreateView => {
            let texture = obj(args)?;
            let result = args.new_object()?;
            let desc = TextureViewDescriptor {
                label: args.string()?,
                format: args.u32()?,
                dimension: args.u32()?,
                aspect: args.u32()?,
                base_mip_level: args.u32()?,
                mip_level_count: args.u32()?,
                base_array_layer: args.u32()?,
                array_layer_count: args.u32()?,
            };
            create(objects, ObjectType::TextureView, result, || {
                native.texture_create_view(texture, &desc)
            })?
        }
        K::TextureDestroy => {
            native.texture_destroy(obj(args)?);
            Effect::None
        }
        K::CreateSampler => {
            let result = args.new_object()?;
            let desc = SamplerDescriptor {
                label: args.string()?,
                address_modes: [args.u32()?, args.u32()?, args.u32()?],
                mag_filter: args.u32()?,
                min_filter: args.u32()?,
                mipmap_filter: args.u32()?,
                lod_min_clamp: args.f32()?,
                lod_max_clamp: args.f32()?,
                compare: args.u32()?,
                max_anisotropy: args.u16()?,
            };
            create(objects, ObjectType::Sampler, result, || native.create_sampler(&desc))?
        }
        K::CreateShaderModule => {
            let result = args.new_object()?;
            let label = args.string()?;
            let code = args.string()?;
            create(objects, ObjectType::ShaderModule, result, || {
                native.create_shader_module(label, code)
            })?
        }
        K::ShaderModuleGetCompilationInfo => {
            let module = args.object()?;
            let serial = args.u64()?;
            let completion = CompilationInfoCompletion::new(sink.clone(), module.handle, serial);
            native.shader_module_get_compilation_info(module.object, completion);
            Effect::None
        }
        K::CreateBindGroupLayout => {
            let result = args.new_object()?;
            let desc = BindGroupLayoutDescriptor {
                label: args.string()?,
                entries: args.collect(|e| {
                    Ok(BindGroupLayoutEntry {
                        binding: e.u32()?,
                        visibility: ShaderStages::from_bits_retain(e.u32()?),
                        binding_type: e.u32()?,
                        has_dynamic_offset: e.bool()?,
                        min_binding_size: e.u64()?,
                    })
                })?,
            };
            create(objects, ObjectType::BindGroupLayout, result, || {
                native.create_bind_group_layout(&desc)
            })?
        }
        K::CreateBindGroup => {
            let result = args.new_object()?;
            let label = args.string()?;
            let layout = obj(args)?;
            let entries = args.collect(|e| {
                Ok(BindGroupEntry {
                    binding: e.u32()?,
                    buffer: optional_obj(e)?,
                    offset: e.u64()?,
                    size: e.u64()?,
                    sampler: optional_obj(e)?,
                    texture_view: optional_obj(e)?,
                })
            })?;
            let desc = BindGroupDescriptor {
                label,
                layout,
                entries,
            };
            create(objects, ObjectType::BindGroup, result, || native.create_bind_group(&desc))?
        }
        K::CreatePipelineLayout => {
            let result = args.new_object()?;
            let desc = PipelineLayoutDescriptor {
                label: args.string()?,
                bind_group_layouts: args.collect(|e| obj(e))?,
            };
            create(objects, ObjectType::PipelineLayout, result, || {
                native.create_pipeline_layout(&desc)
            })?
        }
        K::CreateComputePipeline => {
            let result = args.new_object()?;
            let desc = compute_pipeline(args)?;
            create(objects, ObjectType::ComputePipeline, result, || {
                native.create_compute_pipeline(&desc)
            })?
        }
        K::CreateComputePipelineAsync => {
            let serial = args.u64()?;
            let result = args.new_object()?;
            let desc = compute_pipeline(args)?;
            let ty = ObjectType::ComputePipeline;
            objects.table(ty).check_vacant(result)?;
            let completion = PipelineCompletion::new(sink.clone(), ty, result, serial);
            native.create_compute_pipeline_async(&desc, completion);
            Effect::Reserve(ty, result)
        }
        K::CreateRenderPipeline => {
            let result = args.new_object()?;
            let desc = render_pipeline(args)?;
            create(objects, ObjectType::RenderPipeline, result, || {
                native.create_render_pipeline(&desc)
            })?
        }
        K::CreateRenderPipelineAsync => {
            let serial = args.u64()?;
            let result = args.new_object()?;
            let desc = render_pipeline(args)?;
            let ty = ObjectType::RenderPipeline;
            objects.table(ty).check_vacant(result)?;
            let completion = PipelineCompletion::new(sink.clone(), ty, result, serial);
            native.create_render_pipeline_async(&desc, completion);
            Effect::Reserve(ty, result)
        }
        K::RenderPipelineGetBindGroupLayout => {
            let pipeline = obj(args)?;
            let group_index = args.u32()?;
            let result = args.new_object()?;
            create(objects, ObjectType::BindGroupLayout, result, || {
                native.render_pipeline_get_bind_group_layout(pipeline, group_index)
            })?
        }
        K::ComputePipelineGetBindGroupLayout => {
            let pipeline = obj(args)?;
            let group_index = args.u32()?;
            let result = args.new_object()?;
            create(objects, ObjectType::BindGroupLayout, result, || {
                native.compute_pipeline_get_bind_group_layout(pipeline, group_index)
            })?
        }
        K::CreateCommandEncoder => {
            let result = args.new_object()?;
            let label = args.string()?;
            create(objects, ObjectType::CommandEncoder, result, || {
                native.create_command_encoder(label)
            })?
        }
        K::CommandEncoderBeginRenderPass => {
            let encoder = obj(args)?;
            let result = args.new_object()?;
            let desc = render_pass(args)?;
            create(objects, ObjectType::RenderPassEncoder, result, || {
                native.command_encoder_begin_render_pass(encoder, &desc)
            })?
        }
        K::CommandEncoderBeginComputePass => {
            let encoder = obj(args)?;
            let result = args.new_object()?;
            let label = args.string()?;
            create(objects, ObjectType::ComputePassEncoder, result, || {
                native.command_encoder_begin_compute_pass(encoder, label)
            })?
        }
        K::CommandEncoderCopyBufferToBuffer => {
            let encoder = obj(args)?;
            let source = obj(args)?;
            let source_offset = args.u64()?;
            let destination = obj(args)?;
            let destination_offset = args.u64()?;
            let size = args.u64()?;
            native.command_encoder_copy_buffer_to_buffer(
                encoder,
                source,
                source_offset,
                destination,
                destination_offset,
                size,
            );
            Effect::None
        }
        K::CommandEncoderClearBuffer => {
            let encoder = obj(args)?;
            let buffer = obj(args)?;
            let offset = args.u64()?;
            let size = args.u64()?;
            native.command_encoder_clear_buffer(encoder, buffer, offset, size);
            Effect::None
        }
        K::CommandEncoderCopyBufferToTexture => {
            let encoder = obj(args)?;
            let source = image_copy_buffer(args)?;
            let destination = image_copy_texture(args)?;
            let size = extent(args)?;
            native.command_encoder_copy_buffer_to_texture(encoder, &source, &destination, size);
            Effect::None
        }
        K::CommandEncoderCopyTextureToBuffer => {
            let encoder = obj(args)?;
            let source = image_copy_texture(args)?;
            let destination = image_copy_buffer(args)?;
            let size = extent(args)?;
            native.command_encoder_copy_texture_to_buffer(encoder, &source, &destination, size);
            Effect::None
        }
        K::CommandEncoderCopyTextureToTexture => {
            let encoder = obj(args)?;
            let source = image_copy_texture(args)?;
            let destination = image_copy_texture(args)?;
            let size = extent(args)?;
            native.command_encoder_copy_texture_to_texture(encoder, &source, &destination, size);
            Effect::None
        }
        K::CommandEncoderPushDebugGroup => {
            let encoder = obj(args)?;
            native.command_encoder_push_debug_group(encoder, args.string()?);
            Effect::None
        }
        K::CommandEncoderPopDebugGroup => {
            native.command_encoder_pop_debug_group(obj(args)?);
            Effect::None
        }
        K::CommandEncoderInsertDebugMarker => {
            let encoder = obj(args)?;
            native.command_encoder_insert_debug_marker(encoder, args.string()?);
            Effect::None
        }
        K::CommandEncoderFinish => {
            let encoder = obj(args)?;
            let result = args.new_object()?;
            let label = args.string()?;
            create(objects, ObjectType::CommandBuffer, result, || {
                native.command_encoder_finish(encoder, label)
            })?
        }
        K::RenderPassSetPipeline => {
            let pass = obj(args)?;
            native.render_pass_set_pipeline(pass, obj(args)?);
            Effect::None
        }
        K::RenderPassSetBindGroup => {
            let pass = obj(args)?;
            let group_index = args.u32()?;
            let group = optional_obj(args)?;
            let offsets = dynamic_offsets(args)?;
            native.render_pass_set_bind_group(pass, group_index, group, &offsets);
            Effect::None
        }
        K::RenderPassSetVertexBuffer => {
            let pass = obj(args)?;
            let slot = args.u32()?;
            let buffer = optional_obj(args)?;
            let offset = args.u64()?;
            let size = args.u64()?;
            native.render_pass_set_vertex_buffer(pass, slot, buffer, offset, size);
            Effect::None
        }
        K::RenderPassSetIndexBuffer => {
            let pass = obj(args)?;
            let buffer = obj(args)?;
            let format = args.u32()?;
            let offset = args.u64()?;
            let size = args.u64()?;
            native.render_pass_set_index_buffer(pass, buffer, format, offset, size);
            Effect::None
        }
        K::RenderPassSetViewport => {
            let pass = obj(args)?;
            let viewport = Viewport {
                x: args.f32()?,
                y: args.f32()?,
                width: args.f32()?,
                height: args.f32()?,
                min_depth: args.f32()?,
                max_depth: args.f32()?,
            };
            native.render_pass_set_viewport(pass, &viewport);
            Effect::None
        }
        K::RenderPassSetScissorRect => {
            let pass = obj(args)?;
            let rect = ScissorRect {
                x: args.u32()?,
                y: args.u32()?,
                width: args.u32()?,
                height: args.u32()?,
            };
            native.render_pass_set_scissor_rect(pass, &rect);
            Effect::None
        }
        K::RenderPassDraw => {
            let pass = obj(args)?;
            let (vertex_count, instance_count) = (args.u32()?, args.u32()?);
            let (first_vertex, first_instance) = (args.u32()?, args.u32()?);
            native.render_pass_draw(
                pass,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
            Effect::None
        }
        K::RenderPassDrawIndexed => {
            let pass = obj(args)?;
            let (index_count, instance_count, first_index) = (args.u32()?, args.u32()?, args.u32()?);
            let (base_vertex, first_instance) = (args.i32()?, args.u32()?);
            native.render_pass_draw_indexed(
                pass,
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            );
            Effect::None
        }
        K::RenderPassDrawIndirect => {
            let pass = obj(args)?;
            let buffer = obj(args)?;
            native.render_pass_draw_indirect(pass, buffer, args.u64()?);
            Effect::None
        }
        K::RenderPassDrawIndexedIndirect => {
            let pass = obj(args)?;
            let buffer = obj(args)?;
            native.render_pass_draw_indexed_indirect(pass, buffer, args.u64()?);
            Effect::None
        }
        K::RenderPassSetBlendConstant => {
            let pass = obj(args)?;
            let color = Color {
                r: args.f64()?,
                g: args.f64()?,
                b: args.f64()?,
                a: args.f64()?,
            };
            native.render_pass_set_blend_constant(pass, &color);
            Effect::None
        }
        K::RenderPassSetStencilReference => {
            let pass = obj(args)?;
            native.render_pass_set_stencil_reference(pass, args.u32()?);
            Effect::None
        }
        K::RenderPassPushDebugGroup => {
            let pass = obj(args)?;
            native.render_pass_push_debug_group(pass, args.string()?);
            Effect::None
        }
        K::RenderPassPopDebugGroup => {
            native.render_pass_pop_debug_group(obj(args)?);
            Effect::None
        }
        K::RenderPassInsertDebugMarker => {
            let pass = obj(args)?;
            native.render_pass_insert_debug_marker(pass, args.string()?);
            Effect::None
        }
        K::RenderPassEnd => {
            native.render_pass_end(obj(args)?);
            Effect::None
        }
        K::ComputePassSetPipeline => {
            let pass = obj(args)?;
            native.compute_pass_set_pipeline(pass, obj(args)?);
            Effect::None
        }
        K::ComputePassSetBindGroup => {
            let pass = obj(args)?;
            let group_index = args.u32()?;
            let group = optional_obj(args)?;
            let offsets = dynamic_offsets(args)?;
            native.compute_pass_set_bind_group(pass, group_index, group, &offsets);
            Effect::None
        }
        K::ComputePassDispatchWorkgroups => {
            let pass = obj(args)?;
            let (x, y, z) = (args.u32()?, args.u32()?, args.u32()?);
            native.compute_pass_dispatch_workgroups(pass, x, y, z);
            Effect::None
        }
        K::ComputePassDispatchWorkgroupsIndirect => {
            let pass = obj(args)?;
            let buffer = obj(args)?;
            native.compute_pass_dispatch_workgroups_indirect(pass, buffer, args.u64()?);
            Effect::None
        }
        K::ComputePassPushDebugGroup => {
            let pass = obj(args)?;
            native.compute_pass_push_debug_group(pass, args.string()?);
            Effect::None
        }
        K::ComputePassPopDebugGroup => {
            native.compute_pass_pop_debug_group(obj(args)?);
            Effect::None
        }
        K::ComputePassInsertDebugMarker => {
            let pass = obj(args)?;
            native.compute_pass_insert_debug_marker(pass, args.string()?);
            Effect::None
        }
        K::ComputePassEnd => {
            native.compute_pass_end(obj(args)?);
            Effect::None
        }
        K::QueueSubmit => {
            let command_buffers = args.collect(|c| obj(c))?;
            native.queue_submit(&command_buffers);
            Effect::None
        }
        K::QueueWriteBuffer => {
            let buffer = obj(args)?;
            let offset = args.u64()?;
            native.queue_write_buffer(buffer, offset, args.bytes()?);
            Effect::None
        }
        K::QueueWriteTexture => {
            let destination = image_copy_texture(args)?;
            let data = args.bytes()?;
            let layout = TextureDataLayout {
                offset: args.u64()?,
                bytes_per_row: args.u32()?,
                rows_per_image: args.u32()?,
            };
            let size = extent(args)?;
            native.queue_write_texture(&destination, data, &layout, size);
            Effect::None
        }
        K::QueueOnSubmittedWorkDone => {
            let serial = args.u64()?;
            native.queue_on_submitted_work_done(WorkDoneCompletion::new(sink.clone(), serial));
            Effect::None
        }
        K::DevicePushErrorScope => {
            native.device_push_error_scope(ErrorFilter::from_u32(args.u32()?));
            Effect::None
        }
        K::DevicePopErrorScope => {
            let serial = args.u64()?;
            native.device_pop_error_scope(PopErrorScopeCompletion::new(sink.clone(), serial));
            Effect::None
        }
        K::DeviceInjectError => {
            let error_type = ErrorType::from_u32(args.u32()?);
            native.device_inject_error(error_type, args.string()?);
            Effect::None
        }
        K::DeviceTick => {
            native.device_tick();
            Effect::None
        }
        K::DeviceDestroy => {
            native.device_destroy();
            Effect::None
        }
    };
    Ok(effect)
}
