use wgpu::*;

use crate::config::{FogConfig, LightingConfig};
use crate::model::{Appearance, Camera, Scene};
use crate::utils::{MeshBuffer, Vertex};

/// Per-frame shared uniform. vec4 slots keep the layout identical between
/// here and the WGSL declarations without manual padding fields.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub ambient: [f32; 4],
    pub sun_dir: [f32; 4],
    pub point_color: [f32; 4],
    pub camera_pos: [f32; 4],
    /// rgb = fog color, w = fog near
    pub fog_color_near: [f32; 4],
    /// x = fog far
    pub fog_params: [f32; 4],
}

/// Per-object uniform, written every frame from the object's live transform.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub mvp: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
}

enum ObjectBinding {
    Flat {
        bind_group: BindGroup,
    },
    /// Textured objects carry one bind group per sampler so the mipmap
    /// toggle is a per-draw choice, not a rebind.
    Textured {
        bilinear: BindGroup,
        trilinear: BindGroup,
    },
}

struct DrawObject {
    mesh: MeshBuffer,
    uniform_buffer: Buffer,
    binding: ObjectBinding,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> TextureView {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Depth32Float,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth_texture.create_view(&TextureViewDescriptor::default())
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Upload an image with a full CPU-generated mip chain.
fn upload_texture(device: &Device, queue: &Queue, image: &image::RgbaImage) -> TextureView {
    let (width, height) = image.dimensions();
    let mip_count = mip_level_count(width, height);

    let texture = device.create_texture(&TextureDescriptor {
        label: Some("object_texture"),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: mip_count,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut level_image = image.clone();
    for level in 0..mip_count {
        if level > 0 {
            level_image = image::imageops::resize(
                &level_image,
                (width >> level).max(1),
                (height >> level).max(1),
                image::imageops::FilterType::Triangle,
            );
        }
        let (lw, lh) = level_image.dimensions();
        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &level_image,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * lw),
                rows_per_image: Some(lh),
            },
            Extent3d {
                width: lw,
                height: lh,
                depth_or_array_layers: 1,
            },
        );
    }

    texture.create_view(&TextureViewDescriptor::default())
}

fn vertex_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes: &[
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x3,
            },
            VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: VertexFormat::Float32x3,
            },
            VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: VertexFormat::Float32x2,
            },
        ],
    }
}

fn create_pipeline(
    device: &Device,
    label: &str,
    shader_src: &str,
    format: TextureFormat,
    layouts: &[&BindGroupLayout],
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// All GPU-side scene state: pipelines, per-object buffers/bind groups, the
/// depth buffer and the egui overlay renderer.
pub struct SceneRenderer {
    config: SurfaceConfiguration,
    depth_view: TextureView,

    flat_pipeline: RenderPipeline,
    textured_pipeline: RenderPipeline,
    frame_buffer: Buffer,
    frame_bind_group: BindGroup,
    objects: Vec<DrawObject>,
    mipmap_on: bool,

    lighting: LightingConfig,
    fog: FogConfig,

    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_textures_delta: Option<egui::TexturesDelta>,
    pub egui_pixels_per_point: f32,
}

impl SceneRenderer {
    pub fn new(
        device: &Device,
        queue: &Queue,
        config: &SurfaceConfiguration,
        scene: &Scene,
        lighting: LightingConfig,
        fog: FogConfig,
    ) -> Self {
        let depth_view = create_depth_texture(device, config.width, config.height);

        let frame_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("frame_uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_uniform_entry = BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let flat_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("flat_object_bind_group_layout"),
            entries: &[object_uniform_entry],
        });

        let textured_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("textured_object_bind_group_layout"),
            entries: &[
                object_uniform_entry,
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let flat_pipeline = create_pipeline(
            device,
            "flat_pipeline",
            include_str!("../shaders/flat.wgsl"),
            config.format,
            &[&frame_bgl, &flat_bgl],
        );
        let textured_pipeline = create_pipeline(
            device,
            "textured_pipeline",
            include_str!("../shaders/textured.wgsl"),
            config.format,
            &[&frame_bgl, &textured_bgl],
        );

        // pinned to the top mip level
        let bilinear_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("bilinear_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 0.0,
            ..Default::default()
        });
        let trilinear_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("trilinear_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        });

        let mut objects = Vec::with_capacity(scene.objects.len());
        for object in &scene.objects {
            let uniform_buffer = device.create_buffer(&BufferDescriptor {
                label: Some(&format!("object_uniform_{}", object.name)),
                size: std::mem::size_of::<ObjectUniform>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let binding = match &object.appearance {
                Appearance::Flat { .. } => ObjectBinding::Flat {
                    bind_group: device.create_bind_group(&BindGroupDescriptor {
                        label: Some(&format!("flat_bind_group_{}", object.name)),
                        layout: &flat_bgl,
                        entries: &[BindGroupEntry {
                            binding: 0,
                            resource: uniform_buffer.as_entire_binding(),
                        }],
                    }),
                },
                Appearance::Textured { image } => {
                    let texture_view = upload_texture(device, queue, image);
                    let make = |sampler: &Sampler, label: &str| {
                        device.create_bind_group(&BindGroupDescriptor {
                            label: Some(label),
                            layout: &textured_bgl,
                            entries: &[
                                BindGroupEntry {
                                    binding: 0,
                                    resource: uniform_buffer.as_entire_binding(),
                                },
                                BindGroupEntry {
                                    binding: 1,
                                    resource: BindingResource::TextureView(&texture_view),
                                },
                                BindGroupEntry {
                                    binding: 2,
                                    resource: BindingResource::Sampler(sampler),
                                },
                            ],
                        })
                    };
                    ObjectBinding::Textured {
                        bilinear: make(
                            &bilinear_sampler,
                            &format!("textured_bind_group_{}_bilinear", object.name),
                        ),
                        trilinear: make(
                            &trilinear_sampler,
                            &format!("textured_bind_group_{}_trilinear", object.name),
                        ),
                    }
                }
            };

            objects.push(DrawObject {
                mesh: object.mesh.upload(device),
                uniform_buffer,
                binding,
            });
        }

        let egui_renderer =
            egui_wgpu::Renderer::new(device, config.format, egui_wgpu::RendererOptions::default());

        Self {
            config: config.clone(),
            depth_view,
            flat_pipeline,
            textured_pipeline,
            frame_buffer,
            frame_bind_group,
            objects,
            mipmap_on: false,
            lighting,
            fog,
            egui_renderer,
            egui_primitives: None,
            egui_textures_delta: None,
            egui_pixels_per_point: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        surface.configure(device, &self.config);
        self.depth_view = create_depth_texture(device, width, height);
    }

    /// Write the frame and per-object uniforms for this frame's camera and
    /// scene transforms.
    pub fn update(
        &mut self,
        queue: &Queue,
        scene: &Scene,
        camera: &Camera,
        point_light_on: bool,
        mipmap_on: bool,
    ) {
        self.mipmap_on = mipmap_on;

        let point_color = if point_light_on {
            self.lighting.point_light
        } else {
            [0.0, 0.0, 0.0]
        };
        let frame = FrameUniform {
            ambient: vec4(self.lighting.ambient, 0.0),
            sun_dir: vec4(self.lighting.sun_direction, 0.0),
            point_color: vec4(point_color, 0.0),
            camera_pos: vec4(camera.eye.to_array(), 1.0),
            fog_color_near: vec4(self.fog.color, self.fog.near),
            fog_params: [self.fog.far, 0.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let view_proj = camera.view_proj();
        for (object, draw) in scene.objects.iter().zip(&self.objects) {
            let model = object.transform;
            let color = match &object.appearance {
                Appearance::Flat { color } => *color,
                Appearance::Textured { .. } => [1.0, 1.0, 1.0, 1.0],
            };
            let uniform = ObjectUniform {
                model: model.to_cols_array_2d(),
                mvp: (view_proj * model).to_cols_array_2d(),
                normal: model.inverse().transpose().to_cols_array_2d(),
                color,
            };
            queue.write_buffer(&draw.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }

    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
    ) -> Result<(), SurfaceError> {
        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.frame_bind_group, &[]);
            for draw in &self.objects {
                match &draw.binding {
                    ObjectBinding::Flat { bind_group } => {
                        rp.set_pipeline(&self.flat_pipeline);
                        rp.set_bind_group(1, bind_group, &[]);
                    }
                    ObjectBinding::Textured { bilinear, trilinear } => {
                        rp.set_pipeline(&self.textured_pipeline);
                        let bind_group = if self.mipmap_on { trilinear } else { bilinear };
                        rp.set_bind_group(1, bind_group, &[]);
                    }
                }
                rp.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(draw.mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
            }
        }

        // HUD overlay, when the frame loop produced one
        if let (Some(primitives), Some(textures_delta)) =
            (self.egui_primitives.take(), self.egui_textures_delta.take())
        {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: self.egui_pixels_per_point,
            };
            for (id, image_delta) in &textures_delta.set {
                self.egui_renderer
                    .update_texture(device, queue, *id, image_delta);
            }
            self.egui_renderer.update_buffers(
                device,
                queue,
                &mut encoder,
                &primitives,
                &screen_descriptor,
            );
            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("hud_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Load,
                            store: StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer.render(
                    &mut egui_pass.forget_lifetime(),
                    &primitives,
                    &screen_descriptor,
                );
            }
            for id in &textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn vec4(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_covers_down_to_one_texel() {
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(640, 480), 10);
    }
}
