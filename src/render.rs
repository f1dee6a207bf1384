//! GPU presentation
//!
//! [`GpuPresenter`] puts composed scenes on a baseview window with vello.
//! Vello renders with compute shaders that can't target surface textures, so
//! each frame is rendered into an intermediate storage texture and blitted.

use std::sync::Arc;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::{debug, error, info};
use vello::kurbo::Affine;
use vello::peniko::Color;
use vello::wgpu;
use vello::{AaConfig, RenderParams, Renderer, RendererOptions, Scene};
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BlendState, ColorTargetState,
    ColorWrites, CompositeAlphaMode, Device, DeviceDescriptor, Features, FragmentState, Instance,
    InstanceDescriptor, Limits, MultisampleState, PipelineLayoutDescriptor, PresentMode,
    PrimitiveState, Queue, RenderPipeline, RenderPipelineDescriptor, Sampler, SamplerBindingType,
    SamplerDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages, Surface,
    SurfaceConfiguration, Texture, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
    VertexState,
};

use crate::error::PresentError;
use crate::window::{BaseviewWindow, FramePresenter, PlatformWindow};

const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Presents frames on the window's GPU surface.
///
/// The surface is created on the first frame, once the native window exists,
/// and follows the window's physical size from then on. If creating it fails
/// the presenter logs the error and drops every later frame.
pub struct GpuPresenter {
    surface: Option<GpuSurface>,
    base_color: Color,
    failed: bool,
    /// Scratch scene for scaling logical-unit frames to physical pixels.
    scaled: Scene,
}

impl GpuPresenter {
    pub fn new() -> Self {
        Self {
            surface: None,
            base_color: Color::from_rgba8(30, 30, 35, 255),
            failed: false,
            scaled: Scene::new(),
        }
    }

    /// Colour shown where the frame draws nothing.
    pub fn with_base_color(mut self, color: Color) -> Self {
        self.base_color = color;
        self
    }

    /// Whether a GPU surface exists.
    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    fn ensure_surface(&mut self, window: &BaseviewWindow) -> Option<&mut GpuSurface> {
        if self.surface.is_none() && !self.failed {
            let (width, height) = window.physical_size();
            let created = match (window.raw_window_handle(), window.raw_display_handle()) {
                // SAFETY: the presenter is owned by the window's handler and
                // dropped with it, so the native window outlives the surface.
                (Some(handle), Some(display)) => unsafe {
                    GpuSurface::new(handle, display, width, height)
                },
                _ => Err(PresentError::NoWindowHandle),
            };
            match created {
                Ok(surface) => {
                    info!(width, height, "GPU surface initialized");
                    self.surface = Some(surface);
                }
                Err(err) => {
                    error!(%err, "Failed to create GPU surface");
                    self.failed = true;
                }
            }
        }
        self.surface.as_mut()
    }
}

impl Default for GpuPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePresenter for GpuPresenter {
    fn present(&mut self, scene: &Scene, window: &BaseviewWindow) {
        if self.ensure_surface(window).is_none() {
            return;
        }
        let (width, height) = window.physical_size();
        let scale = window.scale_factor();

        // Frames are composed in logical units.
        let frame = if scale == 1.0 {
            scene
        } else {
            self.scaled.reset();
            self.scaled.append(scene, Some(Affine::scale(scale)));
            &self.scaled
        };
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.resize(width, height);
        if let Err(err) = surface.render(frame, self.base_color) {
            error!(%err, "Failed to present frame");
        }
    }

    fn resize(&mut self, window: &BaseviewWindow) {
        if let Some(surface) = self.surface.as_mut() {
            let (width, height) = window.physical_size();
            debug!(width, height, "Resizing GPU surface");
            surface.resize(width, height);
        }
    }
}

/// A configured wgpu surface plus the vello renderer drawing into it.
struct GpuSurface {
    device: Arc<Device>,
    queue: Arc<Queue>,
    renderer: Renderer,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    /// Owns the storage `target_view` points into.
    _target: Texture,
    target_view: TextureView,
    blit_pipeline: RenderPipeline,
    blit_layout: BindGroupLayout,
    blit_sampler: Sampler,
}

impl GpuSurface {
    /// # Safety
    ///
    /// The native window behind `handle` must outlive the returned surface.
    unsafe fn new(
        handle: RawWindowHandle,
        display: RawDisplayHandle,
        width: u32,
        height: u32,
    ) -> Result<Self, PresentError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // wgpu speaks raw-window-handle 0.6, baseview 0.5.
        let target = wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle: convert_display_handle(display)?,
            raw_window_handle: convert_window_handle(handle)?,
        };
        let surface = instance
            .create_surface_unsafe(target)
            .map_err(|e| PresentError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| PresentError::Device(format!("Adapter request failed: {e:?}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            required_features: Features::empty(),
            required_limits: Limits::default(),
            label: Some("webview_baseview"),
            memory_hints: wgpu::MemoryHints::default(),
            ..Default::default()
        }))
        .map_err(|e| PresentError::Device(format!("{e:?}")))?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(TextureFormat::Bgra8Unorm);
        let alpha_mode = if caps.alpha_modes.contains(&CompositeAlphaMode::PreMultiplied) {
            CompositeAlphaMode::PreMultiplied
        } else {
            CompositeAlphaMode::Auto
        };

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let (target, target_view) = create_target(&device, config.width, config.height);
        let (blit_pipeline, blit_layout, blit_sampler) = create_blit_pipeline(&device, format);

        let renderer = Renderer::new(
            &device,
            RendererOptions {
                use_cpu: false,
                antialiasing_support: vello::AaSupport::all(),
                num_init_threads: None,
                pipeline_cache: None,
            },
        )
        .map_err(|e| PresentError::Renderer(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            renderer,
            surface,
            config,
            _target: target,
            target_view,
            blit_pipeline,
            blit_layout,
            blit_sampler,
        })
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.size() == (width, height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        (self._target, self.target_view) = create_target(&self.device, width, height);
    }

    fn render(&mut self, scene: &Scene, base_color: Color) -> Result<(), PresentError> {
        let params = RenderParams {
            base_color,
            width: self.config.width,
            height: self.config.height,
            antialiasing_method: AaConfig::Msaa16,
        };
        self.renderer
            .render_to_texture(&self.device, &self.queue, scene, &self.target_view, &params)
            .map_err(|e| PresentError::Renderer(format!("{e:?}")))?;

        let frame = self
            .surface
            .get_current_texture()
            .map_err(|e| PresentError::Surface(e.to_string()))?;
        let frame_view = frame.texture.create_view(&TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout: &self.blit_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&self.target_view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.blit_sampler),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blit_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Storage texture vello renders into.
fn create_target(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("vello_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&TextureViewDescriptor::default());
    (texture, view)
}

const BLIT_SHADER: &str = r#"
    @group(0) @binding(0) var t_frame: texture_2d<f32>;
    @group(0) @binding(1) var s_frame: sampler;

    struct VertexOutput {
        @builtin(position) position: vec4<f32>,
        @location(0) uv: vec2<f32>,
    }

    // One triangle covering the viewport: (-1,-1), (-1,3), (3,-1).
    @vertex
    fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
        var out: VertexOutput;
        let x = f32(i32(index) / 2) * 4.0 - 1.0;
        let y = f32(i32(index) % 2) * 4.0 - 1.0;
        out.position = vec4<f32>(x, y, 0.0, 1.0);
        out.uv = vec2<f32>((x + 1.0) * 0.5, (1.0 - y) * 0.5);
        return out;
    }

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
        return textureSample(t_frame, s_frame, in.uv);
    }
"#;

fn create_blit_pipeline(
    device: &Device,
    surface_format: TextureFormat,
) -> (RenderPipeline, BindGroupLayout, Sampler) {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("blit_shader"),
        source: ShaderSource::Wgsl(BLIT_SHADER.into()),
    });

    let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("blit_bind_group_layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("blit_pipeline_layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("blit_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some("blit_sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    (pipeline, layout, sampler)
}

fn convert_display_handle(
    handle: RawDisplayHandle,
) -> Result<wgpu::rwh::RawDisplayHandle, PresentError> {
    use wgpu::rwh::RawDisplayHandle as New;

    match handle {
        #[cfg(target_os = "macos")]
        RawDisplayHandle::AppKit(_) => Ok(New::AppKit(wgpu::rwh::AppKitDisplayHandle::new())),

        #[cfg(target_os = "linux")]
        RawDisplayHandle::Xlib(h) => Ok(New::Xlib(wgpu::rwh::XlibDisplayHandle::new(
            std::ptr::NonNull::new(h.display),
            h.screen,
        ))),

        #[cfg(target_os = "linux")]
        RawDisplayHandle::Xcb(h) => Ok(New::Xcb(wgpu::rwh::XcbDisplayHandle::new(
            std::ptr::NonNull::new(h.connection),
            h.screen,
        ))),

        #[cfg(target_os = "linux")]
        RawDisplayHandle::Wayland(h) => std::ptr::NonNull::new(h.display)
            .map(|display| New::Wayland(wgpu::rwh::WaylandDisplayHandle::new(display)))
            .ok_or(PresentError::UnsupportedHandle("null Wayland display")),

        #[cfg(target_os = "windows")]
        RawDisplayHandle::Windows(_) => Ok(New::Windows(wgpu::rwh::WindowsDisplayHandle::new())),

        _ => Err(PresentError::UnsupportedHandle("display")),
    }
}

fn convert_window_handle(
    handle: RawWindowHandle,
) -> Result<wgpu::rwh::RawWindowHandle, PresentError> {
    use wgpu::rwh::RawWindowHandle as New;

    match handle {
        #[cfg(target_os = "macos")]
        RawWindowHandle::AppKit(h) => std::ptr::NonNull::new(h.ns_view)
            .map(|view| New::AppKit(wgpu::rwh::AppKitWindowHandle::new(view)))
            .ok_or(PresentError::UnsupportedHandle("null NSView")),

        #[cfg(target_os = "linux")]
        RawWindowHandle::Xlib(h) => Ok(New::Xlib(wgpu::rwh::XlibWindowHandle::new(h.window))),

        #[cfg(target_os = "linux")]
        RawWindowHandle::Xcb(h) => std::num::NonZeroU32::new(h.window)
            .map(|window| New::Xcb(wgpu::rwh::XcbWindowHandle::new(window)))
            .ok_or(PresentError::UnsupportedHandle("null XCB window")),

        #[cfg(target_os = "linux")]
        RawWindowHandle::Wayland(h) => std::ptr::NonNull::new(h.surface)
            .map(|surface| New::Wayland(wgpu::rwh::WaylandWindowHandle::new(surface)))
            .ok_or(PresentError::UnsupportedHandle("null Wayland surface")),

        #[cfg(target_os = "windows")]
        RawWindowHandle::Win32(h) => {
            let hwnd = std::num::NonZeroIsize::new(h.hwnd as isize)
                .ok_or(PresentError::UnsupportedHandle("null HWND"))?;
            let mut win32 = wgpu::rwh::Win32WindowHandle::new(hwnd);
            win32.hinstance = std::num::NonZeroIsize::new(h.hinstance as isize);
            Ok(New::Win32(win32))
        }

        _ => Err(PresentError::UnsupportedHandle("window")),
    }
}
