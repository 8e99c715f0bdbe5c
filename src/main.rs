use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::Window,
};

use scenewalk::assets;
use scenewalk::config::SceneConfig;
use scenewalk::controller::input::native::key_name;
use scenewalk::controller::{CameraController, InputEvent, InputProcessor, InputState};
use scenewalk::model::{Camera, Scene};
use scenewalk::view::{GpuContext, SceneRenderer};
use scenewalk::{logging, ui};

#[derive(Parser)]
#[command(name = "scenewalk", about = "Interactive 3D scene viewer")]
struct Args {
    /// Scene description file
    #[arg(default_value = "scene.toml")]
    scene: String,

    /// Resource load timeout in seconds
    #[arg(long, default_value_t = 20)]
    load_timeout: u64,
}

struct App {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    size: winit::dpi::PhysicalSize<u32>,
    window: Arc<Window>,

    renderer: SceneRenderer,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // viewer state
    camera: Camera,
    scene: Scene,
    input_state: InputState,
    processor: InputProcessor,
    controller: CameraController,

    // Frame timing
    last_frame_time: std::time::Instant,
    fps: f32,
    frame_count: u32,
    fps_timer: f32,
}

impl App {
    async fn new(window: Arc<Window>, config: &SceneConfig, scene: Scene) -> Self {
        let size = window.inner_size();

        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await;

        let camera = Camera::new(&config.camera, size.width, size.height);
        let renderer = SceneRenderer::new(
            gpu.device.as_ref(),
            gpu.queue.as_ref(),
            &gpu.config,
            &scene,
            config.lighting.clone(),
            config.fog.clone(),
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Self {
            surface: gpu.surface,
            device: gpu.device,
            queue: gpu.queue,
            size,
            window,
            renderer,
            egui_state,
            egui_ctx,
            camera,
            scene,
            input_state: InputState::new(),
            processor: InputProcessor::default(),
            controller: CameraController::new(&config.controls),
            last_frame_time: std::time::Instant::now(),
            fps: 0.0,
            frame_count: 0,
            fps_timer: 0.0,
        }
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self
            .egui_state
            .on_window_event(self.window.as_ref(), event)
            .consumed;
        if egui_captured {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key,
                        ..
                    },
                ..
            } => {
                let key = match physical_key {
                    PhysicalKey::Code(code) => key_name(*code),
                    _ => None,
                };
                if let Some(key) = key {
                    match state {
                        ElementState::Pressed => {
                            if self.processor.is_escape(key) {
                                self.release_pointer();
                            } else if self.processor.wants_to_toggle_light(key) {
                                self.input_state.toggle_point_light();
                            } else if self.processor.wants_to_toggle_mipmap(key) {
                                self.input_state.toggle_mipmap();
                            }
                            self.input_state
                                .process_event(&InputEvent::KeyDown(key.to_string()));
                        }
                        ElementState::Released => {
                            self.input_state
                                .process_event(&InputEvent::KeyUp(key.to_string()));
                        }
                    }
                }
                true
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.capture_pointer();
                true
            }
            WindowEvent::Focused(false) => {
                self.input_state.process_event(&InputEvent::FocusLost);
                true
            }
            _ => false,
        }
    }

    fn capture_pointer(&mut self) {
        let _ = self.window.set_cursor_visible(false);
        let _ = self
            .window
            .set_cursor_grab(winit::window::CursorGrabMode::Locked)
            .or_else(|_| {
                self.window
                    .set_cursor_grab(winit::window::CursorGrabMode::Confined)
            });
        self.input_state
            .process_event(&InputEvent::PointerLockChanged { locked: true });
    }

    fn release_pointer(&mut self) {
        let _ = self.window.set_cursor_visible(true);
        let _ = self
            .window
            .set_cursor_grab(winit::window::CursorGrabMode::None);
        self.input_state
            .process_event(&InputEvent::PointerLockChanged { locked: false });
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        // the state ignores deltas while the pointer is not captured
        self.input_state.process_event(&InputEvent::MouseMove {
            dx: dx as f32,
            dy: dy as f32,
        });
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.renderer
                .resize(&self.device, &self.surface, new_size.width, new_size.height);
            self.camera.set_aspect(new_size.width, new_size.height);
        }
    }

    fn update(&mut self, dt: f32) {
        // Update FPS
        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }

        let frame_input = self.processor.frame_input(&mut self.input_state);
        self.controller.step(&mut self.camera, &frame_input, dt);
        self.scene.animate(dt);

        self.renderer.update(
            &self.queue,
            &self.scene,
            &self.camera,
            self.input_state.point_light_on,
            self.input_state.mipmap_on,
        );
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = self.egui_ctx.run(raw_input, |ctx| {
            ui::draw_hud(ctx, &self.camera, &self.input_state, self.fps);
        });
        self.egui_state
            .handle_platform_output(&self.window, output.platform_output);

        let pixels_per_point = self.window.scale_factor() as f32;
        self.renderer.egui_primitives =
            Some(self.egui_ctx.tessellate(output.shapes, pixels_per_point));
        self.renderer.egui_textures_delta = Some(output.textures_delta);
        self.renderer.egui_pixels_per_point = pixels_per_point;

        self.renderer
            .draw_frame(&self.device, &self.queue, &self.surface)
    }
}

fn main() {
    logging::init();
    let args = Args::parse();

    let config = match SceneConfig::load(&args.scene) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let resources = match assets::load_resources(&config, Duration::from_secs(args.load_timeout)) {
        Ok(resources) => resources,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let scene = match Scene::from_config(&config, &resources) {
        Ok(scene) => scene,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(objects = scene.objects.len(), "scene ready");

    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("scenewalk")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = event_loop.create_window(window_attributes).unwrap();
    let window = Arc::new(window);

    let mut app = pollster::block_on(App::new(window.clone(), &config, scene));

    event_loop
        .run(move |event, elwt| {
            match event {
                Event::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == app.window.id() => {
                    if !app.input(event) {
                        match event {
                            WindowEvent::CloseRequested => elwt.exit(),
                            WindowEvent::Resized(physical_size) => {
                                app.resize(*physical_size);
                            }
                            WindowEvent::RedrawRequested => {
                                let now = std::time::Instant::now();
                                let dt = (now - app.last_frame_time).as_secs_f32();
                                app.last_frame_time = now;

                                app.update(dt);

                                match app.render() {
                                    Ok(_) => {}
                                    Err(wgpu::SurfaceError::Lost) => app.resize(app.size),
                                    Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                                    Err(e) => tracing::error!("{e:?}"),
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Event::DeviceEvent {
                    event: winit::event::DeviceEvent::MouseMotion { delta },
                    ..
                } => {
                    app.handle_mouse_motion(delta.0, delta.1);
                }
                Event::AboutToWait => {
                    app.window.request_redraw();
                }
                _ => {}
            }
        })
        .unwrap();
}
