use std::cell::RefCell;
use std::rc::Rc;

use web_sys::Window;
use wgpu::{Device, Queue, Surface};

use crate::controller::camera_controller::CameraController;
use crate::controller::input::{InputProcessor, InputState};
use crate::model::{Camera, Scene};
use crate::ui;
use crate::view::SceneRenderer;

/// Per-frame update logic for the browser build: one call per
/// requestAnimationFrame tick, before the draw.
pub struct FrameLoopContext {
    pub camera: Rc<RefCell<Camera>>,
    pub scene: Rc<RefCell<Scene>>,
    pub input_state: Rc<RefCell<InputState>>,
    pub processor: InputProcessor,
    pub controller: CameraController,
    pub egui_ctx: egui::Context,
    pub last_time: Rc<RefCell<f64>>,

    fps: f32,
    frame_count: u32,
    fps_timer: f32,
}

impl FrameLoopContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: Rc<RefCell<Camera>>,
        scene: Rc<RefCell<Scene>>,
        input_state: Rc<RefCell<InputState>>,
        processor: InputProcessor,
        controller: CameraController,
        egui_ctx: egui::Context,
        last_time: Rc<RefCell<f64>>,
    ) -> Self {
        Self {
            camera,
            scene,
            input_state,
            processor,
            controller,
            egui_ctx,
            last_time,
            fps: 0.0,
            frame_count: 0,
            fps_timer: 0.0,
        }
    }

    /// Advance input, camera and animation for one frame, then write the
    /// GPU uniforms and build the HUD for the draw that follows.
    pub fn update(
        &mut self,
        device: &Device,
        queue: &Queue,
        window: &Window,
        surface: &Surface,
        renderer: &mut SceneRenderer,
    ) {
        // Time step; clamped so a background tab does not produce one giant jump
        let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
        let mut last = self.last_time.borrow_mut();
        let dt = ((now - *last) / 1000.0).clamp(0.0, 0.1) as f32;
        *last = now;
        drop(last);

        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }

        let frame_input = self.processor.frame_input(&mut self.input_state.borrow_mut());
        self.controller
            .step(&mut self.camera.borrow_mut(), &frame_input, dt);
        self.scene.borrow_mut().animate(dt);

        self.handle_resize(window, device, surface, renderer);

        {
            let camera = self.camera.borrow();
            let input = self.input_state.borrow();
            renderer.update(
                queue,
                &self.scene.borrow(),
                &camera,
                input.point_light_on,
                input.mipmap_on,
            );
        }

        // HUD
        let dpr = window.device_pixel_ratio() as f32;
        self.egui_ctx.set_pixels_per_point(dpr);
        let mut full_output = ui::build_ui(
            &self.egui_ctx,
            &self.camera.borrow(),
            &self.input_state.borrow(),
            self.fps,
            renderer.width(),
            renderer.height(),
            now,
        );
        let primitives = self
            .egui_ctx
            .tessellate(std::mem::take(&mut full_output.shapes), dpr);
        renderer.egui_primitives = Some(primitives);
        renderer.egui_textures_delta = Some(full_output.textures_delta);
        renderer.egui_pixels_per_point = dpr;
    }

    /// Re-poll the window size every tick; update the projection aspect and
    /// the surface/depth buffer when it changed.
    fn handle_resize(
        &self,
        window: &Window,
        device: &Device,
        surface: &Surface,
        renderer: &mut SceneRenderer,
    ) {
        if let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) {
            let nw = w.as_f64().unwrap_or(800.0) as u32;
            let nh = h.as_f64().unwrap_or(600.0) as u32;
            if (nw != renderer.width() || nh != renderer.height()) && nw > 0 && nh > 0 {
                self.camera.borrow_mut().set_aspect(nw, nh);
                renderer.resize(device, surface, nw, nh);
            }
        }
    }
}
