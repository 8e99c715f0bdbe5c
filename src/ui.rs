use egui::Context;
use glam::Vec3;

use crate::controller::InputState;
use crate::model::Camera;

fn vec3_row(name: &str, v: Vec3) -> String {
    format!("{name}: ({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Heads-up display: camera pose readout, toggle states, FPS and a controls
/// legend. Display-only, redrawn every frame.
pub fn draw_hud(ctx: &Context, camera: &Camera, input: &InputState, fps: f32) {
    egui::Window::new("Viewer")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {fps:.0}")).small());
            ui.label(egui::RichText::new(vec3_row("eye", camera.eye)).small());
            ui.label(egui::RichText::new(vec3_row("at", camera.at)).small());
            ui.label(egui::RichText::new(vec3_row("up", camera.up)).small());
            ui.separator();
            ui.label(
                egui::RichText::new(format!("Point light: {}", on_off(input.point_light_on)))
                    .small(),
            );
            ui.label(egui::RichText::new(format!("Mipmap: {}", on_off(input.mipmap_on))).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("WASD - Move").small());
            ui.label(egui::RichText::new("I/K - Look up/down").small());
            ui.label(egui::RichText::new("J/L - Look left/right").small());
            ui.label(egui::RichText::new("F - Point light").small());
            ui.label(egui::RichText::new("M - Mipmap filtering").small());
            ui.label(egui::RichText::new("Click - Capture mouse").small());
            ui.label(egui::RichText::new("Esc - Release mouse").small());
        });
}

/// Run one HUD frame from scratch (the wasm path, which has no egui-winit
/// integration feeding events; the HUD is display-only).
#[cfg(target_arch = "wasm32")]
pub fn build_ui(
    ctx: &Context,
    camera: &Camera,
    input: &InputState,
    fps: f32,
    canvas_width: u32,
    canvas_height: u32,
    now_ms: f64,
) -> egui::FullOutput {
    let mut raw_input = egui::RawInput::default();
    raw_input.time = Some(now_ms / 1000.0);
    raw_input.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::new(0.0, 0.0),
        egui::vec2(canvas_width as f32, canvas_height as f32),
    ));

    ctx.run(raw_input, |ctx| {
        draw_hud(ctx, camera, input, fps);
    })
}
