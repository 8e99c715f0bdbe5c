use glam::{Mat4, Vec3};
use tracing::warn;

use crate::assets::{AssetError, ResourceSet};
use crate::config::{SceneConfig, Shape, SpinConfig, TransformStep};
use crate::utils::{create_cube_mesh, create_plane_mesh, Mesh};

/// Continuous rotation applied by the animation step, resolved from the
/// object's tag at scene construction (objects are addressed by name, never
/// by list position).
#[derive(Debug, Clone, Copy)]
pub struct Spin {
    pub axis: Vec3,
    pub degrees_per_sec: f32,
}

impl Spin {
    fn from_config(config: &SpinConfig) -> Self {
        Self {
            axis: Vec3::from(config.axis).normalize(),
            degrees_per_sec: config.speed,
        }
    }
}

pub enum Appearance {
    /// Image-textured built-in geometry (the floor and the box).
    Textured { image: image::RgbaImage },
    /// Flat-colored OBJ model.
    Flat { color: [f32; 4] },
}

pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
    pub transform: Mat4,
    pub appearance: Appearance,
    pub spin: Option<Spin>,
}

pub struct Scene {
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn from_config(config: &SceneConfig, resources: &ResourceSet) -> Result<Self, AssetError> {
        let mut objects = Vec::new();

        for textured in &config.textured {
            let image = resources
                .textures
                .get(&textured.texture)
                .cloned()
                .ok_or_else(|| AssetError::MissingResource(textured.texture.clone()))?;
            let mesh = match textured.shape {
                Shape::Cube => create_cube_mesh(),
                Shape::Plane => create_plane_mesh(),
            };
            let transform = Mat4::from_translation(Vec3::from(textured.translate))
                * Mat4::from_scale(Vec3::from(textured.scale));
            objects.push(SceneObject {
                name: textured.name.clone(),
                mesh,
                transform,
                appearance: Appearance::Textured { image },
                spin: textured.spin.as_ref().map(Spin::from_config),
            });
        }

        for model in &config.models {
            let mesh = resources
                .meshes
                .get(&model.obj)
                .cloned()
                .ok_or_else(|| AssetError::MissingResource(model.obj.clone()))?;
            let [r, g, b] = model.color;
            objects.push(SceneObject {
                name: model.name.clone(),
                mesh,
                transform: build_transform(&model.transform),
                appearance: Appearance::Flat {
                    color: [r, g, b, 1.0],
                },
                spin: model.spin.as_ref().map(Spin::from_config),
            });
        }

        Ok(Self { objects })
    }

    /// Advance every spinning object by `dt` seconds. The incremental
    /// rotation post-multiplies the transform, so objects spin in place
    /// about their local axis.
    pub fn animate(&mut self, dt: f32) {
        for object in &mut self.objects {
            if let Some(spin) = &object.spin {
                object.transform = object.transform
                    * Mat4::from_axis_angle(spin.axis, (spin.degrees_per_sec * dt).to_radians());
            }
        }
    }
}

/// Fold a model's transform step list into a matrix. An unknown op or a
/// wrong arg count is logged and skipped; the transform accumulated so far
/// is kept.
pub fn build_transform(steps: &[TransformStep]) -> Mat4 {
    let mut matrix = Mat4::IDENTITY;
    for step in steps {
        match (step.op.as_str(), step.args.as_slice()) {
            ("translate", &[x, y, z]) => {
                matrix *= Mat4::from_translation(Vec3::new(x, y, z));
            }
            ("scale", &[x, y, z]) => {
                matrix *= Mat4::from_scale(Vec3::new(x, y, z));
            }
            ("rotate", &[deg, x, y, z]) if Vec3::new(x, y, z).length_squared() > 1e-12 => {
                matrix *= Mat4::from_axis_angle(Vec3::new(x, y, z).normalize(), deg.to_radians());
            }
            _ => {
                warn!(op = %step.op, args = ?step.args, "skipping malformed transform step");
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TexturedConfig;
    use std::collections::HashMap;

    fn step(op: &str, args: &[f32]) -> TransformStep {
        TransformStep {
            op: op.to_string(),
            args: args.to_vec(),
        }
    }

    fn mat_eq(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    #[test]
    fn transform_steps_fold_left_to_right() {
        let matrix = build_transform(&[
            step("translate", &[1.0, 2.0, 3.0]),
            step("scale", &[2.0, 2.0, 2.0]),
        ]);
        let expected =
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_scale(Vec3::splat(2.0));
        assert!(mat_eq(matrix, expected));
    }

    #[test]
    fn malformed_steps_are_skipped_keeping_the_accumulated_transform() {
        let matrix = build_transform(&[
            step("translate", &[1.0, 0.0, 0.0]),
            step("shear", &[1.0, 2.0, 3.0]),
            step("scale", &[1.0]),
            step("rotate", &[45.0, 0.0, 0.0, 0.0]),
            step("scale", &[2.0, 2.0, 2.0]),
        ]);
        let expected =
            Mat4::from_translation(Vec3::X) * Mat4::from_scale(Vec3::splat(2.0));
        assert!(mat_eq(matrix, expected));
    }

    fn spinning_scene() -> Scene {
        let mut resources = ResourceSet {
            textures: HashMap::new(),
            meshes: HashMap::new(),
        };
        resources
            .textures
            .insert("box.png".to_string(), image::RgbaImage::new(2, 2));
        let config = SceneConfig {
            textured: vec![TexturedConfig {
                name: "box".to_string(),
                shape: Shape::Cube,
                texture: "box.png".to_string(),
                translate: [0.0, 0.0, 0.0],
                scale: [1.0, 1.0, 1.0],
                spin: Some(SpinConfig {
                    axis: [0.0, 1.0, 0.0],
                    speed: 30.0,
                }),
            }],
            ..Default::default()
        };
        Scene::from_config(&config, &resources).unwrap()
    }

    #[test]
    fn spin_accumulates_time_proportionally() {
        let mut scene = spinning_scene();
        let dt = 0.25;
        let steps = 8;
        for _ in 0..steps {
            scene.animate(dt);
        }
        // 8 * 0.25 s * 30 deg/s = 60 degrees about Y
        let expected = Mat4::from_rotation_y((steps as f32 * dt * 30.0).to_radians());
        assert!(mat_eq(scene.objects[0].transform, expected));
    }

    #[test]
    fn spin_wraps_modulo_full_turns() {
        let mut scene = spinning_scene();
        for _ in 0..13 {
            scene.animate(1.0); // 13 s * 30 deg/s = 390 degrees
        }
        let expected = Mat4::from_rotation_y(30f32.to_radians());
        assert!(mat_eq(scene.objects[0].transform, expected));
    }

    #[test]
    fn objects_without_a_spin_tag_hold_still() {
        let mut scene = spinning_scene();
        scene.objects[0].spin = None;
        let before = scene.objects[0].transform;
        scene.animate(1.0);
        assert!(mat_eq(scene.objects[0].transform, before));
    }

    #[test]
    fn missing_texture_is_a_construction_error() {
        let resources = ResourceSet {
            textures: HashMap::new(),
            meshes: HashMap::new(),
        };
        let config = SceneConfig {
            textured: vec![TexturedConfig {
                name: "box".to_string(),
                shape: Shape::Cube,
                texture: "nowhere.png".to_string(),
                translate: [0.0, 0.0, 0.0],
                scale: [1.0, 1.0, 1.0],
                spin: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            Scene::from_config(&config, &resources),
            Err(AssetError::MissingResource(path)) if path == "nowhere.png"
        ));
    }
}
