//! Scene description: camera start pose, control speeds, lighting, fog and
//! the object list, loaded from a TOML file (`scene.toml` by default).

use glam::Vec3;
use serde::Deserialize;

/// The scene file shipped with the crate; also the scene the wasm build embeds.
pub const DEFAULT_SCENE: &str = include_str!("../scene.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scene: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    pub fog: FogConfig,
    pub textured: Vec<TexturedConfig>,
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub at: [f32; 3],
    pub up: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 4.0, 14.0],
            at: [0.0, 2.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov: 60.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per second for the i/j/k/l rotation keys.
    pub rot_speed: f32,
    /// Degrees per pixel of mouse travel under pointer lock.
    pub mouse_sensitivity: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            move_speed: 10.0,
            rot_speed: 60.0,
            mouse_sensitivity: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: [f32; 3],
    /// Direction towards the directional light; normalized in the shader.
    pub sun_direction: [f32; 3],
    /// Color of the camera-held point light while it is switched on.
    pub point_light: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: [0.3, 0.3, 0.3],
            sun_direction: [0.5, 1.0, 0.7],
            point_light: [0.8, 0.8, 0.8],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: [0.7, 0.7, 0.7],
            near: 30.0,
            far: 160.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Cube,
    Plane,
}

/// Built-in geometry with an image texture (the floor and the box).
#[derive(Debug, Clone, Deserialize)]
pub struct TexturedConfig {
    pub name: String,
    pub shape: Shape,
    pub texture: String,
    #[serde(default = "zero3")]
    pub translate: [f32; 3],
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub spin: Option<SpinConfig>,
}

/// An OBJ-loaded model with a flat color and a transform step list.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub obj: String,
    pub color: [f32; 3],
    #[serde(default)]
    pub transform: Vec<TransformStep>,
    #[serde(default)]
    pub spin: Option<SpinConfig>,
}

/// One step of a model transform: `{ op = "translate", args = [x, y, z] }`.
/// Steps fold left to right; an unknown op or a wrong arg count is logged
/// and skipped at scene-construction time.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformStep {
    pub op: String,
    pub args: Vec<f32>,
}

/// Continuous rotation tag, degrees per second about a fixed local axis.
#[derive(Debug, Clone, Deserialize)]
pub struct SpinConfig {
    pub axis: [f32; 3],
    pub speed: f32,
}

fn zero3() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn one3() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Camera invariants (`eye != at`, `up` not parallel to the view
    /// direction) are enforced here once, so the per-frame camera math can
    /// assume a non-degenerate pose.
    fn validate(&self) -> Result<(), ConfigError> {
        let eye = Vec3::from(self.camera.eye);
        let at = Vec3::from(self.camera.at);
        let up = Vec3::from(self.camera.up);

        if eye.abs_diff_eq(at, 1e-6) {
            return Err(ConfigError::Invalid("camera eye and at coincide".into()));
        }
        if up.length_squared() < 1e-12 {
            return Err(ConfigError::Invalid("camera up is the zero vector".into()));
        }
        let view = (at - eye).normalize();
        if view.cross(up.normalize()).length_squared() < 1e-8 {
            return Err(ConfigError::Invalid(
                "camera up is parallel to the view direction".into(),
            ));
        }
        if !(self.camera.fov > 0.0 && self.camera.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera fov {} out of range (0, 180)",
                self.camera.fov
            )));
        }
        if !(self.camera.near > 0.0 && self.camera.near < self.camera.far) {
            return Err(ConfigError::Invalid(
                "camera near/far planes out of order".into(),
            ));
        }
        if self.fog.near >= self.fog.far {
            return Err(ConfigError::Invalid("fog near must be below fog far".into()));
        }

        let mut names = std::collections::HashSet::new();
        let spins = self
            .textured
            .iter()
            .map(|t| (&t.name, &t.spin))
            .chain(self.models.iter().map(|m| (&m.name, &m.spin)));
        for (name, spin) in spins {
            if !names.insert(name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate object name {name:?}")));
            }
            if let Some(spin) = spin {
                if Vec3::from(spin.axis).length_squared() < 1e-12 {
                    return Err(ConfigError::Invalid(format!(
                        "object {name:?} has a zero spin axis"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_file_parses_and_validates() {
        let config = SceneConfig::from_toml_str(DEFAULT_SCENE).unwrap();
        assert!(!config.textured.is_empty());
        assert!(!config.models.is_empty());
        // the default scene carries the two animated objects
        assert!(config.textured.iter().any(|t| t.spin.is_some()));
        assert!(config.models.iter().any(|m| m.spin.is_some()));
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config.controls.move_speed, 10.0);
        assert_eq!(config.fog.far, 160.0);
        assert!(config.textured.is_empty());
    }

    #[test]
    fn coincident_eye_and_at_is_rejected() {
        let err = SceneConfig::from_toml_str(
            "[camera]\neye = [1.0, 2.0, 3.0]\nat = [1.0, 2.0, 3.0]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn up_parallel_to_view_is_rejected() {
        let err = SceneConfig::from_toml_str(
            "[camera]\neye = [0.0, 5.0, 0.0]\nat = [0.0, 0.0, 0.0]\nup = [0.0, 1.0, 0.0]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_spin_axis_is_rejected() {
        let toml = r#"
            [[models]]
            name = "m"
            obj = "m.obj"
            color = [1.0, 0.0, 0.0]
            spin = { axis = [0.0, 0.0, 0.0], speed = 90.0 }
        "#;
        let err = SceneConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let toml = r#"
            [[textured]]
            name = "a"
            shape = "cube"
            texture = "a.png"

            [[textured]]
            name = "a"
            shape = "plane"
            texture = "b.png"
        "#;
        let err = SceneConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
