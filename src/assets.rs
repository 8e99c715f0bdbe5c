//! Resource loading. Every texture and OBJ referenced by the scene file is a
//! job; jobs complete through a channel that the startup path joins against
//! a deadline. A failed or missing resource surfaces as an error instead of
//! leaving the viewer stuck in its loading phase.

use std::collections::HashMap;

use crate::config::SceneConfig;
use crate::model::obj::{self, ObjError};
use crate::utils::Mesh;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: ObjError,
    },
    #[error("resource {0:?} is not part of the loaded set")]
    MissingResource(String),
    #[error("timed out waiting for resources ({loaded}/{expected} loaded)")]
    Timeout { loaded: usize, expected: usize },
    #[error("a resource loader worker vanished before reporting")]
    WorkerLost,
}

/// Decoded resources, keyed by the path string used in the scene file.
pub struct ResourceSet {
    pub textures: HashMap<String, image::RgbaImage>,
    pub meshes: HashMap<String, Mesh>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Texture,
    Model,
}

enum Payload {
    Texture(image::RgbaImage),
    Mesh(Mesh),
}

/// The deduplicated list of (path, kind) jobs a scene needs.
fn jobs(config: &SceneConfig) -> Vec<(String, JobKind)> {
    let mut out: Vec<(String, JobKind)> = Vec::new();
    for textured in &config.textured {
        if !out.iter().any(|(p, _)| p == &textured.texture) {
            out.push((textured.texture.clone(), JobKind::Texture));
        }
    }
    for model in &config.models {
        if !out.iter().any(|(p, _)| p == &model.obj) {
            out.push((model.obj.clone(), JobKind::Model));
        }
    }
    out
}

pub fn decode_texture(path: &str, bytes: &[u8]) -> Result<image::RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_string(),
            source,
        })
}

pub fn parse_model(path: &str, text: &str) -> Result<Mesh, AssetError> {
    obj::parse(text).map_err(|source| AssetError::Obj {
        path: path.to_string(),
        source,
    })
}

/// Resolve the scene's resources from the asset table embedded at compile
/// time (the wasm build has no filesystem; the native build uses this only
/// in tests).
pub fn embedded_resources(config: &SceneConfig) -> Result<ResourceSet, AssetError> {
    const TEXTURES: &[(&str, &[u8])] = &[
        ("assets/floor.png", include_bytes!("../assets/floor.png")),
        ("assets/box.png", include_bytes!("../assets/box.png")),
    ];
    const MODELS: &[(&str, &str)] = &[
        ("assets/cube.obj", include_str!("../assets/cube.obj")),
        ("assets/pyramid.obj", include_str!("../assets/pyramid.obj")),
        ("assets/octahedron.obj", include_str!("../assets/octahedron.obj")),
        ("assets/prism.obj", include_str!("../assets/prism.obj")),
        ("assets/tetrahedron.obj", include_str!("../assets/tetrahedron.obj")),
        ("assets/rotor.obj", include_str!("../assets/rotor.obj")),
    ];

    let mut set = ResourceSet {
        textures: HashMap::new(),
        meshes: HashMap::new(),
    };
    for (path, kind) in jobs(config) {
        match kind {
            JobKind::Texture => {
                let bytes = TEXTURES
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, b)| *b)
                    .ok_or_else(|| AssetError::MissingResource(path.clone()))?;
                let _ = set.textures.insert(path.clone(), decode_texture(&path, bytes)?);
            }
            JobKind::Model => {
                let text = MODELS
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, t)| *t)
                    .ok_or_else(|| AssetError::MissingResource(path.clone()))?;
                let _ = set.meshes.insert(path.clone(), parse_model(&path, text)?);
            }
        }
    }
    Ok(set)
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::load_resources;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tracing::info;

    fn load_one(path: &str, kind: JobKind) -> Result<Payload, AssetError> {
        match kind {
            JobKind::Texture => {
                let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
                    path: path.to_string(),
                    source,
                })?;
                Ok(Payload::Texture(decode_texture(path, &bytes)?))
            }
            JobKind::Model => {
                let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
                    path: path.to_string(),
                    source,
                })?;
                Ok(Payload::Mesh(parse_model(path, &text)?))
            }
        }
    }

    /// Load every resource the scene references, one worker thread per
    /// resource, and join the results against a deadline. The first failure
    /// propagates; running past the deadline is an error, not a hang.
    pub fn load_resources(
        config: &SceneConfig,
        timeout: Duration,
    ) -> Result<ResourceSet, AssetError> {
        let jobs = jobs(config);
        let expected = jobs.len();
        let (tx, rx) = mpsc::channel();

        for (path, kind) in jobs {
            let tx = tx.clone();
            let _ = std::thread::spawn(move || {
                let result = load_one(&path, kind);
                let _ = tx.send((path, result));
            });
        }
        drop(tx);

        let deadline = Instant::now() + timeout;
        let mut set = ResourceSet {
            textures: HashMap::new(),
            meshes: HashMap::new(),
        };
        for loaded in 0..expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((path, Ok(Payload::Texture(image)))) => {
                    info!(%path, loaded = loaded + 1, expected, "texture loaded");
                    let _ = set.textures.insert(path, image);
                }
                Ok((path, Ok(Payload::Mesh(mesh)))) => {
                    info!(%path, loaded = loaded + 1, expected, "model loaded");
                    let _ = set.meshes.insert(path, mesh);
                }
                Ok((_, Err(err))) => return Err(err),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(AssetError::Timeout { loaded, expected });
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(AssetError::WorkerLost);
                }
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use std::time::Duration;

    #[test]
    fn embedded_set_covers_the_default_scene() {
        let config = SceneConfig::from_toml_str(crate::config::DEFAULT_SCENE).unwrap();
        let set = embedded_resources(&config).unwrap();
        assert_eq!(set.textures.len(), 2);
        assert_eq!(set.meshes.len(), 6);
    }

    #[test]
    fn embedded_set_reports_unknown_paths() {
        let toml = r#"
            [[models]]
            name = "m"
            obj = "assets/teapot.obj"
            color = [1.0, 1.0, 1.0]
        "#;
        let config = SceneConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            embedded_resources(&config),
            Err(AssetError::MissingResource(path)) if path == "assets/teapot.obj"
        ));
    }

    #[test]
    fn loader_reads_the_shipped_assets_from_disk() {
        let config = SceneConfig::from_toml_str(crate::config::DEFAULT_SCENE).unwrap();
        let set = load_resources(&config, Duration::from_secs(30)).unwrap();
        assert_eq!(set.textures.len(), 2);
        assert_eq!(set.meshes.len(), 6);
        assert!(set.textures["assets/floor.png"].width() > 0);
    }

    #[test]
    fn loader_propagates_missing_files() {
        let toml = r#"
            [[textured]]
            name = "t"
            shape = "cube"
            texture = "assets/does-not-exist.png"
        "#;
        let config = SceneConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            load_resources(&config, Duration::from_secs(5)),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn bad_image_bytes_are_a_decode_error() {
        assert!(matches!(
            decode_texture("x.png", b"definitely not a png"),
            Err(AssetError::Image { .. })
        ));
    }
}
