//! Minimal Wavefront OBJ parser: v/vt/vn and f records, fan triangulation,
//! 1-based and negative indices. Faces without normals get a flat normal
//! computed from their winding. Everything else (materials, groups, lines)
//! is ignored.

use std::collections::HashMap;

use glam::Vec3;

use crate::utils::{Mesh, Vertex};

#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("line {line}: malformed number in {record:?}")]
    BadNumber { line: usize, record: String },
    #[error("line {line}: malformed face vertex {token:?}")]
    BadFaceVertex { line: usize, token: String },
    #[error("line {line}: index {index} out of range (have {len})")]
    IndexOutOfRange { line: usize, index: isize, len: usize },
    #[error("line {line}: face needs at least 3 vertices")]
    ShortFace { line: usize },
    #[error("OBJ contains no faces")]
    Empty,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FaceVertex {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

pub fn parse(text: &str) -> Result<Mesh, ObjError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<Vec<FaceVertex>> = Vec::new();

    for (line_idx, raw) in text.lines().enumerate() {
        let line = line_idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        match fields.next() {
            Some("v") => positions.push(parse_vec3(fields, line, trimmed)?),
            Some("vn") => normals.push(parse_vec3(fields, line, trimmed)?),
            Some("vt") => {
                let mut uv = [0.0f32; 2];
                for slot in uv.iter_mut() {
                    *slot = fields
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| ObjError::BadNumber {
                            line,
                            record: trimmed.to_string(),
                        })?;
                }
                texcoords.push(uv);
            }
            Some("f") => {
                let mut face = Vec::new();
                for token in fields {
                    face.push(parse_face_vertex(
                        token,
                        line,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                    )?);
                }
                if face.len() < 3 {
                    return Err(ObjError::ShortFace { line });
                }
                faces.push(face);
            }
            // o/g/s/usemtl/mtllib and anything else: ignored
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(ObjError::Empty);
    }

    let mut mesh = Mesh::default();
    let mut seen: HashMap<FaceVertex, u32> = HashMap::new();

    for face in &faces {
        let has_normals = face.iter().all(|fv| fv.normal.is_some());
        if has_normals {
            // indexed path, shared vertices deduplicated per (v, vt, vn)
            let mut resolved = Vec::with_capacity(face.len());
            for fv in face {
                let index = *seen.entry(*fv).or_insert_with(|| {
                    let index = mesh.vertices.len() as u32;
                    mesh.vertices.push(Vertex {
                        pos: positions[fv.position],
                        normal: normals[fv.normal.unwrap()],
                        uv: fv.texcoord.map_or([0.0, 0.0], |t| texcoords[t]),
                    });
                    index
                });
                resolved.push(index);
            }
            for i in 1..resolved.len() - 1 {
                mesh.indices
                    .extend_from_slice(&[resolved[0], resolved[i], resolved[i + 1]]);
            }
        } else {
            // no normals in the file: flat-shade with one normal per face,
            // which needs unshared vertices
            let flat = face_normal(face, &positions);
            for i in 1..face.len() - 1 {
                for fv in [face[0], face[i], face[i + 1]] {
                    mesh.indices.push(mesh.vertices.len() as u32);
                    mesh.vertices.push(Vertex {
                        pos: positions[fv.position],
                        normal: flat,
                        uv: fv.texcoord.map_or([0.0, 0.0], |t| texcoords[t]),
                    });
                }
            }
        }
    }

    Ok(mesh)
}

fn parse_vec3<'a>(
    mut fields: impl Iterator<Item = &'a str>,
    line: usize,
    record: &str,
) -> Result<[f32; 3], ObjError> {
    let mut out = [0.0f32; 3];
    for slot in out.iter_mut() {
        *slot = fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| ObjError::BadNumber {
                line,
                record: record.to_string(),
            })?;
    }
    Ok(out)
}

fn parse_face_vertex(
    token: &str,
    line: usize,
    positions: usize,
    texcoords: usize,
    normals: usize,
) -> Result<FaceVertex, ObjError> {
    let mut parts = token.split('/');
    let position = resolve_index(parts.next(), line, token, positions)?
        .ok_or_else(|| ObjError::BadFaceVertex {
            line,
            token: token.to_string(),
        })?;
    let texcoord = resolve_index(parts.next(), line, token, texcoords)?;
    let normal = resolve_index(parts.next(), line, token, normals)?;
    if parts.next().is_some() {
        return Err(ObjError::BadFaceVertex {
            line,
            token: token.to_string(),
        });
    }
    Ok(FaceVertex {
        position,
        texcoord,
        normal,
    })
}

/// OBJ indices are 1-based; negative indices count back from the end of the
/// list as parsed so far. An empty component ("v//vn") resolves to None.
fn resolve_index(
    part: Option<&str>,
    line: usize,
    token: &str,
    len: usize,
) -> Result<Option<usize>, ObjError> {
    let part = match part {
        None | Some("") => return Ok(None),
        Some(p) => p,
    };
    let index: isize = part.parse().map_err(|_| ObjError::BadFaceVertex {
        line,
        token: token.to_string(),
    })?;
    let resolved = if index > 0 {
        (index as usize).checked_sub(1)
    } else if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        None
    };
    match resolved {
        Some(i) if i < len => Ok(Some(i)),
        _ => Err(ObjError::IndexOutOfRange { line, index, len }),
    }
}

fn face_normal(face: &[FaceVertex], positions: &[[f32; 3]]) -> [f32; 3] {
    let a = Vec3::from(positions[face[0].position]);
    let b = Vec3::from(positions[face[1].position]);
    let c = Vec3::from(positions[face[2].position]);
    (b - a).cross(c - b).normalize_or_zero().to_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_WITH_NORMALS: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn quad_is_fan_triangulated_and_deduplicated() {
        let mesh = parse(QUAD_WITH_NORMALS).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normals_are_synthesized_flat() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn texcoords_ride_along() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
vt 0 0
vt 1 0
vt 1 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(mesh.vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].pos, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let text = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            parse(text),
            Err(ObjError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn short_face_is_an_error() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(parse(text), Err(ObjError::ShortFace { line: 3 })));
    }

    #[test]
    fn file_without_faces_is_an_error() {
        assert!(matches!(parse("v 0 0 0\n"), Err(ObjError::Empty)));
    }

    #[test]
    fn shipped_models_parse() {
        for text in [
            include_str!("../../assets/cube.obj"),
            include_str!("../../assets/pyramid.obj"),
            include_str!("../../assets/octahedron.obj"),
            include_str!("../../assets/prism.obj"),
            include_str!("../../assets/tetrahedron.obj"),
            include_str!("../../assets/rotor.obj"),
        ] {
            let mesh = parse(text).unwrap();
            assert!(!mesh.is_empty());
        }
    }
}
