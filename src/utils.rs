use wgpu::util::DeviceExt;
use bytemuck::NoUninit;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// One quad, corners in counter-clockwise order seen from outside.
    fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3], uvs: [[f32; 2]; 4]) {
        let base = self.vertices.len() as u32;
        for (pos, uv) in corners.iter().zip(uvs.iter()) {
            self.vertices.push(Vertex { pos: *pos, normal, uv: *uv });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Unit cube centered at the origin, per-face normals, each face mapping the
/// whole texture.
pub fn create_cube_mesh() -> Mesh {
    let mut mesh = Mesh::default();
    let h = 0.5;

    // +Z
    mesh.push_quad(
        [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
        [0.0, 0.0, 1.0],
        FACE_UVS,
    );
    // -Z
    mesh.push_quad(
        [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
        [0.0, 0.0, -1.0],
        FACE_UVS,
    );
    // +X
    mesh.push_quad(
        [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
        [1.0, 0.0, 0.0],
        FACE_UVS,
    );
    // -X
    mesh.push_quad(
        [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
        [-1.0, 0.0, 0.0],
        FACE_UVS,
    );
    // +Y
    mesh.push_quad(
        [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
        [0.0, 1.0, 0.0],
        FACE_UVS,
    );
    // -Y
    mesh.push_quad(
        [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
        [0.0, -1.0, 0.0],
        FACE_UVS,
    );

    mesh
}

/// Unit ground plane in the xz plane, facing +Y. The texture tiles several
/// times across the quad so a repeated pattern reads as floor tiles.
pub fn create_plane_mesh() -> Mesh {
    const TILE: f32 = 8.0;
    let mut mesh = Mesh::default();
    let h = 0.5;
    mesh.push_quad(
        [[-h, 0.0, -h], [-h, 0.0, h], [h, 0.0, h], [h, 0.0, -h]],
        [0.0, 1.0, 0.0],
        [[0.0, 0.0], [0.0, TILE], [TILE, TILE], [TILE, 0.0]],
    );
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn face_normal(mesh: &Mesh, tri: usize) -> Vec3 {
        let i = tri * 3;
        let a = Vec3::from(mesh.vertices[mesh.indices[i] as usize].pos);
        let b = Vec3::from(mesh.vertices[mesh.indices[i + 1] as usize].pos);
        let c = Vec3::from(mesh.vertices[mesh.indices[i + 2] as usize].pos);
        (b - a).cross(c - b).normalize()
    }

    #[test]
    fn cube_winding_matches_stored_normals() {
        let mesh = create_cube_mesh();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for tri in 0..12 {
            let geometric = face_normal(&mesh, tri);
            let stored = Vec3::from(mesh.vertices[mesh.indices[tri * 3] as usize].normal);
            assert!(geometric.abs_diff_eq(stored, 1e-5), "triangle {tri}: {geometric} vs {stored}");
        }
    }

    #[test]
    fn plane_faces_up() {
        let mesh = create_plane_mesh();
        assert_eq!(mesh.indices.len(), 6);
        assert!(face_normal(&mesh, 0).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(face_normal(&mesh, 1).abs_diff_eq(Vec3::Y, 1e-5));
    }
}
