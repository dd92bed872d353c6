use std::f32::consts::{PI, TAU};

use crate::uniform::MeshId;

/// Interleaved `position.xyz, normal.xyz` vertices with a triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub const FLOATS_PER_VERTEX: usize = 6;

    pub fn builtin(mesh: MeshId) -> Self {
        match mesh {
            MeshId::Cube => Self::cube(),
            MeshId::Sphere => Self::sphere(12, 16),
        }
    }

    /// Unit cube centred on the origin with flat face normals.
    pub fn cube() -> Self {
        Self {
            vertices: CUBE_VERTICES.to_vec(),
            indices: CUBE_INDICES.to_vec(),
        }
    }

    /// UV sphere of radius 0.5 with `rings` latitude bands.
    pub fn sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize * 6);
        for ring in 0..=rings {
            let theta = ring as f32 / rings as f32 * PI;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for segment in 0..=segments {
                let phi = segment as f32 / segments as f32 * TAU;
                let (sin_phi, cos_phi) = phi.sin_cos();
                let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
                vertices.extend_from_slice(&[
                    normal[0] * 0.5,
                    normal[1] * 0.5,
                    normal[2] * 0.5,
                    normal[0],
                    normal[1],
                    normal[2],
                ]);
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::FLOATS_PER_VERTEX
    }
}

const CUBE_VERTICES: &[f32] = &[
    // positions        // normals
    -0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 0.0, 0.0, 1.0,
    -0.5, 0.5, 0.5, 0.0, 0.0, 1.0, -0.5, -0.5, -0.5, 0.0, 0.0, -1.0, 0.5, -0.5, -0.5, 0.0, 0.0,
    -1.0, 0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, -0.5, -0.5, -1.0,
    0.0, 0.0, -0.5, -0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, -0.5,
    -1.0, 0.0, 0.0, 0.5, -0.5, -0.5, 1.0, 0.0, 0.0, 0.5, -0.5, 0.5, 1.0, 0.0, 0.0, 0.5, 0.5, 0.5,
    1.0, 0.0, 0.0, 0.5, 0.5, -0.5, 1.0, 0.0, 0.0, -0.5, -0.5, -0.5, 0.0, -1.0, 0.0, 0.5, -0.5,
    -0.5, 0.0, -1.0, 0.0, 0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5,
    0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, 0.5, 0.0, 1.0, 0.0, -0.5,
    0.5, 0.5, 0.0, 1.0, 0.0,
];

const CUBE_INDICES: &[u32] = &[
    0, 1, 2, 0, 2, 3, // front
    4, 6, 5, 4, 7, 6, // back
    8, 9, 10, 8, 10, 11, // left
    12, 14, 13, 12, 15, 14, // right
    16, 18, 17, 16, 19, 18, // bottom
    20, 21, 22, 20, 22, 23, // top
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_indices_stay_in_range() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertex_count()));
    }

    #[test]
    fn sphere_normals_are_unit_and_radius_is_half() {
        let sphere = MeshData::sphere(6, 8);
        assert_eq!(sphere.indices.len(), 6 * 8 * 6);
        assert!(sphere
            .indices
            .iter()
            .all(|&i| (i as usize) < sphere.vertex_count()));
        for chunk in sphere.vertices.chunks_exact(MeshData::FLOATS_PER_VERTEX) {
            let radius = (chunk[0] * chunk[0] + chunk[1] * chunk[1] + chunk[2] * chunk[2]).sqrt();
            let normal = (chunk[3] * chunk[3] + chunk[4] * chunk[4] + chunk[5] * chunk[5]).sqrt();
            assert!((radius - 0.5).abs() < 1e-5);
            assert!((normal - 1.0).abs() < 1e-5);
        }
    }
}
