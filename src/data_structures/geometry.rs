//! CPU-side mesh generation.
//!
//! Shapes are described by a [`GeometryDescriptor`] (shape plus subdivision)
//! and built into a [`Geometry`]: separate attribute channels plus a triangle
//! index list. Texture coordinates use the wgpu convention, `v = 0` is the top
//! row of the image.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector2, Vector3};

use crate::data_structures::model::ModelVertex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// UV sphere around the origin, poles on the Y axis.
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    /// Subdivided rectangle in the XY plane facing +Z.
    Plane {
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryDescriptor {
    pub shape: Shape,
    /// Copy the primary UV channel into a second channel (needed for ambient occlusion).
    pub duplicate_uv: bool,
}

impl GeometryDescriptor {
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self {
            shape: Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            },
            duplicate_uv: false,
        }
    }

    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        Self {
            shape: Shape::Plane {
                width,
                height,
                width_segments,
                height_segments,
            },
            duplicate_uv: false,
        }
    }

    pub fn with_duplicated_uv(mut self) -> Self {
        self.duplicate_uv = true;
        self
    }

    pub fn build(&self) -> Geometry {
        let geometry = match self.shape {
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => Geometry::sphere(radius, width_segments, height_segments),
            Shape::Plane {
                width,
                height,
                width_segments,
                height_segments,
            } => Geometry::plane(width, height, width_segments, height_segments),
        };
        if self.duplicate_uv {
            geometry.with_duplicated_uv()
        } else {
            geometry
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub uv2: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut geometry = Geometry::default();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let direction = Vector3::new(
                    -(u * 2.0 * PI).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * 2.0 * PI).sin() * (v * PI).sin(),
                );
                geometry.positions.push((direction * radius).into());
                geometry.normals.push(direction.into());
                geometry.uvs.push([u, v]);
            }
        }

        let row = width_segments + 1;
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // the first and last rings collapse to a point, skip their degenerate halves
                if iy != 0 {
                    geometry.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    geometry.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        geometry
    }

    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;
        let mut geometry = Geometry::default();

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;
                geometry.positions.push([x, -y, 0.0]);
                geometry.normals.push([0.0, 0.0, 1.0]);
                geometry
                    .uvs
                    .push([ix as f32 / grid_x as f32, iy as f32 / grid_y as f32]);
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = ix + 1 + row * (iy + 1);
                let d = ix + 1 + row * iy;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        geometry
    }

    /// Derive the secondary UV channel from the primary one.
    pub fn with_duplicated_uv(mut self) -> Self {
        self.uv2 = Some(self.uvs.clone());
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Interleave the channels and compute per-vertex tangent frames for normal mapping.
    ///
    /// Without a secondary UV channel `tex_coords2` is zero.
    pub fn to_vertices(&self) -> Vec<ModelVertex> {
        let mut vertices = (0..self.positions.len())
            .map(|i| ModelVertex {
                position: self.positions[i],
                tex_coords: self.uvs.get(i).copied().unwrap_or_default(),
                tex_coords2: self
                    .uv2
                    .as_ref()
                    .and_then(|uv2| uv2.get(i).copied())
                    .unwrap_or_default(),
                normal: self.normals.get(i).copied().unwrap_or_default(),
                tangent: [0.0; 3],
                bitangent: [0.0; 3],
            })
            .collect::<Vec<_>>();

        let mut triangles_included = vec![0u32; vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            let pos0: Vector3<f32> = vertices[i0].position.into();
            let pos1: Vector3<f32> = vertices[i1].position.into();
            let pos2: Vector3<f32> = vertices[i2].position.into();

            let uv0: Vector2<f32> = vertices[i0].tex_coords.into();
            let uv1: Vector2<f32> = vertices[i1].tex_coords.into();
            let uv2: Vector2<f32> = vertices[i2].tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            // Solve
            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for right-handed normal maps in wgpu texture space
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in &[i0, i1, i2] {
                vertices[i].tangent = (tangent + Vector3::from(vertices[i].tangent)).into();
                vertices[i].bitangent = (bitangent + Vector3::from(vertices[i].bitangent)).into();
                triangles_included[i] += 1;
            }
        }

        for (vertex, n) in vertices.iter_mut().zip(triangles_included) {
            if n == 0 {
                continue;
            }
            let tangent = Vector3::from(vertex.tangent);
            let bitangent = Vector3::from(vertex.bitangent);
            if tangent.magnitude2() > 0.0 {
                vertex.tangent = tangent.normalize().into();
            }
            if bitangent.magnitude2() > 0.0 {
                vertex.bitangent = bitangent.normalize().into();
            }
        }
        vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_grid_counts() {
        let plane = Geometry::plane(10.0, 10.0, 80, 80);
        assert_eq!(plane.vertex_count(), 81 * 81);
        assert_eq!(plane.indices.len(), 80 * 80 * 6);
        assert_eq!(plane.positions[0], [-5.0, 5.0, 0.0]);
        assert_eq!(plane.uvs[0], [0.0, 0.0]);
        assert_eq!(*plane.uvs.last().unwrap(), [1.0, 1.0]);
    }

    #[test]
    fn plane_triangles_face_the_normal() {
        let plane = Geometry::plane(2.0, 2.0, 1, 1);
        for tri in plane.indices.chunks_exact(3) {
            let p = |i: u32| Vector3::from(plane.positions[i as usize]);
            let n = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(n.z > 0.0);
        }
    }

    #[test]
    fn sphere_counts_skip_pole_triangles() {
        let sphere = Geometry::sphere(40.0, 80, 80);
        assert_eq!(sphere.vertex_count(), 81 * 81);
        assert_eq!(sphere.indices.len(), (80 * 80 * 2 - 2 * 80) * 3);
        for p in &sphere.positions {
            let r = Vector3::from(*p).magnitude();
            assert!((r - 40.0).abs() < 1e-3);
        }
    }

    #[test]
    fn sphere_triangles_face_outward() {
        let sphere = Geometry::sphere(1.0, 8, 6);
        for tri in sphere.indices.chunks_exact(3) {
            let p = |i: u32| Vector3::from(sphere.positions[i as usize]);
            let n = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            let centroid = (p(tri[0]) + p(tri[1]) + p(tri[2])) / 3.0;
            assert!(n.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn duplicated_uv_matches_primary_channel() {
        let floor = GeometryDescriptor::plane(10.0, 10.0, 4, 4)
            .with_duplicated_uv()
            .build();
        assert_eq!(floor.uv2.as_ref(), Some(&floor.uvs));
        let vertices = floor.to_vertices();
        assert!(vertices.iter().all(|v| v.tex_coords == v.tex_coords2));
    }

    #[test]
    fn without_second_channel_uv2_is_zeroed() {
        let sphere = GeometryDescriptor::sphere(1.0, 8, 6).build();
        assert!(sphere.uv2.is_none());
        assert!(sphere.to_vertices().iter().all(|v| v.tex_coords2 == [0.0, 0.0]));
    }

    #[test]
    fn plane_tangents_follow_u() {
        let vertices = Geometry::plane(2.0, 2.0, 2, 2).to_vertices();
        for v in vertices {
            assert!((v.tangent[0] - 1.0).abs() < 1e-5);
            assert!(v.tangent[1].abs() < 1e-5);
        }
    }
}
