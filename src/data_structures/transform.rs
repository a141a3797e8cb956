//! Object transforms and their GPU representation.
//!
//! A [`Transform`] is stored as position, Euler rotation and scale so animation
//! code can write a single axis angle (e.g. `rotation.y`). It is packed into an
//! [`InstanceRaw`] vertex-buffer entry (model and normal matrices) before drawing.

use cgmath::{Matrix3, Matrix4, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};

use crate::data_structures::model;

/// Euler angles in radians, applied in X, Y, Z order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotation {
    pub fn to_quaternion(&self) -> Quaternion<f32> {
        Quaternion::from_angle_x(Rad(self.x))
            * Quaternion::from_angle_y(Rad(self.y))
            * Quaternion::from_angle_z(Rad(self.z))
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Position, rotation and scale of a mesh in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Rotation,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Rotation::default(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::new()
        }
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Rotation { x, y, z };
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation.to_quaternion())
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: Matrix3::from(self.rotation.to_quaternion()).into(),
            handedness,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
}

/**
 * Instance data follows the six per-vertex attributes of `ModelVertex`, so it
 * starts at shader location 6. A mat4 takes four vec4 slots, the normal
 * matrix three vec3 slots.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // the shader only moves to the next entry when it starts a new instance
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};
    use std::f32::consts::PI;

    #[test]
    fn quarter_turn_about_x_lays_a_plane_flat() {
        let transform = Transform::new().rotated(-PI * 0.5, 0.0, 0.0);
        let up = Matrix3::from(transform.rotation.to_quaternion()) * Vector3::unit_z();
        assert!((up - Vector3::unit_y()).magnitude() < 1e-6);
    }

    #[test]
    fn matrix_translates_after_rotating() {
        let transform = Transform::at(0.0, 15.0, -90.0).rotated(0.0, PI, 0.0);
        let p = transform.to_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x + 1.0).abs() < 1e-5);
        assert!((p.y - 15.0).abs() < 1e-5);
        assert!((p.z + 90.0).abs() < 1e-5);
    }
}
