//! Scene contents: meshes and lights.
//!
//! The scene is flat and add-only. Meshes and lights are appended once while
//! the scene is built and are addressed by the index `add_*` returned. After
//! that only scalar fields change (transforms, light parameters, texture
//! sampling), which [`Scene::write_to_buffers`] uploads before each draw.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::GeometryDescriptor,
        light::Light,
        material::{DefaultTextures, MaterialBinding, SurfaceMaterial},
        model::Mesh,
        transform::{InstanceRaw, Transform},
    },
    render::{Instanced, Render},
};

/// A drawable: generated geometry, its material and where it sits.
#[derive(Debug)]
pub struct MeshNode {
    pub name: String,
    pub geometry: GeometryDescriptor,
    pub material: SurfaceMaterial,
    pub transform: Transform,
    mesh: Mesh,
    binding: MaterialBinding,
    instance_buffer: wgpu::Buffer,
    uploaded: Transform,
}

impl MeshNode {
    pub fn new(
        device: &wgpu::Device,
        material_layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
        name: &str,
        geometry: GeometryDescriptor,
        material: SurfaceMaterial,
        transform: Transform,
    ) -> Self {
        let built = geometry.build();
        log::debug!(
            "{}: {} vertices, {} triangles",
            name,
            built.vertex_count(),
            built.indices.len() / 3
        );
        let mesh = Mesh::from_geometry(device, name, &built);
        let binding = material.upload(device, material_layout, defaults, name);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&[transform.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: name.to_string(),
            geometry,
            material,
            transform,
            mesh,
            binding,
            instance_buffer,
            uploaded: transform,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.material.transparent
    }

    /// Upload the transform and material parameters if they changed.
    pub fn write_to_buffers(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
    ) {
        if self.transform != self.uploaded {
            let raw: InstanceRaw = self.transform.to_raw();
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
            self.uploaded = self.transform;
        }
        self.binding
            .sync(device, queue, material_layout, defaults, &self.material);
    }

    pub fn get_render(&self) -> Render<'_> {
        let instanced = Instanced {
            instance: &self.instance_buffer,
            mesh: &self.mesh,
            material: &self.binding.bind_group,
            amount: 1,
        };
        if self.is_transparent() {
            Render::Transparent(instanced)
        } else {
            Render::Default(instanced)
        }
    }
}

/// Add-only collection of meshes and lights.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<MeshNode>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: MeshNode) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn meshes(&self) -> &[MeshNode] {
        &self.meshes
    }

    pub fn mesh(&self, idx: usize) -> Option<&MeshNode> {
        self.meshes.get(idx)
    }

    pub fn mesh_mut(&mut self, idx: usize) -> Option<&mut MeshNode> {
        self.meshes.get_mut(idx)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Mutable access to the light values. The list itself cannot grow or shrink here.
    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn write_to_buffers(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
    ) {
        for mesh in &mut self.meshes {
            mesh.write_to_buffers(device, queue, material_layout, defaults);
        }
    }

    /// Opaque meshes and transparent meshes, in insertion order.
    pub fn get_render(&self) -> Render<'_> {
        Render::Composed(self.meshes.iter().map(MeshNode::get_render).collect())
    }
}
