//! Scene data: geometry, materials, lights, transforms and their GPU forms.
//!
//! - `geometry` generates sphere and plane meshes on the CPU
//! - `model` holds the vertex format and uploaded meshes
//! - `texture` wraps GPU textures and their shared sampling settings
//! - `material` maps texture channels to a mesh and binds them for drawing
//! - `light` describes ambient and directional lights
//! - `transform` holds per-mesh position, rotation and scale
//! - `scene_graph` collects meshes and lights into a scene

pub mod geometry;
pub mod light;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
