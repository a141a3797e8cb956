//! Render composition and pipeline batching.
//!
//! Flows describe what to draw as a [`Render`] tree. The frame step flattens
//! it into one batch per pipeline and draws the batches in a fixed order:
//! opaque meshes, transparent meshes, then lines.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing draw operations
//! - [`Instanced<'a>`] is one mesh with its material and instance buffer
//! - [`Lines<'a>`] is an unlit line list

use crate::data_structures::model::Mesh;

/// One mesh drawn `amount` times from an instance buffer.
#[derive(Clone, Copy, Debug)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Mesh,
    pub material: &'a wgpu::BindGroup,
    pub amount: usize,
}

/// Vertex buffer of a line list with `amount` vertices.
#[derive(Clone, Copy, Debug)]
pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub amount: u32,
}

/// How a flow wants to be drawn.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders an opaque mesh
/// - `Transparent(Instanced)` renders an alpha-blended mesh after all opaque ones
/// - `Lines(Lines)` renders unlit lines on top of the meshes
/// - `Composed(Vec<Render>)` renders every element
#[derive(Debug)]
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Transparent(Instanced<'a>),
    Lines(Lines<'a>),
    Composed(Vec<Render<'a>>),
}

/// Draw lists per pipeline, filled from one or more [`Render`] trees.
#[derive(Debug, Default)]
pub struct Batches<'a> {
    pub basics: Vec<Instanced<'a>>,
    pub transparents: Vec<Instanced<'a>>,
    pub lines: Vec<Lines<'a>>,
}

impl<'a> Batches<'a> {
    pub fn is_empty(&self) -> bool {
        self.basics.is_empty() && self.transparents.is_empty() && self.lines.is_empty()
    }
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Default(instanced) => batches.basics.push(instanced),
            Render::Transparent(instanced) => batches.transparents.push(instanced),
            Render::Lines(lines) => batches.lines.push(lines),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}
