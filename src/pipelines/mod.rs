//! Render pipelines and the shaders they load.
//!
//! - `basic` is the opaque standard material pipeline and the shared pipeline builder
//! - `transparent` is the alpha-blended standard material pipeline
//! - `light` holds the light uniform (bind group 2 of the standard pipelines)
//! - `helper` draws the directional light gizmo as unlit lines

pub mod basic;
pub mod helper;
pub mod light;
pub mod transparent;
