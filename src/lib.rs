//! snowscape
//!
//! A moonlit snow field under a slowly turning planet, rendered with wgpu on
//! native targets and in the browser through WebGL.
//!
//! High-level modules
//! - `camera`: camera, projection, orbit controller and the camera uniform
//! - `config`: startup configuration shared by the binary and the web entry
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: geometry, materials, lights, textures and the scene graph
//! - `debug_panel`: egui sliders bound to scene values
//! - `flow`: the event loop and the per-frame flow trait
//! - `gui`: the egui overlay and its share of window input
//! - `pipelines`: the mesh, transparent and line pipelines plus the light uniform
//! - `resources`: asynchronous texture loading
//! - `render`: render composition and pipeline batching
//! - `scene`: the snow scene itself
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug_panel;
pub mod flow;
pub mod gui;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point: the default scene on the `canvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    let config = config::AppConfig::default();
    let constructors = vec![scene::SnowScene::constructor(config.variant)];
    flow::run(config, constructors).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
