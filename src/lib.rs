//! # noisegraph
//!
//! **Procedural noise textures built from small compute kernels wired into a graph.**
//!
//! Generators create textures from parameters, modifiers transform one input,
//! combiners merge two and selectors pick between two using a third. Nodes
//! evaluate lazily: changing anything only marks the affected part of the graph
//! stale, and the work happens when a texture is pulled from the end of it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::rc::Rc;
//! use noisegraph::*;
//! use noisegraph::nodes::{ColourStop, Colorize, Simplex, Voronoi, Blend};
//!
//! fn main() -> Result<(), NoiseError> {
//!     let backend = WgpuBackend::from_config(&ContextConfig::default())?;
//!
//!     let clouds = Rc::new(Generator::new(&backend, Simplex::default())?);
//!     let cells = Rc::new(Generator::new(&backend, Voronoi::default())?);
//!     clouds.set("frequency", 3.0)?;
//!     cells.set("frequency", 6.0)?;
//!
//!     let mask = Rc::new(Generator::new(&backend, Simplex::default())?);
//!     let mixed = Rc::new(Selector::with_inputs(&backend, Blend, clouds, cells, mask)?);
//!
//!     let tinted = Modifier::with_input(
//!         &backend,
//!         Colorize::new([
//!             ColourStop::new(Vec4::new(0.1, 0.1, 0.3, 1.0), 0.0, 1.0),
//!             ColourStop::new(Vec4::new(0.9, 0.8, 0.5, 1.0), 1.0, 1.0),
//!         ]),
//!         mixed,
//!     )?;
//!     tinted.save_png("tinted.png".as_ref())
//! }
//! ```
//!
//! ## Backends
//!
//! [`WgpuBackend`] runs every kernel as a WGSL compute pipeline. [`SoftwareBackend`]
//! runs CPU twins of the same kernels and needs no device, which suits tests and
//! headless tools. Nodes are generic over the backend and default to wgpu.

mod backend;
mod error;
mod gpu;
mod graph;
pub mod kernels;
pub mod nodes;
mod params;

pub use backend::{
    ComputeBackend, SoftwareBackend, SoftwareTexture, TextureSize, WgpuBackend, WgpuKernel,
    WgpuTexture, WorkSize,
};
pub use error::NoiseError;
pub use gpu::{ContextConfig, GpuContext};
pub use graph::{
    Combiner, CombinerKernel, Generator, GeneratorKernel, GeneratorSettings, Modifier,
    ModifierKernel, NodeRef, Pipeline, Selector, SelectorKernel, TextureProvider,
};
pub use params::{Control, Kernel, ParamBlock, Value, ValueKind};

// Re-export glam types used in the public API
pub use glam::{UVec2, Vec3, Vec4};
