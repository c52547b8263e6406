//! The node graph.
//!
//! Nodes come in four shapes, distinguished by how many textures they read:
//!
//! - [`Generator`]: none, apart from two optional displacement inputs.
//! - [`Modifier`]: one.
//! - [`Combiner`]: two of the same size.
//! - [`Selector`]: two of the same size plus a selector of that size too.
//!
//! Each shape is generic over a parameter record from [`nodes`](crate::nodes),
//! which picks the kernel, and over the [`ComputeBackend`](crate::ComputeBackend)
//! that runs it. Nodes are shared through [`NodeRef`] handles, so one node may
//! feed any number of downstream nodes and is still computed once per change.
//!
//! ```
//! use std::rc::Rc;
//! use noisegraph::{Combiner, Generator, Modifier, SoftwareBackend, TextureProvider};
//! use noisegraph::nodes::{Add, Invert, Simplex, Wave};
//!
//! let backend = SoftwareBackend::new();
//! let noise = Rc::new(Generator::new(&backend, Simplex::default())?);
//! let waves = Rc::new(Generator::new(&backend, Wave::default())?);
//! let inverted = Rc::new(Modifier::with_input(&backend, Invert, noise.clone())?);
//! let sum = Combiner::with_inputs(&backend, Add::default(), inverted, waves)?;
//!
//! assert!(sum.texture().is_some());
//! noise.set("frequency", 2.0)?;
//! assert!(sum.is_dirty());
//! # Ok::<(), noisegraph::NoiseError>(())
//! ```

mod combiner;
mod generator;
mod modifier;
mod node;
mod provider;
mod selector;

pub use self::combiner::{Combiner, CombinerKernel};
pub use self::generator::{Generator, GeneratorKernel, GeneratorSettings};
pub use self::modifier::{Modifier, ModifierKernel};
pub use self::node::Pipeline;
pub use self::provider::{NodeRef, TextureProvider};
pub use self::selector::{Selector, SelectorKernel};
