//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

use crate::backend::TextureSize;

/// Errors produced while building or wiring a noise graph.
///
/// Incomplete graphs are not errors: a node whose inputs are missing simply
/// yields `None` from [`TextureProvider::texture`](crate::TextureProvider::texture).
#[derive(Debug, Error)]
pub enum NoiseError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("failed to create device: {0}")]
    RequestDevice(String),

    #[error("unknown kernel `{0}`")]
    UnknownKernel(String),

    #[error("kernel `{name}` failed to compile: {reason}")]
    KernelCompile { name: String, reason: String },

    #[error("input size {found} does not match {expected}")]
    SizeMismatch {
        expected: TextureSize,
        found: TextureSize,
    },

    #[error("connecting this input would create a cycle")]
    Cycle,

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{name}` expects a {expected} value")]
    ParameterType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("texture readback failed: {0}")]
    Readback(String),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
