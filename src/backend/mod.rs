//! Compute backends that execute the kernel catalogue.
//!
//! Nodes never talk to a device directly. They hold a cheaply clonable
//! [`ComputeBackend`] handle and go through it to compile kernels, allocate
//! textures, upload parameter blocks and dispatch work. Two implementations ship
//! with the crate:
//!
//! - [`WgpuBackend`] runs the WGSL kernels as compute pipelines on a GPU.
//! - [`SoftwareBackend`] evaluates the same kernels on the CPU. It needs no
//!   device, which makes it the backend of choice for tests and headless tools.

mod software;
mod wgpu_backend;

use std::fmt;

use glam::UVec2;

pub use software::{SoftwareBackend, SoftwareTexture};
pub use wgpu_backend::{WgpuBackend, WgpuKernel, WgpuTexture};

use crate::error::NoiseError;

/// Width and height of a texture in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    /// Size used by generators and by nodes whose first input is not yet connected.
    pub const DEFAULT: Self = Self::new(128, 128);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether `position` addresses a pixel inside the texture.
    pub fn contains(&self, position: UVec2) -> bool {
        position.x < self.width && position.y < self.height
    }

    pub fn as_uvec2(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

impl Default for TextureSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TextureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Number of workgroups to launch for a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkSize {
    pub x: u32,
    pub y: u32,
}

impl WorkSize {
    /// Edge length of the square workgroups declared by every kernel.
    pub const WORKGROUP_EDGE: u32 = 8;

    /// Enough workgroups to cover every pixel of `size`.
    pub fn covering(size: TextureSize) -> Self {
        Self {
            x: size.width.div_ceil(Self::WORKGROUP_EDGE),
            y: size.height.div_ceil(Self::WORKGROUP_EDGE),
        }
    }
}

/// A device able to run the kernel catalogue.
///
/// Every method is synchronous: [`dispatch`](Self::dispatch) and
/// [`gaussian_blur`](Self::gaussian_blur) return only once the output texture
/// holds the finished result.
pub trait ComputeBackend: Clone + 'static {
    /// Device image. Clones share the same storage.
    type Texture: Clone;
    /// Raw parameter block storage.
    type Buffer;
    /// A compiled kernel, resolved once per node.
    type Kernel: Clone;

    /// Resolve and compile the kernel registered under `name`.
    fn compile(&self, name: &str) -> Result<Self::Kernel, NoiseError>;

    /// Allocate an uninitialised RGBA8 texture.
    fn allocate_texture(&self, size: TextureSize, label: &str) -> Self::Texture;

    /// Create a texture initialised from tightly packed RGBA8 rows.
    fn upload_texture(&self, size: TextureSize, rgba: &[u8], label: &str) -> Self::Texture;

    fn texture_size(&self, texture: &Self::Texture) -> TextureSize;

    /// Write `bytes` into the buffer in `slot`.
    ///
    /// The existing buffer is reused when its length matches, otherwise a new one
    /// replaces it.
    fn write_buffer(&self, slot: &mut Option<Self::Buffer>, bytes: &[u8], label: &str);

    /// Run `kernel` once over `output`.
    ///
    /// `inputs` are listed in slot order, skipping the output slot. `params` are bound
    /// in order as the kernel's parameter group.
    fn dispatch(
        &self,
        kernel: &Self::Kernel,
        inputs: &[&Self::Texture],
        output: &Self::Texture,
        params: &[&Self::Buffer],
        work: WorkSize,
    );

    /// Separable gaussian blur of `input` into `output`.
    ///
    /// `passes` hold the horizontal then the vertical
    /// [`BlurPass`](crate::kernels::uniforms::BlurPass) record. The first pass
    /// writes `scratch`, which must be the size of `output`.
    fn gaussian_blur(
        &self,
        kernel: &Self::Kernel,
        input: &Self::Texture,
        scratch: &Self::Texture,
        output: &Self::Texture,
        passes: [&Self::Buffer; 2],
    );

    /// Copy the texture back to host memory as tightly packed RGBA8 rows.
    fn read_texture(&self, texture: &Self::Texture) -> Result<Vec<u8>, NoiseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_size_rounds_up() {
        let work = WorkSize::covering(TextureSize::new(130, 8));
        assert_eq!(work, WorkSize { x: 17, y: 1 });
    }

    #[test]
    fn contains_excludes_edge() {
        let size = TextureSize::new(4, 2);
        assert!(size.contains(UVec2::new(3, 1)));
        assert!(!size.contains(UVec2::new(4, 0)));
        assert!(!size.contains(UVec2::new(0, 2)));
    }
}
