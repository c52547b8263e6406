//! A CPU implementation of [`ComputeBackend`].
//!
//! Textures are plain RGBA8 vectors and every kernel has a Rust body that
//! mirrors its WGSL source. Results are quantised to 8 bits per channel exactly
//! as an `rgba8unorm` storage texture would be. The backend also counts
//! dispatches and buffer allocations so callers can observe caching behaviour.
//!
//! # Example
//!
//! ```
//! use noisegraph::{Generator, SoftwareBackend, TextureProvider, nodes::Constant};
//!
//! let backend = SoftwareBackend::new();
//! let grey = Generator::new(&backend, Constant::default()).unwrap();
//! assert!(grey.texture().is_some());
//! assert_eq!(backend.dispatch_count(), 1);
//! ```

mod kernels;
mod noise;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use glam::Vec4;

use self::kernels::{KernelArgs, KernelFn, Pixels};
use super::{ComputeBackend, TextureSize, WorkSize};
use crate::error::NoiseError;
use crate::kernels::{self as catalogue, KernelSignature};

/// A host-memory RGBA8 texture. Clones share storage.
#[derive(Clone)]
pub struct SoftwareTexture {
    size: TextureSize,
    label: Rc<str>,
    pixels: Rc<RefCell<Vec<[u8; 4]>>>,
}

impl SoftwareTexture {
    fn new(size: TextureSize, label: &str, pixels: Vec<[u8; 4]>) -> Self {
        Self {
            size,
            label: label.into(),
            pixels: Rc::new(RefCell::new(pixels)),
        }
    }

    pub fn size(&self) -> TextureSize {
        self.size
    }

    /// Whether both handles refer to the same storage.
    pub fn same_storage(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for SoftwareTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareTexture")
            .field("label", &self.label)
            .field("size", &self.size)
            .finish()
    }
}

/// A compiled CPU kernel.
#[derive(Clone, Copy)]
pub struct SoftwareKernel {
    pub signature: &'static KernelSignature,
    run: KernelFn,
}

#[derive(Default)]
struct Counters {
    dispatches: Cell<u64>,
    buffer_allocations: Cell<u64>,
    texture_allocations: Cell<u64>,
}

/// Evaluates kernels on the calling thread.
#[derive(Clone, Default)]
pub struct SoftwareBackend {
    counters: Rc<Counters>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel executions so far. A blur counts once per pass.
    pub fn dispatch_count(&self) -> u64 {
        self.counters.dispatches.get()
    }

    /// Parameter buffers created (not reused) so far.
    pub fn buffer_allocations(&self) -> u64 {
        self.counters.buffer_allocations.get()
    }

    /// Textures created so far, uploads included.
    pub fn texture_allocations(&self) -> u64 {
        self.counters.texture_allocations.get()
    }

    fn run(&self, kernel: &SoftwareKernel, inputs: &[&SoftwareTexture], output: &SoftwareTexture, params: &[&[u8]]) {
        self.counters.dispatches.set(self.counters.dispatches.get() + 1);
        let result = {
            let guards: Vec<_> = inputs.iter().map(|t| t.pixels.borrow()).collect();
            let args = KernelArgs {
                inputs: inputs
                    .iter()
                    .zip(&guards)
                    .map(|(t, data)| Pixels {
                        size: t.size,
                        data: data.as_slice(),
                    })
                    .collect(),
                size: output.size,
                params: params.to_vec(),
            };
            (kernel.run)(&args)
        };
        *output.pixels.borrow_mut() = result.into_iter().map(quantise).collect();
    }
}

fn quantise(v: Vec4) -> [u8; 4] {
    let q = (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [q.x as u8, q.y as u8, q.z as u8, q.w as u8]
}

impl ComputeBackend for SoftwareBackend {
    type Texture = SoftwareTexture;
    type Buffer = Vec<u8>;
    type Kernel = SoftwareKernel;

    fn compile(&self, name: &str) -> Result<Self::Kernel, NoiseError> {
        let signature = catalogue::lookup(name)?;
        let run = kernels::body(name).ok_or_else(|| NoiseError::KernelCompile {
            name: name.to_string(),
            reason: "no CPU implementation".to_string(),
        })?;
        Ok(SoftwareKernel { signature, run })
    }

    fn allocate_texture(&self, size: TextureSize, label: &str) -> Self::Texture {
        log::trace!("allocating {size} texture `{label}`");
        self.counters
            .texture_allocations
            .set(self.counters.texture_allocations.get() + 1);
        SoftwareTexture::new(size, label, vec![[0; 4]; size.pixel_count()])
    }

    fn upload_texture(&self, size: TextureSize, rgba: &[u8], label: &str) -> Self::Texture {
        self.counters
            .texture_allocations
            .set(self.counters.texture_allocations.get() + 1);
        let mut pixels: Vec<[u8; 4]> = rgba
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        pixels.resize(size.pixel_count(), [0; 4]);
        SoftwareTexture::new(size, label, pixels)
    }

    fn texture_size(&self, texture: &Self::Texture) -> TextureSize {
        texture.size
    }

    fn write_buffer(&self, slot: &mut Option<Self::Buffer>, bytes: &[u8], label: &str) {
        match slot {
            Some(buffer) if buffer.len() == bytes.len() => buffer.copy_from_slice(bytes),
            _ => {
                log::trace!("allocating {} byte buffer `{label}`", bytes.len());
                self.counters
                    .buffer_allocations
                    .set(self.counters.buffer_allocations.get() + 1);
                *slot = Some(bytes.to_vec());
            }
        }
    }

    fn dispatch(
        &self,
        kernel: &Self::Kernel,
        inputs: &[&Self::Texture],
        output: &Self::Texture,
        params: &[&Self::Buffer],
        _work: WorkSize,
    ) {
        let params: Vec<&[u8]> = params.iter().map(|b| b.as_slice()).collect();
        self.run(kernel, inputs, output, &params);
    }

    fn gaussian_blur(
        &self,
        kernel: &Self::Kernel,
        input: &Self::Texture,
        scratch: &Self::Texture,
        output: &Self::Texture,
        [horizontal, vertical]: [&Self::Buffer; 2],
    ) {
        self.run(kernel, &[input], scratch, &[horizontal.as_slice()]);
        self.run(kernel, &[scratch], output, &[vertical.as_slice()]);
    }

    fn read_texture(&self, texture: &Self::Texture) -> Result<Vec<u8>, NoiseError> {
        Ok(texture.pixels.borrow().iter().flatten().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::uniforms::BlurPass;

    #[test]
    fn write_buffer_reuses_same_length() {
        let backend = SoftwareBackend::new();
        let mut slot = None;
        backend.write_buffer(&mut slot, &[1, 2, 3, 4], "a");
        backend.write_buffer(&mut slot, &[5, 6, 7, 8], "a");
        assert_eq!(backend.buffer_allocations(), 1);
        assert_eq!(slot.as_deref(), Some(&[5u8, 6, 7, 8][..]));

        backend.write_buffer(&mut slot, &[0; 8], "a");
        assert_eq!(backend.buffer_allocations(), 2);
    }

    #[test]
    fn compile_rejects_unknown_names() {
        let backend = SoftwareBackend::new();
        assert!(backend.compile("invertModifier").is_ok());
        assert!(matches!(
            backend.compile("inverseModifier"),
            Err(NoiseError::UnknownKernel(_))
        ));
    }

    #[test]
    fn invert_dispatch_quantises() {
        let backend = SoftwareBackend::new();
        let size = TextureSize::new(2, 1);
        let input = backend.upload_texture(size, &[0, 64, 255, 255, 10, 20, 30, 255], "in");
        let output = backend.allocate_texture(size, "out");
        let kernel = backend.compile("invertModifier").unwrap();
        backend.dispatch(&kernel, &[&input], &output, &[], WorkSize::covering(size));

        let pixels = backend.read_texture(&output).unwrap();
        assert_eq!(pixels, vec![255, 191, 0, 255, 245, 235, 225, 255]);
        assert_eq!(backend.dispatch_count(), 1);
    }

    #[test]
    fn blur_runs_two_passes() {
        let backend = SoftwareBackend::new();
        let size = TextureSize::new(4, 4);
        let input = backend.upload_texture(size, &[200; 64], "in");
        let scratch = backend.allocate_texture(size, "scratch");
        let output = backend.allocate_texture(size, "out");
        let kernel = backend.compile("gaussianBlur").unwrap();
        let horizontal = bytemuck::bytes_of(&BlurPass::new([1, 0], 1.5)).to_vec();
        let vertical = bytemuck::bytes_of(&BlurPass::new([0, 1], 1.5)).to_vec();
        backend.gaussian_blur(&kernel, &input, &scratch, &output, [&horizontal, &vertical]);
        assert_eq!(backend.dispatch_count(), 2);
        let pixels = backend.read_texture(&output).unwrap();
        assert!(pixels.chunks(4).all(|p| p[0] == 200 && p[3] == 255));
    }
}
