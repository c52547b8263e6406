use std::cell::{Cell, RefCell};

use crate::backend::{ComputeBackend, TextureSize, WorkSize};
use crate::error::NoiseError;
use crate::kernels::{self, Arity};
use crate::params::ParamBlock;

thread_local! {
    /// Advances whenever any node on this thread becomes stale or is recomputed.
    static GENERATION: Cell<u64> = const { Cell::new(0) };
}

fn generation() -> u64 {
    GENERATION.with(Cell::get)
}

fn advance_generation() {
    GENERATION.with(|g| g.set(g.get() + 1));
}

/// How a node turns its inputs into output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pipeline {
    /// A single dispatch of the node's kernel.
    Kernel,
    /// The two-pass separable blur. The parameter block holds the horizontal
    /// then the vertical pass record.
    GaussianBlur,
}

/// State every node kind shares: the compiled kernel, the cached output and the
/// parameter buffers it is dispatched with.
pub(crate) struct NodeCore<B: ComputeBackend> {
    backend: B,
    name: &'static str,
    kernel: B::Kernel,
    output: RefCell<Option<B::Texture>>,
    scratch: RefCell<Option<B::Texture>>,
    buffers: RefCell<Vec<Option<B::Buffer>>>,
    stale: Cell<bool>,
    /// Last dirty answer and the generation it was computed in.
    dirty: Cell<Option<(u64, bool)>>,
    recomputes: Cell<u64>,
}

impl<B: ComputeBackend> NodeCore<B> {
    /// Compile `name`, which must be a kernel of the given arity.
    pub fn new(backend: &B, name: &'static str, arity: Arity) -> Result<Self, NoiseError> {
        let signature = kernels::lookup(name)?;
        if signature.arity != arity {
            return Err(NoiseError::KernelCompile {
                name: name.to_string(),
                reason: format!("{:?} kernel used as a {arity:?} node", signature.arity),
            });
        }
        let kernel = backend.compile(name)?;
        Ok(Self {
            backend: backend.clone(),
            name,
            kernel,
            output: RefCell::new(None),
            scratch: RefCell::new(None),
            buffers: RefCell::new(Vec::new()),
            stale: Cell::new(true),
            dirty: Cell::new(None),
            recomputes: Cell::new(0),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mark_stale(&self) {
        self.stale.set(true);
        advance_generation();
    }

    /// Whether the node is stale or `upstream_dirty` reports a changed input.
    ///
    /// The answer is remembered until any node changes, so a shared input is
    /// walked once however many paths reach it.
    pub fn is_dirty(&self, upstream_dirty: impl FnOnce() -> bool) -> bool {
        let now = generation();
        if let Some((at, dirty)) = self.dirty.get() {
            if at == now {
                return dirty;
            }
        }
        let dirty = self.stale.get() || upstream_dirty();
        self.dirty.set(Some((now, dirty)));
        dirty
    }

    pub fn cached(&self) -> Option<B::Texture> {
        self.output.borrow().clone()
    }

    pub fn recomputes(&self) -> u64 {
        self.recomputes.get()
    }

    /// The output texture at `size`, replacing the cached one if its size differs.
    pub fn output_for(&self, size: TextureSize) -> B::Texture {
        self.sized(&self.output, size, self.name)
    }

    fn sized(
        &self,
        slot: &RefCell<Option<B::Texture>>,
        size: TextureSize,
        label: &str,
    ) -> B::Texture {
        let mut slot = slot.borrow_mut();
        match slot.as_ref() {
            Some(texture) if self.backend.texture_size(texture) == size => texture.clone(),
            stale => {
                if stale.is_some() {
                    log::debug!("`{}` {label} resized to {size}", self.name);
                }
                let texture = self.backend.allocate_texture(size, label);
                *slot = Some(texture.clone());
                texture
            }
        }
    }

    /// Run the node's kernel into `output` and clear the stale flag.
    pub fn run(
        &self,
        output: B::Texture,
        inputs: &[&B::Texture],
        params: &ParamBlock,
        pipeline: Pipeline,
    ) -> B::Texture {
        self.upload(params);
        let buffers = self.buffers.borrow();
        let bound: Vec<&B::Buffer> = buffers.iter().flatten().collect();
        let size = self.backend.texture_size(&output);
        match (pipeline, bound.as_slice()) {
            (Pipeline::Kernel, _) => {
                self.backend
                    .dispatch(&self.kernel, inputs, &output, &bound, WorkSize::covering(size));
            }
            (Pipeline::GaussianBlur, &[horizontal, vertical]) => {
                let scratch = self.sized(&self.scratch, size, "blur scratch");
                self.backend.gaussian_blur(
                    &self.kernel,
                    inputs[0],
                    &scratch,
                    &output,
                    [horizontal, vertical],
                );
            }
            (Pipeline::GaussianBlur, other) => {
                log::warn!("`{}` blur needs 2 pass records, got {}", self.name, other.len());
            }
        }
        self.stale.set(false);
        advance_generation();
        self.recomputes.set(self.recomputes.get() + 1);
        log::debug!("`{}` recomputed ({} times)", self.name, self.recomputes.get());
        output
    }

    fn upload(&self, params: &ParamBlock) {
        let mut buffers = self.buffers.borrow_mut();
        buffers.resize_with(params.len(), || None);
        for (slot, bytes) in buffers.iter_mut().zip(params.buffers()) {
            self.backend.write_buffer(slot, bytes, self.name);
        }
    }
}
