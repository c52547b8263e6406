use std::cell::RefCell;

use super::node::{NodeCore, Pipeline};
use super::provider::{NodeRef, TextureProvider, check_acyclic};
use crate::backend::{ComputeBackend, TextureSize, WgpuBackend};
use crate::error::NoiseError;
use crate::kernels::Arity;
use crate::params::{Kernel, ParamBlock, Value, find_control};

/// Parameters of a kernel that transforms a single input.
pub trait ModifierKernel: Kernel {
    /// Pack the parameters for an input of the given size.
    fn encode(&self, input: TextureSize) -> ParamBlock;

    fn pipeline(&self) -> Pipeline {
        Pipeline::Kernel
    }

    /// Output size for an input of the given size.
    fn output_size(&self, input: TextureSize) -> TextureSize {
        input
    }
}

/// A node that transforms one input texture.
pub struct Modifier<K: ModifierKernel, B: ComputeBackend = WgpuBackend> {
    core: NodeCore<B>,
    params: RefCell<K>,
    input: RefCell<Option<NodeRef<B>>>,
}

impl<K: ModifierKernel, B: ComputeBackend> Modifier<K, B> {
    /// Compile the kernel for `params` on `backend`. The node starts unconnected
    /// and stale.
    ///
    /// # Errors
    ///
    /// [`NoiseError::KernelCompile`] if the kernel is not of this node's shape or
    /// fails to build.
    pub fn new(backend: &B, params: K) -> Result<Self, NoiseError> {
        Ok(Self {
            core: NodeCore::new(backend, K::NAME, Arity::Modifier)?,
            params: RefCell::new(params),
            input: RefCell::new(None),
        })
    }

    /// A modifier already connected to `input`.
    pub fn with_input(backend: &B, params: K, input: NodeRef<B>) -> Result<Self, NoiseError> {
        let node = Self::new(backend, params)?;
        *node.input.borrow_mut() = Some(input);
        Ok(node)
    }

    /// A copy of the current parameters.
    pub fn params(&self) -> K {
        self.params.borrow().clone()
    }

    /// Replace every parameter at once and mark the node stale.
    pub fn set_params(&self, params: K) {
        *self.params.borrow_mut() = params;
        self.core.mark_stale();
    }

    /// Edit the parameters in place.
    pub fn update(&self, edit: impl FnOnce(&mut K)) {
        edit(&mut self.params.borrow_mut());
        self.core.mark_stale();
    }

    /// The input, if connected.
    pub fn input(&self) -> Option<NodeRef<B>> {
        self.input.borrow().clone()
    }

    /// Connect the input, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`NoiseError::Cycle`] if `input` already reads from this node.
    pub fn set_input(&self, input: NodeRef<B>) -> Result<(), NoiseError> {
        check_acyclic(self, &input)?;
        *self.input.borrow_mut() = Some(input);
        self.core.mark_stale();
        Ok(())
    }

    /// Disconnect the input, returning it.
    pub fn take_input(&self) -> Option<NodeRef<B>> {
        self.core.mark_stale();
        self.input.borrow_mut().take()
    }

    /// Read a parameter by name.
    pub fn get(&self, name: &str) -> Result<Value, NoiseError> {
        Ok(find_control(K::CONTROLS, name)?.get(&self.params.borrow()))
    }

    /// Write a parameter by name and mark the node stale.
    ///
    /// # Errors
    ///
    /// [`NoiseError::UnknownParameter`] or [`NoiseError::ParameterType`]; the
    /// parameters are untouched on error.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), NoiseError> {
        find_control(K::CONTROLS, name)?.set(&mut self.params.borrow_mut(), value.into())?;
        self.core.mark_stale();
        Ok(())
    }

    /// Names accepted by `get` and `set`.
    pub fn control_names(&self) -> Vec<&'static str> {
        K::CONTROLS.iter().map(|c| c.name).collect()
    }

    /// Times the kernel has run.
    pub fn recompute_count(&self) -> u64 {
        self.core.recomputes()
    }
}

impl<K: ModifierKernel, B: ComputeBackend> TextureProvider<B> for Modifier<K, B> {
    fn texture(&self) -> Option<B::Texture> {
        let input = self.input()?;
        if !self.is_dirty() {
            return self.core.cached();
        }
        let source = input.texture()?;
        let input_size = self.core.backend().texture_size(&source);
        let params = self.params.borrow();
        let output = self.core.output_for(params.output_size(input_size));
        let block = params.encode(input_size);
        Some(self.core.run(output, &[&source], &block, params.pipeline()))
    }

    fn is_dirty(&self) -> bool {
        self.core
            .is_dirty(|| self.input().is_some_and(|input| input.is_dirty()))
    }

    fn can_produce(&self) -> bool {
        self.input.borrow().is_some()
    }

    fn texture_size(&self) -> TextureSize {
        let input = self
            .input()
            .map_or(TextureSize::DEFAULT, |input| input.texture_size());
        self.params.borrow().output_size(input)
    }

    fn upstream(&self) -> Vec<NodeRef<B>> {
        self.input().into_iter().collect()
    }

    fn kernel_name(&self) -> &'static str {
        self.core.name()
    }

    fn backend(&self) -> &B {
        self.core.backend()
    }
}
