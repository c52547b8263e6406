use std::cell::RefCell;

use super::node::{NodeCore, Pipeline};
use super::provider::{NodeRef, TextureProvider, agreed_size, check_acyclic, check_size};
use crate::backend::{ComputeBackend, TextureSize, WgpuBackend};
use crate::error::NoiseError;
use crate::kernels::Arity;
use crate::params::{Kernel, ParamBlock, Value, find_control};

/// Parameters of a kernel that picks between two inputs.
pub trait SelectorKernel: Kernel {
    fn encode(&self) -> ParamBlock;
}

const INPUT_A: usize = 0;
const INPUT_B: usize = 1;
const SELECTOR: usize = 2;

/// A node that chooses between two inputs using the luminance of a third.
///
/// All three inputs must share one size, enforced as for
/// [`Combiner`](super::Combiner).
pub struct Selector<K: SelectorKernel, B: ComputeBackend = WgpuBackend> {
    core: NodeCore<B>,
    params: RefCell<K>,
    inputs: RefCell<[Option<NodeRef<B>>; 3]>,
}

impl<K: SelectorKernel, B: ComputeBackend> Selector<K, B> {
    /// Compile the kernel for `params` on `backend`. The node starts unconnected
    /// and stale.
    ///
    /// # Errors
    ///
    /// [`NoiseError::KernelCompile`] if the kernel is not of this node's shape or
    /// fails to build.
    pub fn new(backend: &B, params: K) -> Result<Self, NoiseError> {
        Ok(Self {
            core: NodeCore::new(backend, K::NAME, Arity::Selector)?,
            params: RefCell::new(params),
            inputs: RefCell::new([None, None, None]),
        })
    }

    /// A selector already connected to all three inputs.
    pub fn with_inputs(
        backend: &B,
        params: K,
        a: NodeRef<B>,
        b: NodeRef<B>,
        selector: NodeRef<B>,
    ) -> Result<Self, NoiseError> {
        let node = Self::new(backend, params)?;
        node.set_input_a(a)?;
        node.set_input_b(b)?;
        node.set_selector(selector)?;
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

    /// The first input, if connected.
    pub fn input_a(&self) -> Option<NodeRef<B>> {
        self.inputs.borrow()[INPUT_A].clone()
    }

    /// The second input, if connected.
    pub fn input_b(&self) -> Option<NodeRef<B>> {
        self.inputs.borrow()[INPUT_B].clone()
    }

    /// The selector input, if connected.
    pub fn selector(&self) -> Option<NodeRef<B>> {
        self.inputs.borrow()[SELECTOR].clone()
    }

    /// Connect the first input.
    ///
    /// # Errors
    ///
    /// [`NoiseError::SizeMismatch`] if another connected input has a different size,
    /// [`NoiseError::Cycle`] if `input` already reads from this node. The slot is
    /// left unchanged on error.
    pub fn set_input_a(&self, input: NodeRef<B>) -> Result<(), NoiseError> {
        self.connect(INPUT_A, input)
    }

    /// Connect the second input. Fails as [`set_input_a`](Self::set_input_a) does.
    pub fn set_input_b(&self, input: NodeRef<B>) -> Result<(), NoiseError> {
        self.connect(INPUT_B, input)
    }

    /// Connect the texture whose luminance drives the choice.
    pub fn set_selector(&self, input: NodeRef<B>) -> Result<(), NoiseError> {
        self.connect(SELECTOR, input)
    }

    /// Disconnect all three inputs.
    pub fn clear_inputs(&self) {
        *self.inputs.borrow_mut() = [None, None, None];
        self.core.mark_stale();
    }

    fn connect(&self, slot: usize, input: NodeRef<B>) -> Result<(), NoiseError> {
        check_acyclic(self, &input)?;
        {
            let inputs = self.inputs.borrow();
            let siblings: Vec<_> = (0..3)
                .filter(|&i| i != slot)
                .map(|i| inputs[i].clone())
                .collect();
            check_size(&input, &siblings)?;
        }
        self.inputs.borrow_mut()[slot] = Some(input);
        self.core.mark_stale();
        Ok(())
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

impl<K: SelectorKernel, B: ComputeBackend> TextureProvider<B> for Selector<K, B> {
    fn texture(&self) -> Option<B::Texture> {
        let (a, b, selector) = (self.input_a()?, self.input_b()?, self.selector()?);
        if !self.is_dirty() {
            return self.core.cached();
        }
        let Some(size) = agreed_size(&[&a, &b, &selector]) else {
            log::warn!(
                "`{}` inputs disagree on size ({}, {} and {})",
                self.core.name(),
                a.texture_size(),
                b.texture_size(),
                selector.texture_size()
            );
            return None;
        };
        let (a, b, selector) = (a.texture()?, b.texture()?, selector.texture()?);
        let output = self.core.output_for(size);
        let block = self.params.borrow().encode();
        Some(
            self.core
                .run(output, &[&a, &b, &selector], &block, Pipeline::Kernel),
        )
    }

    fn is_dirty(&self) -> bool {
        self.core
            .is_dirty(|| self.upstream().iter().any(|input| input.is_dirty()))
    }

    fn can_produce(&self) -> bool {
        self.inputs.borrow().iter().all(Option::is_some)
    }

    fn texture_size(&self) -> TextureSize {
        self.input_a()
            .map_or(TextureSize::DEFAULT, |input| input.texture_size())
    }

    fn upstream(&self) -> Vec<NodeRef<B>> {
        self.inputs.borrow().iter().flatten().cloned().collect()
    }

    fn kernel_name(&self) -> &'static str {
        self.core.name()
    }

    fn backend(&self) -> &B {
        self.core.backend()
    }
}
