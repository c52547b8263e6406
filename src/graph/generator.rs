use std::cell::{Cell, RefCell};

use glam::Vec3;

use super::node::{NodeCore, Pipeline};
use super::provider::{NodeRef, TextureProvider, check_acyclic};
use crate::backend::{ComputeBackend, TextureSize, WgpuBackend};
use crate::error::NoiseError;
use crate::kernels::Arity;
use crate::params::{Control, Kernel, ParamBlock, Value, ValueKind, control, find_control};

/// Neutral displacement: mid grey decodes to zero offset.
const NEUTRAL_OFFSET: [u8; 4] = [128, 128, 128, 255];

/// Settings every generator has, whatever its kernel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorSettings {
    pub width: u32,
    pub height: u32,
    /// How far the displacement inputs move each sample point.
    pub offset_strength: f32,
    /// Rotation of the sample space about the texture centre, in radians per axis.
    pub rotation: Vec3,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            width: TextureSize::DEFAULT.width,
            height: TextureSize::DEFAULT.height,
            offset_strength: 0.2,
            rotation: Vec3::ZERO,
        }
    }
}

impl GeneratorSettings {
    pub fn size(&self) -> TextureSize {
        TextureSize::new(self.width.max(1), self.height.max(1))
    }

    const CONTROLS: &'static [Control<Self>] = &[
        Control {
            name: "width",
            kind: ValueKind::Int,
            get: |s: &Self| Value::Int(s.width as i32),
            set: |s: &mut Self, v: Value| {
                s.width = v.as_int("width")?.max(1) as u32;
                Ok(())
            },
        },
        Control {
            name: "height",
            kind: ValueKind::Int,
            get: |s: &Self| Value::Int(s.height as i32),
            set: |s: &mut Self, v: Value| {
                s.height = v.as_int("height")?.max(1) as u32;
                Ok(())
            },
        },
        control!("offset_strength", offset_strength: f32),
        control!("x_rotation", rotation.x: f32),
        control!("y_rotation", rotation.y: f32),
        control!("z_rotation", rotation.z: f32),
    ];
}

/// Parameters of a kernel that creates a texture from nothing.
pub trait GeneratorKernel: Kernel {
    fn encode(&self, settings: &GeneratorSettings) -> ParamBlock;
}

/// A node that creates a texture from its parameters alone.
///
/// Two optional displacement inputs perturb where each pixel is sampled. Their
/// red channel, decoded to `[-1, 1]` and scaled by the offset strength, moves the
/// sample point along x and y respectively.
pub struct Generator<K: GeneratorKernel, B: ComputeBackend = WgpuBackend> {
    core: NodeCore<B>,
    params: RefCell<K>,
    settings: RefCell<GeneratorSettings>,
    x_offset: RefCell<Option<NodeRef<B>>>,
    y_offset: RefCell<Option<NodeRef<B>>>,
    neutral: RefCell<Option<B::Texture>>,
    /// Which displacement inputs supplied a texture at the last run.
    displaced: Cell<[bool; 2]>,
}

impl<K: GeneratorKernel, B: ComputeBackend> Generator<K, B> {
    /// Compile the kernel for `params` on `backend`. The node starts unconnected
    /// and stale.
    ///
    /// # Errors
    ///
    /// [`NoiseError::KernelCompile`] if the kernel is not of this node's shape or
    /// fails to build.
    pub fn new(backend: &B, params: K) -> Result<Self, NoiseError> {
        Ok(Self {
            core: NodeCore::new(backend, K::NAME, Arity::Generator)?,
            params: RefCell::new(params),
            settings: RefCell::new(GeneratorSettings::default()),
            x_offset: RefCell::new(None),
            y_offset: RefCell::new(None),
            neutral: RefCell::new(None),
            displaced: Cell::new([false; 2]),
        })
    }

    /// Builder form of [`set_size`](Self::set_size).
    pub fn with_size(self, width: u32, height: u32) -> Self {
        self.set_size(width, height);
        self
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

    /// A copy of the settings shared by every generator kind.
    pub fn settings(&self) -> GeneratorSettings {
        *self.settings.borrow()
    }

    /// Replace the shared settings and mark the node stale.
    pub fn set_settings(&self, settings: GeneratorSettings) {
        *self.settings.borrow_mut() = settings;
        self.core.mark_stale();
    }

    /// Resize the output. Zero is raised to one. Downstream sizes follow at once;
    /// textures are replaced on the next evaluation.
    pub fn set_size(&self, width: u32, height: u32) {
        let mut settings = self.settings.borrow_mut();
        settings.width = width.max(1);
        settings.height = height.max(1);
        self.core.mark_stale();
    }

    /// How far a full-scale displacement moves the sample point, in texture widths.
    pub fn set_offset_strength(&self, strength: f32) {
        self.settings.borrow_mut().offset_strength = strength;
        self.core.mark_stale();
    }

    /// Rotate the sampled noise space, in radians about each axis.
    pub fn set_rotation(&self, rotation: Vec3) {
        self.settings.borrow_mut().rotation = rotation;
        self.core.mark_stale();
    }

    /// The x displacement input, if connected.
    pub fn x_offset(&self) -> Option<NodeRef<B>> {
        self.x_offset.borrow().clone()
    }

    /// The y displacement input, if connected.
    pub fn y_offset(&self) -> Option<NodeRef<B>> {
        self.y_offset.borrow().clone()
    }

    /// Connect or disconnect the x displacement input.
    pub fn set_x_offset(&self, input: Option<NodeRef<B>>) -> Result<(), NoiseError> {
        self.connect(&self.x_offset, input)
    }

    /// Connect or disconnect the y displacement input.
    pub fn set_y_offset(&self, input: Option<NodeRef<B>>) -> Result<(), NoiseError> {
        self.connect(&self.y_offset, input)
    }

    fn connect(
        &self,
        slot: &RefCell<Option<NodeRef<B>>>,
        input: Option<NodeRef<B>>,
    ) -> Result<(), NoiseError> {
        if let Some(input) = &input {
            check_acyclic(self, input)?;
        }
        *slot.borrow_mut() = input;
        self.core.mark_stale();
        Ok(())
    }

    /// Read a kernel parameter or a generator setting by name.
    pub fn get(&self, name: &str) -> Result<Value, NoiseError> {
        if let Ok(control) = find_control(GeneratorSettings::CONTROLS, name) {
            return Ok(control.get(&self.settings.borrow()));
        }
        Ok(find_control(K::CONTROLS, name)?.get(&self.params.borrow()))
    }

    /// Write a kernel parameter or a generator setting by name.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), NoiseError> {
        let value = value.into();
        if let Ok(control) = find_control(GeneratorSettings::CONTROLS, name) {
            control.set(&mut self.settings.borrow_mut(), value)?;
        } else {
            find_control(K::CONTROLS, name)?.set(&mut self.params.borrow_mut(), value)?;
        }
        self.core.mark_stale();
        Ok(())
    }

    /// Names accepted by [`get`](Self::get) and [`set`](Self::set).
    pub fn control_names(&self) -> Vec<&'static str> {
        GeneratorSettings::CONTROLS
            .iter()
            .map(|c| c.name)
            .chain(K::CONTROLS.iter().map(|c| c.name))
            .collect()
    }

    /// Times the kernel has run.
    pub fn recompute_count(&self) -> u64 {
        self.core.recomputes()
    }

    fn neutral_offset(&self, size: TextureSize) -> B::Texture {
        let mut neutral = self.neutral.borrow_mut();
        if let Some(texture) = neutral.as_ref() {
            if self.core.backend().texture_size(texture) == size {
                return texture.clone();
            }
        }
        let rgba = NEUTRAL_OFFSET.repeat(size.pixel_count());
        let texture = self
            .core
            .backend()
            .upload_texture(size, &rgba, "neutral offset");
        *neutral = Some(texture.clone());
        texture
    }

    /// The displacement input's texture, or the neutral one when it is absent or
    /// cannot produce. The flag tells which of the two was used.
    fn offset_texture(&self, input: Option<NodeRef<B>>, size: TextureSize) -> (B::Texture, bool) {
        match input.and_then(|input| input.texture()) {
            Some(texture) => (texture, true),
            None => (self.neutral_offset(size), false),
        }
    }
}

impl<K: GeneratorKernel, B: ComputeBackend> TextureProvider<B> for Generator<K, B> {
    fn texture(&self) -> Option<B::Texture> {
        if !self.is_dirty() {
            return self.core.cached();
        }
        let size = self.texture_size();
        let (x_offset, x_used) = self.offset_texture(self.x_offset(), size);
        let (y_offset, y_used) = self.offset_texture(self.y_offset(), size);
        self.displaced.set([x_used, y_used]);
        let output = self.core.output_for(size);
        let params = self.params.borrow().encode(&self.settings.borrow());
        Some(
            self.core
                .run(output, &[&x_offset, &y_offset], &params, Pipeline::Kernel),
        )
    }

    fn is_dirty(&self) -> bool {
        // An input that cannot produce only matters once it starts or stops doing so.
        self.core.is_dirty(|| {
            [self.x_offset(), self.y_offset()]
                .into_iter()
                .zip(self.displaced.get())
                .any(|(input, used)| match input {
                    Some(input) if input.can_produce() => !used || input.is_dirty(),
                    Some(_) => used,
                    None => false,
                })
        })
    }

    fn can_produce(&self) -> bool {
        true
    }

    fn texture_size(&self) -> TextureSize {
        self.settings.borrow().size()
    }

    fn upstream(&self) -> Vec<NodeRef<B>> {
        [self.x_offset(), self.y_offset()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn kernel_name(&self) -> &'static str {
        self.core.name()
    }

    fn backend(&self) -> &B {
        self.core.backend()
    }
}
