//! The kernel catalogue.
//!
//! Every kernel a node can dispatch is registered here under its public name
//! together with its [`KernelSignature`]: which texture slots it reads, which slot
//! it writes and how its parameter buffers are bound. Backends resolve names
//! through [`lookup`] when a node is constructed.
//!
//! # Binding layout
//!
//! Bind group 0 holds textures, one binding per slot. Input slots are sampled
//! textures, the output slot is a write-only `rgba8unorm` storage texture:
//!
//! | Arity     | Inputs                      | Output |
//! |-----------|-----------------------------|--------|
//! | Generator | x, y displacement at 1, 2   | 0      |
//! | Modifier  | 0                           | 1      |
//! | Combiner  | 0, 1                        | 2      |
//! | Selector  | 0, 1 and the selector at 2  | 3      |
//!
//! Bind group 1 holds the parameter buffers in declaration order and is absent
//! for kernels that take no parameters.

pub mod uniforms;

use crate::error::NoiseError;

/// The dataflow shape of a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Generator,
    Modifier,
    Combiner,
    Selector,
}

impl Arity {
    /// Texture slots read by the kernel, in dispatch order.
    pub const fn input_slots(self) -> &'static [u32] {
        match self {
            Arity::Generator => &[1, 2],
            Arity::Modifier => &[0],
            Arity::Combiner => &[0, 1],
            Arity::Selector => &[0, 1, 2],
        }
    }

    /// Texture slot written by the kernel.
    pub const fn output_slot(self) -> u32 {
        match self {
            Arity::Generator => 0,
            Arity::Modifier => 1,
            Arity::Combiner => 2,
            Arity::Selector => 3,
        }
    }
}

/// How a parameter buffer is bound in group 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamBinding {
    Uniform,
    /// Read-only storage, used for variable-length arrays.
    Storage,
}

/// Static description of a kernel.
#[derive(Debug)]
pub struct KernelSignature {
    pub name: &'static str,
    pub arity: Arity,
    pub params: &'static [ParamBinding],
    source: &'static str,
}

impl KernelSignature {
    const fn new(
        name: &'static str,
        arity: Arity,
        params: &'static [ParamBinding],
        source: &'static str,
    ) -> Self {
        Self {
            name,
            arity,
            params,
            source,
        }
    }

    /// Complete WGSL module: the shared helpers followed by the kernel body.
    pub fn wgsl(&self) -> String {
        format!("{COMMON}\n{}", self.source)
    }
}

const COMMON: &str = include_str!("../shaders/common.wgsl");

const UNIFORM: &[ParamBinding] = &[ParamBinding::Uniform];
const NONE: &[ParamBinding] = &[];

use Arity::*;

/// Every kernel known to the crate.
pub static CATALOGUE: &[KernelSignature] = &[
    KernelSignature::new("uniformGenerator", Generator, UNIFORM, include_str!("../shaders/uniform_generator.wgsl")),
    KernelSignature::new("simplexGenerator", Generator, UNIFORM, include_str!("../shaders/simplex_generator.wgsl")),
    KernelSignature::new("voronoiGenerator", Generator, UNIFORM, include_str!("../shaders/voronoi_generator.wgsl")),
    KernelSignature::new("waveGenerator", Generator, UNIFORM, include_str!("../shaders/wave_generator.wgsl")),
    KernelSignature::new("sphereGenerator", Generator, UNIFORM, include_str!("../shaders/sphere_generator.wgsl")),
    KernelSignature::new("absoluteModifier", Modifier, UNIFORM, include_str!("../shaders/absolute_modifier.wgsl")),
    KernelSignature::new("clampModifier", Modifier, UNIFORM, include_str!("../shaders/clamp_modifier.wgsl")),
    KernelSignature::new("invertModifier", Modifier, NONE, include_str!("../shaders/invert_modifier.wgsl")),
    KernelSignature::new("loopModifier", Modifier, UNIFORM, include_str!("../shaders/loop_modifier.wgsl")),
    KernelSignature::new("roundModifier", Modifier, UNIFORM, include_str!("../shaders/round_modifier.wgsl")),
    KernelSignature::new("scaleBiasModifier", Modifier, UNIFORM, include_str!("../shaders/scale_bias_modifier.wgsl")),
    KernelSignature::new("stepModifier", Modifier, UNIFORM, include_str!("../shaders/step_modifier.wgsl")),
    KernelSignature::new("rotateModifier", Modifier, UNIFORM, include_str!("../shaders/rotate_modifier.wgsl")),
    KernelSignature::new("swirlModifier", Modifier, UNIFORM, include_str!("../shaders/swirl_modifier.wgsl")),
    KernelSignature::new("stretchModifier", Modifier, UNIFORM, include_str!("../shaders/stretch_modifier.wgsl")),
    KernelSignature::new("perspectiveModifier", Modifier, UNIFORM, include_str!("../shaders/perspective_modifier.wgsl")),
    KernelSignature::new("normalMapModifier", Modifier, UNIFORM, include_str!("../shaders/normal_map_modifier.wgsl")),
    KernelSignature::new(
        "colourModifier",
        Modifier,
        &[
            ParamBinding::Storage,
            ParamBinding::Storage,
            ParamBinding::Storage,
            ParamBinding::Uniform,
        ],
        include_str!("../shaders/colour_modifier.wgsl"),
    ),
    KernelSignature::new("scaleCanvasModifier", Modifier, UNIFORM, include_str!("../shaders/scale_canvas_modifier.wgsl")),
    KernelSignature::new("gaussianBlur", Modifier, UNIFORM, include_str!("../shaders/gaussian_blur.wgsl")),
    KernelSignature::new("addCombiner", Combiner, UNIFORM, include_str!("../shaders/add_combiner.wgsl")),
    KernelSignature::new("subtractCombiner", Combiner, NONE, include_str!("../shaders/subtract_combiner.wgsl")),
    KernelSignature::new("multiplyCombiner", Combiner, NONE, include_str!("../shaders/multiply_combiner.wgsl")),
    KernelSignature::new("divideCombiner", Combiner, NONE, include_str!("../shaders/divide_combiner.wgsl")),
    KernelSignature::new("minCombiner", Combiner, NONE, include_str!("../shaders/min_combiner.wgsl")),
    KernelSignature::new("powerCombiner", Combiner, NONE, include_str!("../shaders/power_combiner.wgsl")),
    KernelSignature::new("blendSelector", Selector, NONE, include_str!("../shaders/blend_selector.wgsl")),
    KernelSignature::new("selectSelector", Selector, UNIFORM, include_str!("../shaders/select_selector.wgsl")),
];

/// Find a kernel by name.
pub fn lookup(name: &str) -> Result<&'static KernelSignature, NoiseError> {
    CATALOGUE
        .iter()
        .find(|k| k.name == name)
        .ok_or_else(|| NoiseError::UnknownKernel(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        let k = lookup("multiplyCombiner").unwrap();
        assert_eq!(k.arity, Combiner);
        assert!(k.params.is_empty());
        assert!(matches!(
            lookup("nopeModifier"),
            Err(NoiseError::UnknownKernel(name)) if name == "nopeModifier"
        ));
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in CATALOGUE.iter().enumerate() {
            assert!(CATALOGUE[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
        }
    }

    #[test]
    fn slots_do_not_collide() {
        for arity in [Generator, Modifier, Combiner, Selector] {
            assert!(!arity.input_slots().contains(&arity.output_slot()));
        }
    }

    #[test]
    fn every_source_declares_main() {
        for k in CATALOGUE {
            assert!(k.wgsl().contains("fn main("), "{} has no entry point", k.name);
        }
    }
}
