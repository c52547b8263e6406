use crate::backend::WgpuBackend;
use crate::graph::{Combiner, CombinerKernel};
use crate::kernels::uniforms::NormaliseUniforms;
use crate::params::{Control, Kernel, ParamBlock, control};

/// `a + b`, saturating at white, or their average when `normalise` is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Add {
    pub normalise: bool,
}

impl Kernel for Add {
    const NAME: &'static str = "addCombiner";
    const CONTROLS: &'static [Control<Self>] = &[control!("normalise", normalise: bool)];
}

impl CombinerKernel for Add {
    fn encode(&self) -> ParamBlock {
        ParamBlock::uniform(&NormaliseUniforms {
            normalise: self.normalise as u32,
            _padding: [0; 3],
        })
    }
}

macro_rules! plain_combiner {
    ($(#[$doc:meta])* $ty:ident, $kernel:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default, PartialEq)]
        pub struct $ty;

        impl Kernel for $ty {
            const NAME: &'static str = $kernel;
            const CONTROLS: &'static [Control<Self>] = &[];
        }

        impl CombinerKernel for $ty {
            fn encode(&self) -> ParamBlock {
                ParamBlock::new()
            }
        }
    };
}

plain_combiner!(
    /// `a - b` in the noise domain.
    Subtract,
    "subtractCombiner"
);
plain_combiner!(
    /// `a * b` per channel.
    Multiply,
    "multiplyCombiner"
);
plain_combiner!(
    /// `a / b` per channel, saturating. Division by zero gives white.
    Divide,
    "divideCombiner"
);
plain_combiner!(
    /// The darker of `a` and `b`, per channel.
    Min,
    "minCombiner"
);
plain_combiner!(
    /// `a` raised to the power `b`, per channel.
    Power,
    "powerCombiner"
);

pub type AddCombiner<B = WgpuBackend> = Combiner<Add, B>;
pub type SubtractCombiner<B = WgpuBackend> = Combiner<Subtract, B>;
pub type MultiplyCombiner<B = WgpuBackend> = Combiner<Multiply, B>;
pub type DivideCombiner<B = WgpuBackend> = Combiner<Divide, B>;
pub type MinCombiner<B = WgpuBackend> = Combiner<Min, B>;
pub type PowerCombiner<B = WgpuBackend> = Combiner<Power, B>;

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::{UVec2, Vec4};

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::graph::{Generator, NodeRef, TextureProvider};
    use crate::nodes::Constant;

    fn constant(backend: &SoftwareBackend, r: f32, g: f32, b: f32) -> NodeRef<SoftwareBackend> {
        Rc::new(
            Generator::new(backend, Constant::new(r, g, b))
                .unwrap()
                .with_size(8, 8),
        )
    }

    fn quantised(v: Vec4) -> Vec4 {
        (v * 255.0).round() / 255.0
    }

    const CENTRE: UVec2 = UVec2::new(4, 4);

    #[test]
    fn multiply_by_white_is_identity() {
        let backend = SoftwareBackend::new();
        let a = constant(&backend, 0.6, 0.4, 0.3);
        let white = constant(&backend, 1.0, 1.0, 1.0);
        let node = Combiner::with_inputs(&backend, Multiply, a.clone(), white).unwrap();

        let product = node.colour_values(&[CENTRE])[0];
        assert_eq!(product, a.colour_values(&[CENTRE])[0]);
        assert!((product - Vec4::new(0.6, 0.4, 0.3, 1.0)).abs().max_element() < 1.0 / 255.0);
    }

    #[test]
    fn add_saturates_or_averages() {
        let backend = SoftwareBackend::new();
        let a = constant(&backend, 0.6, 0.4, 0.3);
        let stored = a.colour_values(&[CENTRE])[0];
        let node = Combiner::with_inputs(&backend, Add::default(), a.clone(), a.clone()).unwrap();

        let sum = node.colour_values(&[CENTRE])[0];
        let expected = quantised((stored * 2.0).min(Vec4::ONE)).truncate().extend(1.0);
        assert_eq!(sum, expected);
        assert_eq!(sum.x, 1.0);

        node.set("normalise", true).unwrap();
        assert_eq!(node.colour_values(&[CENTRE])[0], stored);
    }

    #[test]
    fn subtract_works_in_noise_domain() {
        let backend = SoftwareBackend::new();
        let a = constant(&backend, 0.75, 0.5, 0.5);
        let b = constant(&backend, 0.5, 0.5, 1.0);
        let node = Combiner::with_inputs(&backend, Subtract, a, b).unwrap();
        let v = node.colour_values(&[CENTRE])[0];
        // (0.5 - 0) -> 0.75, (0 - 0) -> 0.5, (0 - 1) -> 0.
        assert!((v - Vec4::new(0.75, 0.5, 0.0, 1.0)).abs().max_element() < 2.0 / 255.0);
    }

    #[test]
    fn divide_by_black_is_white() {
        let backend = SoftwareBackend::new();
        let a = constant(&backend, 0.2, 0.2, 0.2);
        let black = constant(&backend, 0.0, 0.0, 0.0);
        let node = Combiner::with_inputs(&backend, Divide, a, black).unwrap();
        assert_eq!(node.colour_values(&[CENTRE])[0], Vec4::ONE);
    }

    #[test]
    fn min_and_power() {
        let backend = SoftwareBackend::new();
        let a = constant(&backend, 0.2, 0.8, 1.0);
        let b = constant(&backend, 0.6, 0.4, 0.0);
        let min = Combiner::with_inputs(&backend, Min, a.clone(), b.clone()).unwrap();
        let power = Combiner::with_inputs(&backend, Power, a, b).unwrap();

        let low = min.colour_values(&[CENTRE])[0];
        assert!((low - Vec4::new(0.2, 0.4, 0.0, 1.0)).abs().max_element() < 1.0 / 255.0);
        let raised = power.colour_values(&[CENTRE])[0];
        assert_eq!(raised.z, 1.0);
        assert!(raised.x > 0.2);
    }
}
