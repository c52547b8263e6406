use crate::backend::WgpuBackend;
use crate::graph::{Selector, SelectorKernel};
use crate::kernels::uniforms::SelectUniforms;
use crate::params::{Control, Kernel, ParamBlock, control};

/// Crossfades from `a` to `b` as the selector brightens.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Blend;

impl Kernel for Blend {
    const NAME: &'static str = "blendSelector";
    const CONTROLS: &'static [Control<Self>] = &[];
}

impl SelectorKernel for Blend {
    fn encode(&self) -> ParamBlock {
        ParamBlock::new()
    }
}

/// Picks `a` where the selector is darker than `boundary` and `b` elsewhere.
///
/// A non-zero `transition` softens the edge into a smooth band reaching that far
/// either side of the boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub boundary: f32,
    pub transition: f32,
}

impl Default for Select {
    fn default() -> Self {
        Self {
            boundary: 0.5,
            transition: 0.0,
        }
    }
}

impl Kernel for Select {
    const NAME: &'static str = "selectSelector";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("boundary", boundary: f32),
        control!("transition", transition: f32),
    ];
}

impl SelectorKernel for Select {
    fn encode(&self) -> ParamBlock {
        ParamBlock::uniform(&SelectUniforms {
            transition: self.transition.max(0.0),
            boundary: self.boundary,
            _padding: [0.0; 2],
        })
    }
}

pub type BlendSelector<B = WgpuBackend> = Selector<Blend, B>;
pub type SelectSelector<B = WgpuBackend> = Selector<Select, B>;

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::{UVec2, Vec4};

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::graph::{Generator, NodeRef, TextureProvider};
    use crate::nodes::{Constant, Wave};

    fn constant(backend: &SoftwareBackend, grey: f32) -> NodeRef<SoftwareBackend> {
        Rc::new(
            Generator::new(backend, Constant::new(grey, grey, grey))
                .unwrap()
                .with_size(16, 16),
        )
    }

    #[test]
    fn blend_follows_selector_luminance() {
        let backend = SoftwareBackend::new();
        let black = constant(&backend, 0.0);
        let white = constant(&backend, 1.0);
        let node =
            Selector::with_inputs(&backend, Blend, black, white, constant(&backend, 0.25)).unwrap();
        let v = node.greyscale_values(&[UVec2::new(1, 1)])[0];
        assert!((v - 0.25).abs() < 1.5 / 255.0);
    }

    #[test]
    fn select_thresholds_hard_then_soft() {
        let backend = SoftwareBackend::new();
        let black = constant(&backend, 0.0);
        let white = constant(&backend, 1.0);
        let ramp: NodeRef<SoftwareBackend> = Rc::new(
            Generator::new(&backend, Wave { frequency: 1.0 })
                .unwrap()
                .with_size(16, 16),
        );
        let node = Selector::with_inputs(&backend, Select::default(), black, white, ramp).unwrap();

        let row: Vec<UVec2> = (0..16).map(|x| UVec2::new(x, 8)).collect();
        let hard = node.greyscale_values(&row);
        assert!(hard.iter().all(|&g| g == 0.0 || g == 1.0));
        assert!(hard.contains(&0.0) && hard.contains(&1.0));

        node.set("transition", 0.3).unwrap();
        let soft = node.greyscale_values(&row);
        assert!(soft.iter().any(|&g| g > 0.05 && g < 0.95));
        assert_eq!(node.colour_values(&[UVec2::new(0, 0)])[0].w, 1.0);
    }

    #[test]
    fn select_rejects_mismatched_selector() {
        let backend = SoftwareBackend::new();
        let node = Selector::new(&backend, Select::default()).unwrap();
        node.set_input_a(constant(&backend, 0.0)).unwrap();
        let small: NodeRef<SoftwareBackend> = Rc::new(
            Generator::new(&backend, Constant::default())
                .unwrap()
                .with_size(4, 4),
        );
        assert!(node.set_selector(small).is_err());
        assert!(node.selector().is_none());
        assert_eq!(Vec4::ZERO, node.colour_values(&[UVec2::ZERO])[0]);
    }
}
