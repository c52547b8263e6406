use glam::Vec4;

use crate::backend::{TextureSize, WgpuBackend};
use crate::graph::{Modifier, ModifierKernel, Pipeline};
use crate::kernels::uniforms::{
    BlurPass, ClampUniforms, ColourCount, LoopUniforms, NormalMapUniforms, NormaliseUniforms,
    PerspectiveUniforms, RoundUniforms, ScaleBiasUniforms, ScaleCanvasUniforms, StepUniforms,
    StretchUniforms, WarpUniforms,
};
use crate::params::{Control, Kernel, ParamBlock, Value, ValueKind, control};

/// Absolute value in the noise domain.
///
/// Without `normalise` the result lands in the upper half of the stored range;
/// with it, `|n|` is stored directly and spans the full range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Absolute {
    pub normalise: bool,
}

impl Kernel for Absolute {
    const NAME: &'static str = "absoluteModifier";
    const CONTROLS: &'static [Control<Self>] = &[control!("normalise", normalise: bool)];
}

impl ModifierKernel for Absolute {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&NormaliseUniforms {
            normalise: self.normalise as u32,
            _padding: [0; 3],
        })
    }
}

/// Clamps noise values to `[minimum, maximum]`, optionally stretching that
/// range back over the whole output.
#[derive(Clone, Debug, PartialEq)]
pub struct Clamp {
    pub minimum: f32,
    pub maximum: f32,
    pub normalise: bool,
}

impl Default for Clamp {
    fn default() -> Self {
        Self {
            minimum: 0.0,
            maximum: 1.0,
            normalise: false,
        }
    }
}

impl Kernel for Clamp {
    const NAME: &'static str = "clampModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("minimum", minimum: f32),
        control!("maximum", maximum: f32),
        control!("normalise", normalise: bool),
    ];
}

impl ModifierKernel for Clamp {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&ClampUniforms {
            minimum: self.minimum,
            maximum: self.maximum,
            normalise: self.normalise as u32,
            _padding: 0,
        })
    }
}

/// Negates noise values. Applying it twice restores the input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Invert;

impl Kernel for Invert {
    const NAME: &'static str = "invertModifier";
    const CONTROLS: &'static [Control<Self>] = &[];
}

impl ModifierKernel for Invert {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::new()
    }
}

/// Wraps noise values so they repeat every `loop_value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Loop {
    pub loop_value: f32,
    pub normalise: bool,
}

impl Default for Loop {
    fn default() -> Self {
        Self {
            loop_value: 0.5,
            normalise: false,
        }
    }
}

impl Kernel for Loop {
    const NAME: &'static str = "loopModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("loop_value", loop_value: f32),
        control!("normalise", normalise: bool),
    ];
}

impl ModifierKernel for Loop {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        if !(self.loop_value > 0.0 && self.loop_value <= 1.0) {
            log::warn!(
                "loop value {} is outside (0, 1]; results may be unexpected",
                self.loop_value
            );
        }
        ParamBlock::uniform(&LoopUniforms {
            loop_value: self.loop_value,
            normalise: self.normalise as u32,
            _padding: [0; 2],
        })
    }
}

/// Snaps noise values to multiples of `round_value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    pub round_value: f32,
}

impl Default for Round {
    fn default() -> Self {
        Self { round_value: 0.25 }
    }
}

impl Kernel for Round {
    const NAME: &'static str = "roundModifier";
    const CONTROLS: &'static [Control<Self>] = &[control!("round_value", round_value: f32)];
}

impl ModifierKernel for Round {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&RoundUniforms {
            round_value: self.round_value,
            _padding: [0.0; 3],
        })
    }
}

/// `x * scale + bias` on stored values.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleBias {
    pub scale: f32,
    pub bias: f32,
}

impl Default for ScaleBias {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bias: 0.0,
        }
    }
}

impl Kernel for ScaleBias {
    const NAME: &'static str = "scaleBiasModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("scale", scale: f32),
        control!("bias", bias: f32),
    ];
}

impl ModifierKernel for ScaleBias {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&ScaleBiasUniforms {
            scale: self.scale,
            bias: self.bias,
            _padding: [0.0; 2],
        })
    }
}

/// Greyscale threshold: `low` below `boundary`, `high` from it upwards. All three
/// are noise-domain values compared against the input's luminance.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub low: f32,
    pub high: f32,
    pub boundary: f32,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            low: -1.0,
            high: 1.0,
            boundary: 0.0,
        }
    }
}

impl Kernel for Step {
    const NAME: &'static str = "stepModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("low", low: f32),
        control!("high", high: f32),
        control!("boundary", boundary: f32),
    ];
}

impl ModifierKernel for Step {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&StepUniforms {
            low: self.low,
            high: self.high,
            boundary: self.boundary,
            _padding: 0.0,
        })
    }
}

/// Rotates the texture by `angle` radians about an anchor in UV space.
#[derive(Clone, Debug, PartialEq)]
pub struct Rotate {
    pub x_anchor: f32,
    pub y_anchor: f32,
    pub angle: f32,
    /// Paint black where the rotated image leaves the input.
    pub cut_edges: bool,
}

impl Default for Rotate {
    fn default() -> Self {
        Self {
            x_anchor: 0.5,
            y_anchor: 0.5,
            angle: 0.0,
            cut_edges: true,
        }
    }
}

impl Kernel for Rotate {
    const NAME: &'static str = "rotateModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x_anchor", x_anchor: f32),
        control!("y_anchor", y_anchor: f32),
        control!("angle", angle: f32),
        control!("cut_edges", cut_edges: bool),
    ];
}

impl ModifierKernel for Rotate {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&WarpUniforms {
            anchor: [self.x_anchor, self.y_anchor],
            amount: self.angle,
            cut_edges: self.cut_edges as u32,
        })
    }
}

/// Twists the texture around an anchor, strongest at the anchor and fading to
/// nothing half the shorter side away.
#[derive(Clone, Debug, PartialEq)]
pub struct Swirl {
    pub x_anchor: f32,
    pub y_anchor: f32,
    /// Turns applied at the anchor.
    pub intensity: f32,
    pub cut_edges: bool,
}

impl Default for Swirl {
    fn default() -> Self {
        Self {
            x_anchor: 0.5,
            y_anchor: 0.5,
            intensity: 0.5,
            cut_edges: true,
        }
    }
}

impl Kernel for Swirl {
    const NAME: &'static str = "swirlModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x_anchor", x_anchor: f32),
        control!("y_anchor", y_anchor: f32),
        control!("intensity", intensity: f32),
        control!("cut_edges", cut_edges: bool),
    ];
}

impl ModifierKernel for Swirl {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&WarpUniforms {
            anchor: [self.x_anchor, self.y_anchor],
            amount: self.intensity,
            cut_edges: self.cut_edges as u32,
        })
    }
}

/// Scales the texture about an anchor. Factors above one magnify.
#[derive(Clone, Debug, PartialEq)]
pub struct Stretch {
    pub x_factor: f32,
    pub y_factor: f32,
    pub x_anchor: f32,
    pub y_anchor: f32,
}

impl Default for Stretch {
    fn default() -> Self {
        Self {
            x_factor: 1.0,
            y_factor: 1.0,
            x_anchor: 0.5,
            y_anchor: 0.5,
        }
    }
}

impl Kernel for Stretch {
    const NAME: &'static str = "stretchModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x_factor", x_factor: f32),
        control!("y_factor", y_factor: f32),
        control!("x_anchor", x_anchor: f32),
        control!("y_anchor", y_anchor: f32),
    ];
}

impl ModifierKernel for Stretch {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&StretchUniforms {
            factor: [self.x_factor, self.y_factor],
            anchor: [self.x_anchor, self.y_anchor],
        })
    }
}

/// Lays the texture back like a floor receding towards the top edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Perspective {
    /// Width of the far row relative to the near one.
    pub x_compression: f32,
    /// Vertical foreshortening.
    pub y_scale: f32,
    /// Horizontal lean of the far row.
    pub direction: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            x_compression: 2.0,
            y_scale: 0.5,
            direction: 0.0,
        }
    }
}

impl Kernel for Perspective {
    const NAME: &'static str = "perspectiveModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x_compression", x_compression: f32),
        control!("y_scale", y_scale: f32),
        control!("direction", direction: f32),
    ];
}

impl ModifierKernel for Perspective {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&PerspectiveUniforms {
            x_compression: self.x_compression,
            y_scale: self.y_scale,
            direction: self.direction,
            _padding: 0.0,
        })
    }
}

/// Treats input luminance as height and outputs tangent-space normals.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalMap {
    pub intensity: f32,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for NormalMap {
    fn default() -> Self {
        Self {
            intensity: 8.0,
            invert_x: false,
            invert_y: false,
        }
    }
}

impl Kernel for NormalMap {
    const NAME: &'static str = "normalMapModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("intensity", intensity: f32),
        control!("invert_x", invert_x: bool),
        control!("invert_y", invert_y: bool),
    ];
}

impl ModifierKernel for NormalMap {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&NormalMapUniforms {
            intensity: self.intensity,
            invert_x: self.invert_x as u32,
            invert_y: self.invert_y as u32,
            _padding: 0,
        })
    }
}

/// One stop of a [`Colorize`] gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColourStop {
    pub colour: Vec4,
    /// Input luminance at which the stop applies.
    pub position: f32,
    /// How strongly the colour replaces the input, from 0 to 1.
    pub intensity: f32,
}

impl ColourStop {
    pub fn new(colour: Vec4, position: f32, intensity: f32) -> Self {
        Self {
            colour,
            position,
            intensity,
        }
    }

    /// The stop an empty gradient falls back to. It leaves the input untouched.
    pub const NEUTRAL: Self = Self {
        colour: Vec4::ONE,
        position: 0.5,
        intensity: 0.0,
    };
}

/// Maps input luminance through a colour gradient.
///
/// Stops are kept sorted by position at all times. The sort is stable, so stops
/// sharing a position stay in the order they were added.
#[derive(Clone, Debug, PartialEq)]
pub struct Colorize {
    stops: Vec<ColourStop>,
    placeholder: bool,
}

impl Default for Colorize {
    fn default() -> Self {
        Self {
            stops: vec![ColourStop::NEUTRAL],
            placeholder: true,
        }
    }
}

impl Colorize {
    pub fn new(stops: impl IntoIterator<Item = ColourStop>) -> Self {
        let mut colorize = Self::default();
        colorize.set_stops(stops);
        colorize
    }

    pub fn stops(&self) -> &[ColourStop] {
        &self.stops
    }

    /// Add a stop. The first stop added replaces the neutral placeholder.
    pub fn add_stop(&mut self, stop: ColourStop) {
        if self.placeholder {
            self.stops.clear();
            self.placeholder = false;
        }
        self.stops.push(stop);
        self.sort();
    }

    /// Remove the stop at `index` in position order.
    pub fn remove_stop(&mut self, index: usize) -> Option<ColourStop> {
        if self.placeholder || index >= self.stops.len() {
            return None;
        }
        let stop = self.stops.remove(index);
        if self.stops.is_empty() {
            *self = Self::default();
        }
        Some(stop)
    }

    pub fn set_stops(&mut self, stops: impl IntoIterator<Item = ColourStop>) {
        *self = Self::default();
        for stop in stops {
            self.add_stop(stop);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn sort(&mut self) {
        self.stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    }
}

impl Kernel for Colorize {
    const NAME: &'static str = "colourModifier";
    const CONTROLS: &'static [Control<Self>] = &[];
}

impl ModifierKernel for Colorize {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        let colours: Vec<[f32; 4]> = self.stops.iter().map(|s| s.colour.to_array()).collect();
        let positions: Vec<f32> = self.stops.iter().map(|s| s.position).collect();
        let intensities: Vec<f32> = self.stops.iter().map(|s| s.intensity).collect();
        ParamBlock::new()
            .with_slice(&colours)
            .with_slice(&positions)
            .with_slice(&intensities)
            .with(&ColourCount {
                count: self.stops.len() as u32,
                _padding: [0; 3],
            })
    }
}

/// Places the input on a canvas of a different size.
///
/// The input is scaled by `x_scale`/`y_scale` and positioned so that the anchor
/// point of the input lands on the same relative point of the canvas; `(0, 0)` is
/// the top left corner and `(1, 1)` the bottom right. Uncovered canvas is black.
/// A zero width or height keeps the input's size.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleCanvas {
    pub width: u32,
    pub height: u32,
    pub x_anchor: f32,
    pub y_anchor: f32,
    pub x_scale: f32,
    pub y_scale: f32,
}

impl Default for ScaleCanvas {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            x_anchor: 0.0,
            y_anchor: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

impl Kernel for ScaleCanvas {
    const NAME: &'static str = "scaleCanvasModifier";
    const CONTROLS: &'static [Control<Self>] = &[
        Control {
            name: "width",
            kind: ValueKind::Int,
            get: |s: &Self| Value::Int(s.width as i32),
            set: |s: &mut Self, v: Value| {
                s.width = v.as_int("width")?.max(0) as u32;
                Ok(())
            },
        },
        Control {
            name: "height",
            kind: ValueKind::Int,
            get: |s: &Self| Value::Int(s.height as i32),
            set: |s: &mut Self, v: Value| {
                s.height = v.as_int("height")?.max(0) as u32;
                Ok(())
            },
        },
        control!("x_anchor", x_anchor: f32),
        control!("y_anchor", y_anchor: f32),
        control!("x_scale", x_scale: f32),
        control!("y_scale", y_scale: f32),
    ];
}

impl ModifierKernel for ScaleCanvas {
    fn encode(&self, input: TextureSize) -> ParamBlock {
        ParamBlock::uniform(&ScaleCanvasUniforms {
            anchor: [self.x_anchor, self.y_anchor],
            scale: [self.x_scale, self.y_scale],
            input_size: input.as_uvec2().to_array(),
            _padding: [0; 2],
        })
    }

    fn output_size(&self, input: TextureSize) -> TextureSize {
        if self.width == 0 || self.height == 0 {
            input
        } else {
            TextureSize::new(self.width, self.height)
        }
    }
}

/// Separable gaussian blur with standard deviation `sigma` in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianBlur {
    pub sigma: f32,
}

impl Default for GaussianBlur {
    fn default() -> Self {
        Self { sigma: 3.0 }
    }
}

impl Kernel for GaussianBlur {
    const NAME: &'static str = "gaussianBlur";
    const CONTROLS: &'static [Control<Self>] = &[control!("sigma", sigma: f32)];
}

impl ModifierKernel for GaussianBlur {
    fn encode(&self, _input: TextureSize) -> ParamBlock {
        let sigma = self.sigma.max(0.0);
        ParamBlock::new()
            .with(&BlurPass::new([1, 0], sigma))
            .with(&BlurPass::new([0, 1], sigma))
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::GaussianBlur
    }
}

pub type AbsoluteModifier<B = WgpuBackend> = Modifier<Absolute, B>;
pub type ClampModifier<B = WgpuBackend> = Modifier<Clamp, B>;
pub type InvertModifier<B = WgpuBackend> = Modifier<Invert, B>;
pub type LoopModifier<B = WgpuBackend> = Modifier<Loop, B>;
pub type RoundModifier<B = WgpuBackend> = Modifier<Round, B>;
pub type ScaleBiasModifier<B = WgpuBackend> = Modifier<ScaleBias, B>;
pub type StepModifier<B = WgpuBackend> = Modifier<Step, B>;
pub type RotateModifier<B = WgpuBackend> = Modifier<Rotate, B>;
pub type SwirlModifier<B = WgpuBackend> = Modifier<Swirl, B>;
pub type StretchModifier<B = WgpuBackend> = Modifier<Stretch, B>;
pub type PerspectiveModifier<B = WgpuBackend> = Modifier<Perspective, B>;
pub type NormalMapModifier<B = WgpuBackend> = Modifier<NormalMap, B>;
pub type ColorizeModifier<B = WgpuBackend> = Modifier<Colorize, B>;
pub type ScaleCanvasModifier<B = WgpuBackend> = Modifier<ScaleCanvas, B>;
pub type BlurModifier<B = WgpuBackend> = Modifier<GaussianBlur, B>;

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::UVec2;

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::graph::{Generator, NodeRef, TextureProvider};
    use crate::nodes::{Constant, Simplex};

    fn constant(backend: &SoftwareBackend, grey: f32, size: u32) -> NodeRef<SoftwareBackend> {
        Rc::new(
            Generator::new(backend, Constant::new(grey, grey, grey))
                .unwrap()
                .with_size(size, size),
        )
    }

    fn close(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() <= 1.5 / 255.0
    }

    #[test]
    fn unconnected_modifier_produces_nothing() {
        let backend = SoftwareBackend::new();
        let node = Modifier::new(&backend, Invert).unwrap();
        assert!(!node.can_produce());
        assert!(node.texture().is_none());
        assert!(node.is_dirty());
        assert_eq!(node.texture_size(), TextureSize::DEFAULT);
        assert_eq!(backend.dispatch_count(), 0);
    }

    #[test]
    fn invert_twice_restores_input() {
        let backend = SoftwareBackend::new();
        let noise: NodeRef<SoftwareBackend> = Rc::new(
            Generator::new(&backend, Simplex::default())
                .unwrap()
                .with_size(24, 24),
        );
        let once: NodeRef<SoftwareBackend> =
            Rc::new(Modifier::with_input(&backend, Invert, noise.clone()).unwrap());
        let twice = Modifier::with_input(&backend, Invert, once).unwrap();

        let positions = noise.all_positions();
        assert_eq!(
            twice.colour_values(&positions),
            noise.colour_values(&positions)
        );
    }

    #[test]
    fn colorize_sorts_stably() {
        let mut colorize = Colorize::default();
        assert_eq!(colorize.stops(), &[ColourStop::NEUTRAL]);

        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let green = Vec4::new(0.0, 1.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
        colorize.add_stop(ColourStop::new(red, 0.8, 1.0));
        colorize.add_stop(ColourStop::new(green, 0.2, 1.0));
        colorize.add_stop(ColourStop::new(blue, 0.5, 1.0));
        colorize.add_stop(ColourStop::new(red, 0.2, 0.5));

        let order: Vec<(f32, f32)> = colorize
            .stops()
            .iter()
            .map(|s| (s.position, s.intensity))
            .collect();
        assert_eq!(order, vec![(0.2, 1.0), (0.2, 0.5), (0.5, 1.0), (0.8, 1.0)]);
        assert_eq!(colorize.stops()[0].colour, green);

        let block = colorize.encode(TextureSize::DEFAULT);
        let positions: Vec<f32> = block.buffers()[1]
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(positions, vec![0.2, 0.2, 0.5, 0.8]);
        assert_eq!(block.buffers()[3][..4], 4u32.to_ne_bytes());
    }

    #[test]
    fn colorize_falls_back_to_neutral_stop() {
        let mut colorize = Colorize::new([ColourStop::new(Vec4::ZERO, 0.1, 1.0)]);
        assert_eq!(colorize.stops().len(), 1);
        assert!(colorize.remove_stop(0).is_some());
        assert_eq!(colorize.stops(), &[ColourStop::NEUTRAL]);
        assert!(colorize.remove_stop(0).is_none());
    }

    #[test]
    fn colorize_interpolates_between_stops() {
        let backend = SoftwareBackend::new();
        let grey = constant(&backend, 0.5, 8);
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let node = Modifier::with_input(
            &backend,
            Colorize::new([ColourStop::new(red, 0.0, 1.0), ColourStop::new(blue, 1.0, 1.0)]),
            grey,
        )
        .unwrap();

        let value = node.colour_values(&[UVec2::new(4, 4)])[0];
        assert!(close(value, Vec4::new(0.5, 0.0, 0.5, 1.0)), "{value}");

        node.update(|c| c.clear());
        let value = node.colour_values(&[UVec2::new(4, 4)])[0];
        assert!(close(value, Vec4::new(0.5, 0.5, 0.5, 1.0)), "{value}");
    }

    #[test]
    fn scale_canvas_sets_output_size() {
        let backend = SoftwareBackend::new();
        let input = constant(&backend, 1.0, 16);
        let node = Modifier::with_input(
            &backend,
            ScaleCanvas {
                width: 32,
                height: 8,
                ..Default::default()
            },
            input,
        )
        .unwrap();

        assert_eq!(node.texture_size(), TextureSize::new(32, 8));
        let values = node.colour_values(&[UVec2::new(3, 3), UVec2::new(20, 4)]);
        assert_eq!(values[0], Vec4::ONE);
        assert_eq!(values[1], Vec4::W);

        node.update(|canvas| canvas.width = 0);
        assert_eq!(node.texture_size(), TextureSize::new(16, 16));
    }

    #[test]
    fn blur_keeps_flat_fields_flat() {
        let backend = SoftwareBackend::new();
        let input = constant(&backend, 0.25, 16);
        let node = Modifier::with_input(&backend, GaussianBlur::default(), input).unwrap();
        let values = node.colour_values(&node.all_positions());
        let expected = input_value(0.25);
        assert!(values.iter().all(|v| *v == expected));
        // One dispatch for the constant, two for the blur passes.
        assert_eq!(backend.dispatch_count(), 3);
    }

    #[test]
    fn blur_reuses_scratch_and_pass_buffers() {
        let backend = SoftwareBackend::new();
        let input = constant(&backend, 0.25, 16);
        let node = Modifier::with_input(&backend, GaussianBlur::default(), input).unwrap();
        node.texture();
        let textures = backend.texture_allocations();
        let buffers = backend.buffer_allocations();

        node.set("sigma", 1.0).unwrap();
        node.texture();
        node.set("sigma", 5.0).unwrap();
        node.texture();
        assert_eq!(backend.texture_allocations(), textures);
        assert_eq!(backend.buffer_allocations(), buffers);
        assert_eq!(backend.dispatch_count(), 7);
    }

    fn input_value(grey: f32) -> Vec4 {
        let q = (grey * 255.0).round() / 255.0;
        Vec4::new(q, q, q, 1.0)
    }

    #[test]
    fn step_is_two_level() {
        let backend = SoftwareBackend::new();
        let noise: NodeRef<SoftwareBackend> = Rc::new(
            Generator::new(&backend, Simplex::default())
                .unwrap()
                .with_size(32, 32),
        );
        let node = Modifier::with_input(&backend, Step::default(), noise).unwrap();
        let grey = node.greyscale_values(&node.all_positions());
        assert!(grey.iter().all(|&g| g == 0.0 || g == 1.0));
        assert!(grey.contains(&0.0) && grey.contains(&1.0));
    }

    #[test]
    fn rotate_cuts_corners() {
        let backend = SoftwareBackend::new();
        let input = constant(&backend, 1.0, 16);
        let node = Modifier::with_input(
            &backend,
            Rotate {
                angle: std::f32::consts::FRAC_PI_4,
                ..Default::default()
            },
            input,
        )
        .unwrap();
        let values = node.colour_values(&[UVec2::new(0, 0), UVec2::new(8, 8)]);
        assert_eq!(values[0], Vec4::W);
        assert_eq!(values[1], Vec4::ONE);

        node.set("cut_edges", false).unwrap();
        assert_eq!(node.colour_values(&[UVec2::new(0, 0)])[0], Vec4::ONE);
    }
}
