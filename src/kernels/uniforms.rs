//! Parameter records as the kernels read them.
//!
//! Each record mirrors a WGSL `struct` in the kernel of the same name, field for
//! field. Fields are laid out so every `vec2` sits on an 8-byte boundary and every
//! `vec4` on a 16-byte one, and records are padded to a multiple of 16 bytes to
//! satisfy uniform buffer layout rules.

use bytemuck::{Pod, Zeroable};

/// `simplexGenerator` and `voronoiGenerator`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CoherentUniforms {
    pub position: [f32; 2],
    pub z: f32,
    pub w: f32,
    pub rotation: [f32; 4],
    pub offset_strength: f32,
    pub octaves: i32,
    pub persistence: f32,
    pub frequency: f32,
    pub lacunarity: f32,
    pub use_4d: u32,
    pub sphere_map: u32,
    pub seamless: u32,
}

/// `waveGenerator`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaveUniforms {
    pub rotation: [f32; 4],
    pub frequency: f32,
    pub offset_strength: f32,
    pub _padding: [f32; 2],
}

/// `sphereGenerator`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SphereUniforms {
    pub rotation: [f32; 4],
    pub position: [f32; 2],
    pub z: f32,
    pub offset: f32,
    pub frequency: f32,
    pub offset_strength: f32,
    pub _padding: [f32; 2],
}

/// `uniformGenerator`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ConstantUniforms {
    pub colour: [f32; 4],
}

/// `absoluteModifier` and `addCombiner`: a single normalise switch.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct NormaliseUniforms {
    pub normalise: u32,
    pub _padding: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ClampUniforms {
    pub minimum: f32,
    pub maximum: f32,
    pub normalise: u32,
    pub _padding: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LoopUniforms {
    pub loop_value: f32,
    pub normalise: u32,
    pub _padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RoundUniforms {
    pub round_value: f32,
    pub _padding: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ScaleBiasUniforms {
    pub scale: f32,
    pub bias: f32,
    pub _padding: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StepUniforms {
    pub low: f32,
    pub high: f32,
    pub boundary: f32,
    pub _padding: f32,
}

/// `rotateModifier` and `swirlModifier`. `amount` is the angle or the swirl intensity.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WarpUniforms {
    pub anchor: [f32; 2],
    pub amount: f32,
    pub cut_edges: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StretchUniforms {
    pub factor: [f32; 2],
    pub anchor: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PerspectiveUniforms {
    pub x_compression: f32,
    pub y_scale: f32,
    pub direction: f32,
    pub _padding: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct NormalMapUniforms {
    pub intensity: f32,
    pub invert_x: u32,
    pub invert_y: u32,
    pub _padding: u32,
}

/// Length of the three parallel stop arrays bound to `colourModifier`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColourCount {
    pub count: u32,
    pub _padding: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ScaleCanvasUniforms {
    pub anchor: [f32; 2],
    pub scale: [f32; 2],
    pub input_size: [u32; 2],
    pub _padding: [u32; 2],
}

/// One direction of the separable `gaussianBlur` kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurPass {
    pub direction: [i32; 2],
    pub radius: i32,
    pub sigma: f32,
}

impl BlurPass {
    /// Largest tap radius either backend will sample.
    pub const MAX_RADIUS: i32 = 64;

    pub fn new(direction: [i32; 2], sigma: f32) -> Self {
        let radius = (sigma * 3.0).ceil().clamp(0.0, Self::MAX_RADIUS as f32) as i32;
        Self {
            direction,
            radius,
            sigma,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SelectUniforms {
    pub transition: f32,
    pub boundary: f32,
    pub _padding: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn records_are_uniform_sized() {
        assert_eq!(size_of::<CoherentUniforms>(), 64);
        assert_eq!(size_of::<WaveUniforms>(), 32);
        assert_eq!(size_of::<SphereUniforms>(), 48);
        assert_eq!(size_of::<ScaleCanvasUniforms>(), 32);
        for size in [
            size_of::<ConstantUniforms>(),
            size_of::<NormaliseUniforms>(),
            size_of::<ClampUniforms>(),
            size_of::<LoopUniforms>(),
            size_of::<RoundUniforms>(),
            size_of::<ScaleBiasUniforms>(),
            size_of::<StepUniforms>(),
            size_of::<WarpUniforms>(),
            size_of::<StretchUniforms>(),
            size_of::<PerspectiveUniforms>(),
            size_of::<NormalMapUniforms>(),
            size_of::<ColourCount>(),
            size_of::<BlurPass>(),
            size_of::<SelectUniforms>(),
        ] {
            assert_eq!(size, 16);
        }
    }

    #[test]
    fn blur_radius_covers_three_sigma() {
        assert_eq!(BlurPass::new([1, 0], 3.0).radius, 9);
        assert_eq!(BlurPass::new([1, 0], 0.0).radius, 0);
        assert_eq!(BlurPass::new([0, 1], 1000.0).radius, BlurPass::MAX_RADIUS);
    }
}
