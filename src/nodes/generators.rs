use crate::backend::WgpuBackend;
use crate::graph::{Generator, GeneratorKernel, GeneratorSettings};
use crate::kernels::uniforms::{
    CoherentUniforms, ConstantUniforms, SphereUniforms, WaveUniforms,
};
use crate::params::{Control, Kernel, ParamBlock, control};

fn rotation(settings: &GeneratorSettings) -> [f32; 4] {
    settings.rotation.extend(0.0).to_array()
}

/// A flat colour.
#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Constant {
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }
}

impl Default for Constant {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

impl Kernel for Constant {
    const NAME: &'static str = "uniformGenerator";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("red", red: f32),
        control!("green", green: f32),
        control!("blue", blue: f32),
    ];
}

impl GeneratorKernel for Constant {
    fn encode(&self, _settings: &GeneratorSettings) -> ParamBlock {
        ParamBlock::uniform(&ConstantUniforms {
            colour: [self.red, self.green, self.blue, 1.0],
        })
    }
}

/// Fractal simplex noise.
///
/// `octaves` layers are summed, each at `lacunarity` times the frequency and
/// `persistence` times the amplitude of the last. `seamless` samples a torus in
/// 4D so the texture tiles; `sphere_map` wraps it around a sphere instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Simplex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub octaves: i32,
    pub persistence: f32,
    pub frequency: f32,
    pub lacunarity: f32,
    pub use_4d: bool,
    pub sphere_map: bool,
    pub seamless: bool,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            w: 1.0,
            octaves: 6,
            persistence: 0.5,
            frequency: 1.0,
            lacunarity: 2.0,
            use_4d: false,
            sphere_map: false,
            seamless: false,
        }
    }
}

impl Kernel for Simplex {
    const NAME: &'static str = "simplexGenerator";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x", x: f32),
        control!("y", y: f32),
        control!("z", z: f32),
        control!("w", w: f32),
        control!("octaves", octaves: i32),
        control!("persistence", persistence: f32),
        control!("frequency", frequency: f32),
        control!("lacunarity", lacunarity: f32),
        control!("use_4d", use_4d: bool),
        control!("sphere_map", sphere_map: bool),
        control!("seamless", seamless: bool),
    ];
}

impl GeneratorKernel for Simplex {
    fn encode(&self, settings: &GeneratorSettings) -> ParamBlock {
        ParamBlock::uniform(&CoherentUniforms {
            position: [self.x, self.y],
            z: self.z,
            w: self.w,
            rotation: rotation(settings),
            offset_strength: settings.offset_strength,
            octaves: self.octaves,
            persistence: self.persistence,
            frequency: self.frequency,
            lacunarity: self.lacunarity,
            use_4d: self.use_4d as u32,
            sphere_map: self.sphere_map as u32,
            seamless: self.seamless as u32,
        })
    }
}

/// Cellular noise: distance to the nearest feature point, summed over octaves.
///
/// With `seamless` set each octave's frequency is rounded to a whole number of
/// cells so the texture tiles; the position is then ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct Voronoi {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub octaves: i32,
    pub persistence: f32,
    pub frequency: f32,
    pub lacunarity: f32,
    pub sphere_map: bool,
    pub seamless: bool,
}

impl Default for Voronoi {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            octaves: 1,
            persistence: 0.5,
            frequency: 1.0,
            lacunarity: 2.0,
            sphere_map: false,
            seamless: false,
        }
    }
}

impl Kernel for Voronoi {
    const NAME: &'static str = "voronoiGenerator";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x", x: f32),
        control!("y", y: f32),
        control!("z", z: f32),
        control!("octaves", octaves: i32),
        control!("persistence", persistence: f32),
        control!("frequency", frequency: f32),
        control!("lacunarity", lacunarity: f32),
        control!("sphere_map", sphere_map: bool),
        control!("seamless", seamless: bool),
    ];
}

impl GeneratorKernel for Voronoi {
    fn encode(&self, settings: &GeneratorSettings) -> ParamBlock {
        ParamBlock::uniform(&CoherentUniforms {
            position: [self.x, self.y],
            z: self.z,
            w: 0.0,
            rotation: rotation(settings),
            offset_strength: settings.offset_strength,
            octaves: self.octaves,
            persistence: self.persistence,
            frequency: self.frequency,
            lacunarity: self.lacunarity,
            use_4d: 0,
            sphere_map: self.sphere_map as u32,
            seamless: self.seamless as u32,
        })
    }
}

/// Parallel sine bands along x. Rotate the generator to change their direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Wave {
    pub frequency: f32,
}

impl Default for Wave {
    fn default() -> Self {
        Self { frequency: 1.0 }
    }
}

impl Kernel for Wave {
    const NAME: &'static str = "waveGenerator";
    const CONTROLS: &'static [Control<Self>] = &[control!("frequency", frequency: f32)];
}

impl GeneratorKernel for Wave {
    fn encode(&self, settings: &GeneratorSettings) -> ParamBlock {
        ParamBlock::uniform(&WaveUniforms {
            rotation: rotation(settings),
            frequency: self.frequency,
            offset_strength: settings.offset_strength,
            _padding: [0.0; 2],
        })
    }
}

/// Concentric rings around a centre point.
#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Phase shift of the rings, in whole periods.
    pub offset: f32,
    pub frequency: f32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            offset: 0.0,
            frequency: 1.0,
        }
    }
}

impl Kernel for Sphere {
    const NAME: &'static str = "sphereGenerator";
    const CONTROLS: &'static [Control<Self>] = &[
        control!("x", x: f32),
        control!("y", y: f32),
        control!("z", z: f32),
        control!("offset", offset: f32),
        control!("frequency", frequency: f32),
    ];
}

impl GeneratorKernel for Sphere {
    fn encode(&self, settings: &GeneratorSettings) -> ParamBlock {
        ParamBlock::uniform(&SphereUniforms {
            rotation: rotation(settings),
            position: [self.x, self.y],
            z: self.z,
            offset: self.offset,
            frequency: self.frequency,
            offset_strength: settings.offset_strength,
            _padding: [0.0; 2],
        })
    }
}

pub type ConstantGenerator<B = WgpuBackend> = Generator<Constant, B>;
pub type SimplexGenerator<B = WgpuBackend> = Generator<Simplex, B>;
pub type VoronoiGenerator<B = WgpuBackend> = Generator<Voronoi, B>;
pub type WaveGenerator<B = WgpuBackend> = Generator<Wave, B>;
pub type SphereGenerator<B = WgpuBackend> = Generator<Sphere, B>;
