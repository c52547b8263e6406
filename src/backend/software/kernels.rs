//! CPU bodies of the kernel catalogue, one function per kernel.

use std::f32::consts::{PI, TAU};
use std::mem::size_of;

use bytemuck::Pod;
use glam::{UVec2, Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

use super::noise::{simplex3, simplex4, voronoi3};
use crate::backend::TextureSize;
use crate::kernels::uniforms::*;

/// Read-only view of a texture's pixels.
pub struct Pixels<'a> {
    pub size: TextureSize,
    pub data: &'a [[u8; 4]],
}

impl Pixels<'_> {
    pub fn load(&self, x: i32, y: i32) -> Vec4 {
        let x = x.clamp(0, self.size.width as i32 - 1) as usize;
        let y = y.clamp(0, self.size.height as i32 - 1) as usize;
        let [r, g, b, a] = self.data[y * self.size.width as usize + x];
        Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
    }

    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let p = uv * self.size.as_uvec2().as_vec2() - 0.5;
        let base = p.floor();
        let f = p - base;
        let (x, y) = (base.x as i32, base.y as i32);
        let top = self.load(x, y).lerp(self.load(x + 1, y), f.x);
        let bottom = self.load(x, y + 1).lerp(self.load(x + 1, y + 1), f.x);
        top.lerp(bottom, f.y)
    }
}

/// Everything a kernel body sees for one dispatch.
pub struct KernelArgs<'a> {
    pub inputs: Vec<Pixels<'a>>,
    pub size: TextureSize,
    pub params: Vec<&'a [u8]>,
}

impl KernelArgs<'_> {
    fn uniform<T: Pod>(&self, index: usize) -> T {
        bytemuck::pod_read_unaligned(&self.params[index][..size_of::<T>()])
    }

    fn array<T: Pod>(&self, index: usize) -> Vec<T> {
        self.params[index]
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    fn per_pixel(&self, f: impl Fn(UVec2, Vec2) -> Vec4) -> Vec<Vec4> {
        let dims = self.size.as_uvec2().as_vec2();
        let mut out = Vec::with_capacity(self.size.pixel_count());
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                let id = UVec2::new(x, y);
                let uv = (id.as_vec2() + 0.5) / dims;
                out.push(f(id, uv));
            }
        }
        out
    }

    fn map_input(&self, f: impl Fn(Vec3) -> Vec3) -> Vec<Vec4> {
        let input = &self.inputs[0];
        self.per_pixel(|id, _| f(input.load(id.x as i32, id.y as i32).xyz()).extend(1.0))
    }

    fn combine(&self, f: impl Fn(Vec3, Vec3) -> Vec3) -> Vec<Vec4> {
        let (a, b) = (&self.inputs[0], &self.inputs[1]);
        self.per_pixel(|id, _| {
            let (x, y) = (id.x as i32, id.y as i32);
            f(a.load(x, y).xyz(), b.load(x, y).xyz()).extend(1.0)
        })
    }

    fn choose(&self, f: impl Fn(Vec3, Vec3, f32) -> Vec3) -> Vec<Vec4> {
        let (a, b, s) = (&self.inputs[0], &self.inputs[1], &self.inputs[2]);
        self.per_pixel(|id, _| {
            let (x, y) = (id.x as i32, id.y as i32);
            f(a.load(x, y).xyz(), b.load(x, y).xyz(), luminance(s.load(x, y))).extend(1.0)
        })
    }
}

pub type KernelFn = fn(&KernelArgs) -> Vec<Vec4>;

/// CPU body registered for a catalogue name.
pub fn body(name: &str) -> Option<KernelFn> {
    let f: KernelFn = match name {
        "uniformGenerator" => uniform_generator,
        "simplexGenerator" => simplex_generator,
        "voronoiGenerator" => voronoi_generator,
        "waveGenerator" => wave_generator,
        "sphereGenerator" => sphere_generator,
        "absoluteModifier" => absolute_modifier,
        "clampModifier" => clamp_modifier,
        "invertModifier" => invert_modifier,
        "loopModifier" => loop_modifier,
        "roundModifier" => round_modifier,
        "scaleBiasModifier" => scale_bias_modifier,
        "stepModifier" => step_modifier,
        "rotateModifier" => rotate_modifier,
        "swirlModifier" => swirl_modifier,
        "stretchModifier" => stretch_modifier,
        "perspectiveModifier" => perspective_modifier,
        "normalMapModifier" => normal_map_modifier,
        "colourModifier" => colour_modifier,
        "scaleCanvasModifier" => scale_canvas_modifier,
        "gaussianBlur" => gaussian_blur,
        "addCombiner" => add_combiner,
        "subtractCombiner" => subtract_combiner,
        "multiplyCombiner" => multiply_combiner,
        "divideCombiner" => divide_combiner,
        "minCombiner" => min_combiner,
        "powerCombiner" => power_combiner,
        "blendSelector" => blend_selector,
        "selectSelector" => select_selector,
        _ => return None,
    };
    Some(f)
}

fn to_noise(v: Vec3) -> Vec3 {
    v * 2.0 - 1.0
}

fn to_stored(n: Vec3) -> Vec3 {
    (n + 1.0) * 0.5
}

fn luminance(c: Vec4) -> f32 {
    (c.x + c.y + c.z) / 3.0
}

fn in_unit_square(uv: Vec2) -> bool {
    uv.cmpge(Vec2::ZERO).all() && uv.cmple(Vec2::ONE).all()
}

fn rotate2(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

fn rotate3(p: Vec3, angles: Vec3) -> Vec3 {
    let yz = rotate2(Vec2::new(p.y, p.z), angles.x);
    let q = Vec3::new(p.x, yz.x, yz.y);
    let zx = rotate2(Vec2::new(q.z, q.x), angles.y);
    let q = Vec3::new(zx.y, q.y, zx.x);
    let xy = rotate2(Vec2::new(q.x, q.y), angles.z);
    Vec3::new(xy.x, xy.y, q.z)
}

fn grey(v: f32) -> Vec4 {
    Vec3::splat(v).extend(1.0)
}

fn generator_point(args: &KernelArgs, id: UVec2, uv: Vec2, strength: f32, rotation: [f32; 4]) -> Vec3 {
    let (x, y) = (id.x as i32, id.y as i32);
    let dx = args.inputs[0].load(x, y).x * 2.0 - 1.0;
    let dy = args.inputs[1].load(x, y).x * 2.0 - 1.0;
    let p = (uv + Vec2::new(dx, dy) * strength - 0.5).extend(0.0);
    rotate3(p, Vec4::from(rotation).xyz()) + Vec3::new(0.5, 0.5, 0.0)
}

fn sphere_point(p: Vec3) -> Vec3 {
    let (lon, lat) = (p.x * TAU, p.y * PI);
    Vec3::new(lat.sin() * lon.cos(), lat.sin() * lon.sin(), lat.cos())
}

fn uniform_generator(args: &KernelArgs) -> Vec<Vec4> {
    let u: ConstantUniforms = args.uniform(0);
    let colour = Vec4::from(u.colour).xyz().extend(1.0);
    args.per_pixel(|_, _| colour)
}

fn simplex_generator(args: &KernelArgs) -> Vec<Vec4> {
    let u: CoherentUniforms = args.uniform(0);
    let position = Vec2::from(u.position);
    let four = u.use_4d != 0 || u.seamless != 0;
    let octaves = u.octaves.clamp(1, 16);
    args.per_pixel(|id, uv| {
        let p = generator_point(args, id, uv, u.offset_strength, u.rotation);
        let base = if u.seamless != 0 {
            let (a, b) = (p.x * TAU, p.y * TAU);
            Vec4::new(a.cos(), a.sin(), b.cos(), b.sin()) / TAU
                + Vec4::new(position.x, 0.0, position.y, 0.0)
        } else if u.sphere_map != 0 {
            (sphere_point(p) + position.extend(u.z)).extend(u.w)
        } else {
            (p.xy() + position).extend(p.z + u.z).extend(u.w)
        };

        let (mut total, mut norm, mut amplitude, mut frequency) = (0.0, 0.0, 1.0, u.frequency);
        for _ in 0..octaves {
            let q = base * frequency;
            total += amplitude * if four { simplex4(q) } else { simplex3(q.xyz()) };
            norm += amplitude;
            amplitude *= u.persistence;
            frequency *= u.lacunarity;
        }
        let n = (total / norm).clamp(-1.0, 1.0);
        to_stored(Vec3::splat(n)).extend(1.0)
    })
}

fn voronoi_generator(args: &KernelArgs) -> Vec<Vec4> {
    let u: CoherentUniforms = args.uniform(0);
    let position = Vec2::from(u.position);
    let octaves = u.octaves.clamp(1, 16);
    args.per_pixel(|id, uv| {
        let mut p = generator_point(args, id, uv, u.offset_strength, u.rotation);
        if u.sphere_map != 0 {
            p = sphere_point(p);
        }
        let (mut total, mut norm, mut amplitude, mut frequency) = (0.0, 0.0, 1.0, u.frequency);
        for _ in 0..octaves {
            let (f, period) = if u.seamless != 0 {
                let f = frequency.round().max(1.0);
                (f, f as i32)
            } else {
                (frequency, 0)
            };
            let mut q = p * f;
            if u.seamless == 0 {
                q += position.extend(0.0) * f;
            }
            q.z += u.z;
            total += amplitude * voronoi3(q, period);
            norm += amplitude;
            amplitude *= u.persistence;
            frequency *= u.lacunarity;
        }
        grey((total / norm).clamp(0.0, 1.0))
    })
}

fn wave_generator(args: &KernelArgs) -> Vec<Vec4> {
    let u: WaveUniforms = args.uniform(0);
    args.per_pixel(|id, uv| {
        let p = generator_point(args, id, uv, u.offset_strength, u.rotation);
        let n = (p.x * u.frequency * TAU).sin();
        to_stored(Vec3::splat(n)).extend(1.0)
    })
}

fn sphere_generator(args: &KernelArgs) -> Vec<Vec4> {
    let u: SphereUniforms = args.uniform(0);
    let centre = Vec2::from(u.position);
    args.per_pixel(|id, uv| {
        let p = generator_point(args, id, uv, u.offset_strength, u.rotation);
        let d = (p.xy() - centre).extend(p.z - u.z).length();
        let n = ((d * u.frequency + u.offset) * TAU).cos();
        to_stored(Vec3::splat(n)).extend(1.0)
    })
}

fn absolute_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: NormaliseUniforms = args.uniform(0);
    args.map_input(|c| {
        let a = to_noise(c).abs();
        if u.normalise != 0 { a } else { to_stored(a) }
    })
}

fn clamp_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: ClampUniforms = args.uniform(0);
    args.map_input(|c| {
        let n = to_noise(c).clamp(Vec3::splat(u.minimum), Vec3::splat(u.maximum));
        let out = if u.normalise != 0 && u.maximum > u.minimum {
            (n - u.minimum) / (u.maximum - u.minimum)
        } else {
            to_stored(n)
        };
        out.clamp(Vec3::ZERO, Vec3::ONE)
    })
}

fn invert_modifier(args: &KernelArgs) -> Vec<Vec4> {
    args.map_input(|c| to_stored(-to_noise(c)))
}

fn loop_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: LoopUniforms = args.uniform(0);
    args.map_input(|c| {
        if u.loop_value <= 0.0 {
            return c;
        }
        let period = 2.0 * u.loop_value;
        let shifted = to_noise(c) + 1.0;
        let wrapped = shifted - period * (shifted / period).floor() - 1.0;
        let mut out = to_stored(wrapped);
        if u.normalise != 0 {
            out /= u.loop_value;
        }
        out.clamp(Vec3::ZERO, Vec3::ONE)
    })
}

fn round_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: RoundUniforms = args.uniform(0);
    args.map_input(|c| {
        let mut n = to_noise(c);
        if u.round_value > 0.0 {
            n = (n / u.round_value).round() * u.round_value;
        }
        to_stored(n).clamp(Vec3::ZERO, Vec3::ONE)
    })
}

fn scale_bias_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: ScaleBiasUniforms = args.uniform(0);
    args.map_input(|c| (c * u.scale + u.bias).clamp(Vec3::ZERO, Vec3::ONE))
}

fn step_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: StepUniforms = args.uniform(0);
    let input = &args.inputs[0];
    args.per_pixel(|id, _| {
        let n = luminance(input.load(id.x as i32, id.y as i32)) * 2.0 - 1.0;
        let v = if n < u.boundary { u.low } else { u.high };
        grey(((v + 1.0) * 0.5).clamp(0.0, 1.0))
    })
}

fn warp(args: &KernelArgs, cut_edges: bool, source: impl Fn(Vec2, Vec2) -> Vec2) -> Vec<Vec4> {
    let input = &args.inputs[0];
    let dims = args.size.as_uvec2().as_vec2();
    args.per_pixel(|_, uv| {
        let src = source(uv, dims);
        if cut_edges && !in_unit_square(src) {
            return Vec4::W;
        }
        input.sample_bilinear(src).xyz().extend(1.0)
    })
}

fn rotate_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: WarpUniforms = args.uniform(0);
    let anchor = Vec2::from(u.anchor);
    warp(args, u.cut_edges != 0, |uv, dims| {
        anchor + rotate2((uv - anchor) * dims, -u.amount) / dims
    })
}

fn swirl_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: WarpUniforms = args.uniform(0);
    let anchor = Vec2::from(u.anchor);
    warp(args, u.cut_edges != 0, |uv, dims| {
        let d = (uv - anchor) * dims;
        let reach = 0.5 * dims.x.min(dims.y);
        let falloff = (1.0 - d.length() / reach).max(0.0);
        anchor + rotate2(d, -u.amount * TAU * falloff * falloff) / dims
    })
}

fn stretch_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: StretchUniforms = args.uniform(0);
    let anchor = Vec2::from(u.anchor);
    let factor = Vec2::from(u.factor).map(|f| if f == 0.0 { 1e-6 } else { f });
    warp(args, false, |uv, _| anchor + (uv - anchor) / factor)
}

fn perspective_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: PerspectiveUniforms = args.uniform(0);
    warp(args, true, |uv, _| {
        let row_width = 1.0 + (u.x_compression - 1.0) * uv.y;
        Vec2::new(
            0.5 + (uv.x - 0.5 - u.direction * uv.y) * row_width,
            uv.y + (uv.y * uv.y - uv.y) * u.y_scale,
        )
    })
}

fn normal_map_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: NormalMapUniforms = args.uniform(0);
    let input = &args.inputs[0];
    let sx = if u.invert_x != 0 { -1.0 } else { 1.0 };
    let sy = if u.invert_y != 0 { -1.0 } else { 1.0 };
    args.per_pixel(|id, _| {
        let (x, y) = (id.x as i32, id.y as i32);
        let dx = luminance(input.load(x + 1, y)) - luminance(input.load(x - 1, y));
        let dy = luminance(input.load(x, y + 1)) - luminance(input.load(x, y - 1));
        let n = Vec3::new(-dx * u.intensity * sx, -dy * u.intensity * sy, 1.0).normalize();
        (n * 0.5 + 0.5).extend(1.0)
    })
}

fn colour_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let colours: Vec<[f32; 4]> = args.array(0);
    let positions: Vec<f32> = args.array(1);
    let intensities: Vec<f32> = args.array(2);
    let count: ColourCount = args.uniform(3);
    let n = (count.count as usize)
        .min(colours.len())
        .min(positions.len())
        .min(intensities.len());
    if n == 0 {
        return args.map_input(|c| c);
    }
    let last = n - 1;
    let input = &args.inputs[0];
    args.per_pixel(|id, _| {
        let c = input.load(id.x as i32, id.y as i32);
        let g = luminance(c);
        let (mut colour, mut intensity) = (Vec4::from(colours[0]), intensities[0]);
        if g >= positions[last] {
            colour = Vec4::from(colours[last]);
            intensity = intensities[last];
        } else if g > positions[0] {
            for i in 0..last {
                let (lo, hi) = (positions[i], positions[i + 1]);
                if g >= lo && g < hi {
                    let t = (g - lo) / (hi - lo);
                    colour = Vec4::from(colours[i]).lerp(Vec4::from(colours[i + 1]), t);
                    intensity = intensities[i] + (intensities[i + 1] - intensities[i]) * t;
                    break;
                }
            }
        }
        c.xyz()
            .lerp(colour.xyz(), intensity.clamp(0.0, 1.0))
            .extend(1.0)
    })
}

fn scale_canvas_modifier(args: &KernelArgs) -> Vec<Vec4> {
    let u: ScaleCanvasUniforms = args.uniform(0);
    let input = &args.inputs[0];
    let out_size = args.size.as_uvec2().as_vec2();
    let in_size = UVec2::from(u.input_size).as_vec2();
    let scale = Vec2::from(u.scale).map(|s| if s == 0.0 { 1e-6 } else { s });
    let origin = Vec2::from(u.anchor) * (out_size - in_size * scale);
    args.per_pixel(|id, _| {
        let src = ((id.as_vec2() + 0.5 - origin) / scale).floor();
        if src.cmpge(Vec2::ZERO).all() && src.cmplt(in_size).all() {
            input.load(src.x as i32, src.y as i32).xyz().extend(1.0)
        } else {
            Vec4::W
        }
    })
}

fn gaussian_blur(args: &KernelArgs) -> Vec<Vec4> {
    let u: BlurPass = args.uniform(0);
    let input = &args.inputs[0];
    if u.radius <= 0 || u.sigma <= 0.0 {
        return args.per_pixel(|id, _| input.load(id.x as i32, id.y as i32));
    }
    let weights: Vec<f32> = (-u.radius..=u.radius)
        .map(|i| (-((i * i) as f32) / (2.0 * u.sigma * u.sigma)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    let [dx, dy] = u.direction;
    args.per_pixel(|id, _| {
        let (x, y) = (id.x as i32, id.y as i32);
        let sum = (-u.radius..=u.radius)
            .zip(&weights)
            .fold(Vec4::ZERO, |acc, (i, w)| acc + *w * input.load(x + dx * i, y + dy * i));
        (sum / total).xyz().extend(1.0)
    })
}

fn add_combiner(args: &KernelArgs) -> Vec<Vec4> {
    let u: NormaliseUniforms = args.uniform(0);
    args.combine(|a, b| {
        if u.normalise != 0 {
            (a + b) * 0.5
        } else {
            (a + b).min(Vec3::ONE)
        }
    })
}

fn subtract_combiner(args: &KernelArgs) -> Vec<Vec4> {
    args.combine(|a, b| to_stored((to_noise(a) - to_noise(b)).clamp(-Vec3::ONE, Vec3::ONE)))
}

fn multiply_combiner(args: &KernelArgs) -> Vec<Vec4> {
    args.combine(|a, b| a * b)
}

fn divide_combiner(args: &KernelArgs) -> Vec<Vec4> {
    args.combine(|a, b| {
        Vec3::select(b.cmpeq(Vec3::ZERO), Vec3::ONE, a / b).clamp(Vec3::ZERO, Vec3::ONE)
    })
}

fn min_combiner(args: &KernelArgs) -> Vec<Vec4> {
    args.combine(Vec3::min)
}

fn power_combiner(args: &KernelArgs) -> Vec<Vec4> {
    args.combine(|a, b| {
        Vec3::new(a.x.powf(b.x), a.y.powf(b.y), a.z.powf(b.z)).clamp(Vec3::ZERO, Vec3::ONE)
    })
}

fn blend_selector(args: &KernelArgs) -> Vec<Vec4> {
    args.choose(|a, b, s| a.lerp(b, s))
}

fn select_selector(args: &KernelArgs) -> Vec<Vec4> {
    let u: SelectUniforms = args.uniform(0);
    args.choose(|a, b, s| {
        let t = if u.transition > 0.0 {
            smoothstep(u.boundary - u.transition, u.boundary + u.transition, s)
        } else if s >= u.boundary {
            1.0
        } else {
            0.0
        };
        a.lerp(b, t)
    })
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: TextureSize, rgba: [u8; 4]) -> Vec<[u8; 4]> {
        vec![rgba; size.pixel_count()]
    }

    #[test]
    fn every_catalogue_kernel_has_a_body() {
        for k in crate::kernels::CATALOGUE {
            assert!(body(k.name).is_some(), "{} has no CPU body", k.name);
        }
    }

    #[test]
    fn rotation_is_orthonormal() {
        let p = Vec3::new(0.3, -0.2, 0.7);
        let r = rotate3(p, Vec3::new(0.4, 1.1, -2.0));
        assert!((r.length() - p.length()).abs() < 1e-5);
        assert_eq!(rotate3(p, Vec3::ZERO), p);
    }

    #[test]
    fn bilinear_matches_texel_centres() {
        let size = TextureSize::new(2, 1);
        let data = [[0, 0, 0, 255], [255, 255, 255, 255]];
        let pixels = Pixels { size, data: &data };
        assert_eq!(pixels.sample_bilinear(Vec2::new(0.25, 0.5)).x, 0.0);
        assert_eq!(pixels.sample_bilinear(Vec2::new(0.75, 0.5)).x, 1.0);
        assert!((pixels.sample_bilinear(Vec2::new(0.5, 0.5)).x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn blur_of_flat_field_is_flat() {
        let size = TextureSize::new(6, 6);
        let data = solid(size, [100, 100, 100, 255]);
        let pass = BlurPass::new([1, 0], 2.0);
        let args = KernelArgs {
            inputs: vec![Pixels { size, data: &data }],
            size,
            params: vec![bytemuck::bytes_of(&pass)],
        };
        for px in gaussian_blur(&args) {
            assert!((px.x - 100.0 / 255.0).abs() < 1e-5);
        }
    }

    #[test]
    fn scale_canvas_places_input_at_anchor() {
        let in_size = TextureSize::new(2, 2);
        let data = solid(in_size, [255, 255, 255, 255]);
        let u = ScaleCanvasUniforms {
            anchor: [1.0, 1.0],
            scale: [1.0, 1.0],
            input_size: [2, 2],
            _padding: [0; 2],
        };
        let size = TextureSize::new(4, 4);
        let args = KernelArgs {
            inputs: vec![Pixels { size: in_size, data: &data }],
            size,
            params: vec![bytemuck::bytes_of(&u)],
        };
        let out = scale_canvas_modifier(&args);
        assert_eq!(out[0], Vec4::W);
        assert_eq!(out[15], Vec4::ONE);
        assert_eq!(out[10], Vec4::ONE);
        assert_eq!(out[5], Vec4::W);
    }
}
