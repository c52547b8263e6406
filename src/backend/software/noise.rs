//! Hash, simplex and cellular noise shared by the CPU kernels.
//!
//! Every function here has a WGSL twin in `shaders/common.wgsl`; keep the two in
//! step so both backends produce the same textures.

use glam::{Vec3, Vec4};

pub fn pcg(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

pub fn hash3(x: i32, y: i32, z: i32) -> u32 {
    pcg((x as u32).wrapping_add(pcg((y as u32).wrapping_add(pcg(z as u32)))))
}

pub fn hash4(x: i32, y: i32, z: i32, w: i32) -> u32 {
    pcg((x as u32).wrapping_add(hash3(y, z, w)))
}

/// Maps a hash to `[0, 1)` using its low 24 bits.
pub fn unit(h: u32) -> f32 {
    (h & 0x00ff_ffff) as f32 / 16_777_216.0
}

fn grad3(h: u32, d: Vec3) -> f32 {
    match h % 12 {
        0 => d.x + d.y,
        1 => -d.x + d.y,
        2 => d.x - d.y,
        3 => -d.x - d.y,
        4 => d.x + d.z,
        5 => -d.x + d.z,
        6 => d.x - d.z,
        7 => -d.x - d.z,
        8 => d.y + d.z,
        9 => -d.y + d.z,
        10 => d.y - d.z,
        _ => -d.y - d.z,
    }
}

fn grad4(h: u32, d: Vec4) -> f32 {
    let h = h & 31;
    let a = if h & 1 == 0 { 1.0 } else { -1.0 };
    let b = if h & 2 == 0 { 1.0 } else { -1.0 };
    let c = if h & 4 == 0 { 1.0 } else { -1.0 };
    match h >> 3 {
        0 => a * d.y + b * d.z + c * d.w,
        1 => a * d.x + b * d.z + c * d.w,
        2 => a * d.x + b * d.y + c * d.w,
        _ => a * d.x + b * d.y + c * d.z,
    }
}

/// 3D simplex noise in roughly `[-1, 1]`.
pub fn simplex3(p: Vec3) -> f32 {
    const F3: f32 = 1.0 / 3.0;
    const G3: f32 = 1.0 / 6.0;

    let s = (p.x + p.y + p.z) * F3;
    let cell = (p + Vec3::splat(s)).floor();
    let t = (cell.x + cell.y + cell.z) * G3;
    let d0 = p - (cell - Vec3::splat(t));

    let (o1, o2) = if d0.x >= d0.y {
        if d0.y >= d0.z {
            (Vec3::X, Vec3::new(1.0, 1.0, 0.0))
        } else if d0.x >= d0.z {
            (Vec3::X, Vec3::new(1.0, 0.0, 1.0))
        } else {
            (Vec3::Z, Vec3::new(1.0, 0.0, 1.0))
        }
    } else if d0.y < d0.z {
        (Vec3::Z, Vec3::new(0.0, 1.0, 1.0))
    } else if d0.x < d0.z {
        (Vec3::Y, Vec3::new(0.0, 1.0, 1.0))
    } else {
        (Vec3::Y, Vec3::new(1.0, 1.0, 0.0))
    };

    let corners = [
        (Vec3::ZERO, d0),
        (o1, d0 - o1 + Vec3::splat(G3)),
        (o2, d0 - o2 + Vec3::splat(2.0 * G3)),
        (Vec3::ONE, d0 - Vec3::ONE + Vec3::splat(3.0 * G3)),
    ];

    let mut total = 0.0;
    for (offset, d) in corners {
        let falloff = 0.6 - d.length_squared();
        if falloff > 0.0 {
            let c = cell + offset;
            let h = hash3(c.x as i32, c.y as i32, c.z as i32);
            total += falloff.powi(4) * grad3(h, d);
        }
    }
    32.0 * total
}

/// 4D simplex noise in roughly `[-1, 1]`.
pub fn simplex4(p: Vec4) -> f32 {
    let f4 = (5.0_f32.sqrt() - 1.0) / 4.0;
    let g4 = (5.0 - 5.0_f32.sqrt()) / 20.0;

    let s = (p.x + p.y + p.z + p.w) * f4;
    let cell = (p + Vec4::splat(s)).floor();
    let t = (cell.x + cell.y + cell.z + cell.w) * g4;
    let d0 = p - (cell - Vec4::splat(t));

    let mut rank = [0u32; 4];
    let c = d0.to_array();
    for i in 0..4 {
        for j in (i + 1)..4 {
            if c[i] > c[j] {
                rank[i] += 1;
            } else {
                rank[j] += 1;
            }
        }
    }
    let step = |threshold: u32| {
        Vec4::new(
            (rank[0] >= threshold) as u32 as f32,
            (rank[1] >= threshold) as u32 as f32,
            (rank[2] >= threshold) as u32 as f32,
            (rank[3] >= threshold) as u32 as f32,
        )
    };
    let o1 = step(3);
    let o2 = step(2);
    let o3 = step(1);

    let corners = [
        (Vec4::ZERO, d0),
        (o1, d0 - o1 + Vec4::splat(g4)),
        (o2, d0 - o2 + Vec4::splat(2.0 * g4)),
        (o3, d0 - o3 + Vec4::splat(3.0 * g4)),
        (Vec4::ONE, d0 - Vec4::ONE + Vec4::splat(4.0 * g4)),
    ];

    let mut total = 0.0;
    for (offset, d) in corners {
        let falloff = 0.6 - d.length_squared();
        if falloff > 0.0 {
            let c = cell + offset;
            let h = hash4(c.x as i32, c.y as i32, c.z as i32, c.w as i32);
            total += falloff.powi(4) * grad4(h, d);
        }
    }
    27.0 * total
}

/// Distance to the nearest feature point (F1) of a 3D cellular pattern.
///
/// With a `period` greater than zero the cell lattice wraps in x and y so the
/// pattern tiles every `period` units.
pub fn voronoi3(p: Vec3, period: i32) -> f32 {
    let cell = p.floor();
    let mut nearest = f32::MAX;
    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let c = cell + Vec3::new(dx as f32, dy as f32, dz as f32);
                let (mut hx, mut hy) = (c.x as i32, c.y as i32);
                if period > 0 {
                    hx = hx.rem_euclid(period);
                    hy = hy.rem_euclid(period);
                }
                let h = hash3(hx, hy, c.z as i32);
                let jitter = Vec3::new(unit(h), unit(pcg(h)), unit(pcg(pcg(h))));
                nearest = nearest.min((c + jitter - p).length());
            }
        }
    }
    nearest
}
