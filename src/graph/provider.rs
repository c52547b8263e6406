use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use glam::{UVec2, Vec4};
use image::RgbaImage;

use crate::backend::{ComputeBackend, TextureSize, WgpuBackend};
use crate::error::NoiseError;

/// A shared handle to any node in a graph.
pub type NodeRef<B = WgpuBackend> = Rc<dyn TextureProvider<B>>;

/// Anything that can produce a texture on demand.
///
/// Evaluation is lazy and pull based. Changing a parameter or an input only marks
/// a node stale; work happens when [`texture`](Self::texture) is called, and then
/// only for the stale part of the upstream graph.
pub trait TextureProvider<B: ComputeBackend = WgpuBackend> {
    /// The node's output, recomputed first if anything upstream changed.
    ///
    /// Returns `None` while required inputs are missing, or when connected inputs
    /// no longer agree on their size.
    fn texture(&self) -> Option<B::Texture>;

    /// Whether the node, or anything it reads from, changed since it last
    /// produced a texture.
    fn is_dirty(&self) -> bool;

    /// Whether every input the node's kind requires is connected.
    fn can_produce(&self) -> bool;

    /// Size the output has, or will have once produced.
    fn texture_size(&self) -> TextureSize;

    /// Connected inputs, in slot order.
    fn upstream(&self) -> Vec<NodeRef<B>>;

    /// Catalogue name of the kernel this node runs.
    fn kernel_name(&self) -> &'static str;

    fn backend(&self) -> &B;

    /// The output as tightly packed RGBA8 rows.
    fn read_pixels(&self) -> Result<Option<(TextureSize, Vec<u8>)>, NoiseError> {
        let Some(texture) = self.texture() else {
            return Ok(None);
        };
        let size = self.backend().texture_size(&texture);
        let pixels = self.backend().read_texture(&texture)?;
        Ok(Some((size, pixels)))
    }

    /// Red channel at each position, normalised to `[0, 1]`.
    fn greyscale_values(&self, positions: &[UVec2]) -> Vec<f32> {
        self.colour_values(positions)
            .into_iter()
            .map(|c| c.x)
            .collect()
    }

    /// RGBA at each position, normalised to `[0, 1]`.
    ///
    /// The result always has one entry per position. Positions outside the texture
    /// are reported with a warning and left at zero, as is everything when the node
    /// cannot produce a texture.
    fn colour_values(&self, positions: &[UVec2]) -> Vec<Vec4> {
        let mut values = vec![Vec4::ZERO; positions.len()];
        let (size, pixels) = match self.read_pixels() {
            Ok(Some(read)) => read,
            Ok(None) => {
                log::warn!("`{}` cannot produce a texture to read", self.kernel_name());
                return values;
            }
            Err(err) => {
                log::warn!("reading `{}` failed: {err}", self.kernel_name());
                return values;
            }
        };
        for (value, &position) in values.iter_mut().zip(positions) {
            if !size.contains(position) {
                log::warn!("position {position} lies outside the {size} texture");
                continue;
            }
            let i = (position.y as usize * size.width as usize + position.x as usize) * 4;
            let texel = &pixels[i..i + 4];
            *value = Vec4::new(
                texel[0] as f32,
                texel[1] as f32,
                texel[2] as f32,
                texel[3] as f32,
            ) / 255.0;
        }
        values
    }

    /// Every pixel position of the output, row by row.
    fn all_positions(&self) -> Vec<UVec2> {
        let size = self.texture_size();
        (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| UVec2::new(x, y)))
            .collect()
    }

    fn to_image(&self) -> Result<Option<RgbaImage>, NoiseError> {
        let Some((size, pixels)) = self.read_pixels()? else {
            return Ok(None);
        };
        let image = RgbaImage::from_raw(size.width, size.height, pixels)
            .ok_or_else(|| NoiseError::Readback(format!("short readback for {size} texture")))?;
        Ok(Some(image))
    }

    /// Write the output to `path` as a PNG.
    fn save_png(&self, path: &Path) -> Result<(), NoiseError> {
        let rgba = self.to_image()?.ok_or_else(|| {
            NoiseError::Readback(format!("`{}` has unconnected inputs", self.kernel_name()))
        })?;
        rgba.save_with_format(path, image::ImageFormat::Png)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

fn address<T: ?Sized>(ptr: *const T) -> *const () {
    ptr as *const ()
}

/// Whether `node` can be reached by walking upstream from `from`.
pub(crate) fn reaches<B: ComputeBackend>(from: &NodeRef<B>, node: *const ()) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from.clone()];
    while let Some(next) = stack.pop() {
        let here = address(Rc::as_ptr(&next));
        if here == node {
            return true;
        }
        if seen.insert(here) {
            stack.extend(next.upstream());
        }
    }
    false
}

/// Reject connecting `input` to the node at `node` if that would close a loop.
pub(crate) fn check_acyclic<B: ComputeBackend, N>(
    node: &N,
    input: &NodeRef<B>,
) -> Result<(), NoiseError> {
    if reaches(input, address(node as *const N)) {
        return Err(NoiseError::Cycle);
    }
    Ok(())
}

/// Reject `input` if its size differs from an already connected sibling.
pub(crate) fn check_size<B: ComputeBackend>(
    input: &NodeRef<B>,
    siblings: &[Option<NodeRef<B>>],
) -> Result<(), NoiseError> {
    let found = input.texture_size();
    match siblings.iter().flatten().map(|s| s.texture_size()).find(|&s| s != found) {
        Some(expected) => Err(NoiseError::SizeMismatch { expected, found }),
        None => Ok(()),
    }
}

/// Size shared by all `inputs`, or `None` if they disagree.
pub(crate) fn agreed_size<B: ComputeBackend>(inputs: &[&NodeRef<B>]) -> Option<TextureSize> {
    let mut sizes = inputs.iter().map(|i| i.texture_size());
    let first = sizes.next()?;
    sizes.all(|s| s == first).then_some(first)
}
