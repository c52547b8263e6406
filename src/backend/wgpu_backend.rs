//! [`ComputeBackend`] on top of wgpu compute pipelines.
//!
//! Each catalogue kernel becomes one compute pipeline with an explicit layout
//! derived from its [`KernelSignature`]. Pipelines are cached per backend, so
//! constructing many nodes of the same kind compiles the kernel once.
//!
//! Kernel bindings follow a fixed scheme:
//!
//! - group 0 holds the input textures and the write-only output storage texture,
//!   at the slots given by the kernel's [`Arity`](crate::kernels::Arity);
//! - group 1 holds the parameter buffers, in the order the node encodes them.
//!
//! Every dispatch is submitted on its own and waited for, so a texture returned
//! by a node is always complete.
//!
//! # Example
//!
//! ```no_run
//! use noisegraph::{ContextConfig, Generator, TextureProvider, WgpuBackend};
//! use noisegraph::nodes::Voronoi;
//!
//! let backend = WgpuBackend::from_config(&ContextConfig::new().force_fallback_adapter(true))?;
//! let cells = Generator::new(&backend, Voronoi::default())?.with_size(512, 512);
//! let texture = cells.texture().expect("generators always produce");
//! assert_eq!(texture.size().width, 512);
//! # Ok::<(), noisegraph::NoiseError>(())
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc;

use super::{ComputeBackend, TextureSize, WorkSize};
use crate::error::NoiseError;
use crate::gpu::{ContextConfig, GpuContext};
use crate::kernels::{self, KernelSignature, ParamBinding};

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A storage-capable RGBA8 texture plus its default view.
#[derive(Clone, Debug)]
///
/// Textures are created with storage, sampling and copy usages, so a node's
/// output can be bound as another node's input or copied out directly.
pub struct WgpuTexture {
    /// The underlying `Rgba8Unorm` texture.
    pub texture: wgpu::Texture,
    /// Full view used for both input and output bindings.
    pub view: wgpu::TextureView,
    size: TextureSize,
}

impl WgpuTexture {
    /// Dimensions the texture was allocated with.
    pub fn size(&self) -> TextureSize {
        self.size
    }
}

/// A compiled kernel: its pipeline and the layouts needed to bind it.
pub struct WgpuKernel {
    /// Catalogue entry the pipeline was built from.
    pub signature: &'static KernelSignature,
    pipeline: wgpu::ComputePipeline,
    texture_layout: wgpu::BindGroupLayout,
    param_layout: Option<wgpu::BindGroupLayout>,
}

/// Runs kernels on a [`GpuContext`]. Clones share the context and pipeline cache.
#[derive(Clone)]
pub struct WgpuBackend {
    gpu: Rc<GpuContext>,
    pipelines: Rc<RefCell<HashMap<&'static str, Rc<WgpuKernel>>>>,
}

impl WgpuBackend {
    /// Wrap an existing context, e.g. one shared with a renderer.
    pub fn new(gpu: GpuContext) -> Self {
        Self {
            gpu: Rc::new(gpu),
            pipelines: Rc::default(),
        }
    }

    /// Create a context from `config` and wrap it.
    ///
    /// # Errors
    ///
    /// Fails as [`GpuContext::new`] does when no suitable adapter or device exists.
    pub fn from_config(config: &ContextConfig) -> Result<Self, NoiseError> {
        GpuContext::new(config).map(Self::new)
    }

    /// The context every node built on this backend shares.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Group 0: one sampled texture per input slot plus the storage output.
    fn texture_layout(&self, signature: &KernelSignature) -> wgpu::BindGroupLayout {
        let arity = signature.arity;
        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = arity
            .input_slots()
            .iter()
            .map(|&binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: arity.output_slot(),
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: TEXTURE_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        });
        entries.sort_by_key(|e| e.binding);

        self.gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(signature.name),
                entries: &entries,
            })
    }

    /// Group 1, or `None` for kernels without parameters.
    fn param_layout(&self, signature: &KernelSignature) -> Option<wgpu::BindGroupLayout> {
        if signature.params.is_empty() {
            return None;
        }
        let entries: Vec<wgpu::BindGroupLayoutEntry> = signature
            .params
            .iter()
            .enumerate()
            .map(|(binding, kind)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: match kind {
                        ParamBinding::Uniform => wgpu::BufferBindingType::Uniform,
                        ParamBinding::Storage => {
                            wgpu::BufferBindingType::Storage { read_only: true }
                        }
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        Some(
            self.gpu
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(signature.name),
                    entries: &entries,
                }),
        )
    }

    fn build_kernel(&self, signature: &'static KernelSignature) -> WgpuKernel {
        let device = &self.gpu.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(signature.name),
            source: wgpu::ShaderSource::Wgsl(signature.wgsl().into()),
        });

        let texture_layout = self.texture_layout(signature);
        let param_layout = self.param_layout(signature);
        let mut layouts = vec![&texture_layout];
        layouts.extend(param_layout.as_ref());

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(signature.name),
            bind_group_layouts: &layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(signature.name),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        WgpuKernel {
            signature,
            pipeline,
            texture_layout,
            param_layout,
        }
    }

    fn texture_bind_group(
        &self,
        kernel: &WgpuKernel,
        inputs: &[&WgpuTexture],
        output: &WgpuTexture,
    ) -> wgpu::BindGroup {
        let arity = kernel.signature.arity;
        let mut entries: Vec<wgpu::BindGroupEntry> = arity
            .input_slots()
            .iter()
            .zip(inputs)
            .map(|(&binding, texture)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: arity.output_slot(),
            resource: wgpu::BindingResource::TextureView(&output.view),
        });

        self.gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.signature.name),
                layout: &kernel.texture_layout,
                entries: &entries,
            })
    }

    fn param_bind_group(&self, kernel: &WgpuKernel, params: &[&wgpu::Buffer]) -> Option<wgpu::BindGroup> {
        let layout = kernel.param_layout.as_ref()?;
        let entries: Vec<wgpu::BindGroupEntry> = params
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        Some(self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.signature.name),
            layout,
            entries: &entries,
        }))
    }

    /// Record one dispatch of `kernel` into `encoder`.
    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: &WgpuKernel,
        inputs: &[&WgpuTexture],
        output: &WgpuTexture,
        params: &[&wgpu::Buffer],
        work: WorkSize,
    ) {
        let textures = self.texture_bind_group(kernel, inputs, output);
        let params = self.param_bind_group(kernel, params);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.signature.name),
            timestamp_writes: None,
        });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &textures, &[]);
        if let Some(params) = &params {
            pass.set_bind_group(1, params, &[]);
        }
        pass.dispatch_workgroups(work.x, work.y, 1);
    }

    /// Submit and block until the device has finished the work.
    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.gpu.wait_idle();
    }

    fn param_buffer(&self, bytes: &[u8], label: &str) -> wgpu::Buffer {
        log::trace!("allocating {} byte buffer `{label}`", bytes.len());
        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes.len() as u64,
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.gpu.queue.write_buffer(&buffer, 0, bytes);
        buffer
    }
}

impl ComputeBackend for WgpuBackend {
    type Texture = WgpuTexture;
    type Buffer = wgpu::Buffer;
    type Kernel = Rc<WgpuKernel>;

    fn compile(&self, name: &str) -> Result<Self::Kernel, NoiseError> {
        let signature = kernels::lookup(name)?;
        if let Some(kernel) = self.pipelines.borrow().get(signature.name) {
            return Ok(kernel.clone());
        }

        // Invalid WGSL reaches the device's uncaptured error handler, which panics.
        let built = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.build_kernel(signature)
        }));
        let kernel = match built {
            Ok(kernel) => Rc::new(kernel),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "pipeline creation panicked".to_string());
                return Err(NoiseError::KernelCompile {
                    name: signature.name.to_string(),
                    reason,
                });
            }
        };

        log::debug!("compiled kernel {}", signature.name);
        self.pipelines
            .borrow_mut()
            .insert(signature.name, kernel.clone());
        Ok(kernel)
    }

    fn allocate_texture(&self, size: TextureSize, label: &str) -> Self::Texture {
        log::trace!("allocating {size} texture `{label}`");
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        WgpuTexture {
            texture,
            view,
            size,
        }
    }

    fn upload_texture(&self, size: TextureSize, rgba: &[u8], label: &str) -> Self::Texture {
        let target = self.allocate_texture(size, label);
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        target
    }

    fn texture_size(&self, texture: &Self::Texture) -> TextureSize {
        texture.size
    }

    fn write_buffer(&self, slot: &mut Option<Self::Buffer>, bytes: &[u8], label: &str) {
        match slot {
            Some(buffer) if buffer.size() == bytes.len() as u64 => {
                self.gpu.queue.write_buffer(buffer, 0, bytes);
            }
            _ => *slot = Some(self.param_buffer(bytes, label)),
        }
    }

    fn dispatch(
        &self,
        kernel: &Self::Kernel,
        inputs: &[&Self::Texture],
        output: &Self::Texture,
        params: &[&Self::Buffer],
        work: WorkSize,
    ) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.signature.name),
            });
        self.encode_pass(&mut encoder, kernel, inputs, output, params, work);
        self.submit(encoder);
    }

    fn gaussian_blur(
        &self,
        kernel: &Self::Kernel,
        input: &Self::Texture,
        scratch: &Self::Texture,
        output: &Self::Texture,
        [horizontal, vertical]: [&Self::Buffer; 2],
    ) {
        let work = WorkSize::covering(output.size);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gaussian blur"),
            });
        self.encode_pass(&mut encoder, kernel, &[input], scratch, &[horizontal], work);
        self.encode_pass(&mut encoder, kernel, &[scratch], output, &[vertical], work);
        self.submit(encoder);
    }

    fn read_texture(&self, texture: &Self::Texture) -> Result<Vec<u8>, NoiseError> {
        let TextureSize { width, height } = texture.size;
        let row_bytes = 4 * width;
        let padded_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback staging"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.gpu
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| NoiseError::Readback(e.to_string()))?;
        let mapped = rx
            .recv()
            .map_err(|_| NoiseError::Readback("map callback dropped".to_string()))?;
        mapped.map_err(|e| NoiseError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * height) as usize);
        for row in data.chunks(padded_row as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(data);
        staging.unmap();
        Ok(pixels)
    }
}
