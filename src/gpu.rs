//! Headless GPU context and device management.
//!
//! This module provides [`GpuContext`], which owns the wgpu instance, adapter, device and
//! queue used by [`WgpuBackend`](crate::WgpuBackend). No surface is created: every node
//! renders into off-screen storage textures and results are read back or exported.
//!
//! # Example
//!
//! ```no_run
//! use noisegraph::{ContextConfig, GpuContext};
//!
//! let gpu = GpuContext::new(&ContextConfig::new().label("Preview Device"))?;
//! println!("running on {}", gpu.adapter.get_info().name);
//! # Ok::<(), noisegraph::NoiseError>(())
//! ```

use crate::error::NoiseError;

/// Options used when requesting an adapter and device.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    pub label: String,
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            label: "Noisegraph Device".to_string(),
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    pub fn power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    /// Prefer a software adapter (e.g. llvmpipe or WARP) when one is available.
    pub fn force_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }
}

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
/// The context is typically created once and shared by every node through a
/// cloned [`WgpuBackend`](crate::WgpuBackend).
pub struct GpuContext {
    /// The wgpu instance the adapter was requested from.
    pub instance: wgpu::Instance,
    /// The physical adapter backing the device.
    pub adapter: wgpu::Adapter,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a headless GPU context.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with the configured backends
    /// 2. Requests a suitable GPU adapter (no surface compatibility required)
    /// 3. Creates the logical device and command queue
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::NoAdapter`] or [`NoiseError::RequestDevice`] when the
    /// platform cannot provide a compute-capable device.
    pub fn new(config: &ContextConfig) -> Result<Self, NoiseError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: config.force_fallback_adapter,
        }))
        .map_err(|e| NoiseError::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(&config.label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| NoiseError::RequestDevice(e.to_string()))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Block until every submitted command buffer has finished executing.
    ///
    /// A failed wait, for example after the device was lost, is logged.
    pub fn wait_idle(&self) {
        if let Err(err) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::error!("waiting for the device failed: {err}");
        }
    }
}
