//! The node catalogue.
//!
//! One parameter record per kernel. Each record plugs into the graph node of
//! its shape, e.g. `Generator<Simplex>` or `Modifier<Invert>`; the aliases below
//! spell those out.

mod combiners;
mod generators;
mod modifiers;
mod selectors;

pub use self::combiners::*;
pub use self::generators::*;
pub use self::modifiers::*;
pub use self::selectors::*;

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::{UVec2, Vec4};

    use super::*;
    use crate::backend::{SoftwareBackend, TextureSize};
    use crate::error::NoiseError;
    use crate::graph::{
        Combiner, CombinerKernel, Generator, GeneratorKernel, GeneratorSettings, Modifier,
        ModifierKernel, NodeRef, Selector, SelectorKernel, TextureProvider,
    };
    use crate::kernels;
    use crate::params::{Control, Kernel, ParamBlock};

    type Soft = SoftwareBackend;

    #[test]
    fn texture_is_cached_until_something_changes() {
        let backend = Soft::new();
        let noise = Generator::new(&backend, Simplex::default())
            .unwrap()
            .with_size(16, 16);
        assert!(noise.is_dirty());
        assert!(noise.texture().is_some());
        assert!(!noise.is_dirty());
        let dispatches = backend.dispatch_count();

        noise.texture();
        noise.texture();
        assert_eq!(backend.dispatch_count(), dispatches);

        noise.set("octaves", 2).unwrap();
        assert!(noise.is_dirty());
        noise.texture();
        assert_eq!(backend.dispatch_count(), dispatches + 1);
        assert_eq!(noise.recompute_count(), 2);
    }

    #[test]
    fn changes_propagate_downstream() {
        let backend = Soft::new();
        let noise = Rc::new(Generator::new(&backend, Simplex::default()).unwrap().with_size(16, 16));
        let inverted = Rc::new(Modifier::with_input(&backend, Invert, noise.clone()).unwrap());
        let scaled = Modifier::with_input(&backend, ScaleBias::default(), inverted.clone()).unwrap();

        let before = scaled.greyscale_values(&scaled.all_positions());
        assert!(!scaled.is_dirty());

        noise.set("z", 7.5).unwrap();
        assert!(inverted.is_dirty());
        assert!(scaled.is_dirty());

        let after = scaled.greyscale_values(&scaled.all_positions());
        assert_ne!(before, after);
        assert_eq!(noise.recompute_count(), 2);
        assert_eq!(inverted.recompute_count(), 2);
        assert_eq!(scaled.recompute_count(), 2);
    }

    #[test]
    fn shared_upstream_runs_once() {
        let backend = Soft::new();
        let shared: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(8, 8));
        let left: NodeRef<Soft> = Rc::new(Modifier::with_input(&backend, Invert, shared.clone()).unwrap());
        let right: NodeRef<Soft> =
            Rc::new(Modifier::with_input(&backend, Absolute::default(), shared.clone()).unwrap());
        let sum = Combiner::with_inputs(&backend, Add::default(), left, right).unwrap();

        assert!(sum.texture().is_some());
        assert_eq!(backend.dispatch_count(), 4);
    }

    #[test]
    fn sizes_are_derived_from_inputs() {
        let backend = Soft::new();
        let wide: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Wave::default()).unwrap().with_size(40, 10));
        let node = Modifier::new(&backend, Invert).unwrap();
        assert_eq!(node.texture_size(), TextureSize::DEFAULT);
        node.set_input(wide).unwrap();
        assert_eq!(node.texture_size(), TextureSize::new(40, 10));
        assert_eq!(node.all_positions().len(), 400);
    }

    #[test]
    fn resizing_a_generator_replaces_downstream_textures() {
        let backend = Soft::new();
        let noise = Rc::new(Generator::new(&backend, Wave::default()).unwrap().with_size(8, 8));
        let node = Modifier::with_input(&backend, Invert, noise.clone()).unwrap();
        let first = node.texture().unwrap();
        let allocations = backend.texture_allocations();

        noise.set("frequency", 3.0).unwrap();
        let second = node.texture().unwrap();
        assert!(first.same_storage(&second));
        assert_eq!(backend.texture_allocations(), allocations);

        noise.set_size(12, 6);
        let texture = node.texture().unwrap();
        assert!(!texture.same_storage(&first));
        assert_eq!(texture.size(), TextureSize::new(12, 6));
        assert_eq!(node.read_pixels().unwrap().unwrap().1.len(), 12 * 6 * 4);
    }

    #[test]
    fn combiner_inputs_must_match() {
        let backend = Soft::new();
        let small: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(8, 8));
        let large = Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(16, 16));
        let node = Combiner::new(&backend, Multiply).unwrap();
        node.set_input_a(small.clone()).unwrap();

        let err = node.set_input_b(large.clone()).unwrap_err();
        assert!(matches!(
            err,
            NoiseError::SizeMismatch { expected, found }
                if expected == TextureSize::new(8, 8) && found == TextureSize::new(16, 16)
        ));
        assert!(!node.can_produce());

        // Inputs that agree when wired but diverge later stop the node.
        large.set_size(8, 8);
        node.set_input_b(large.clone()).unwrap();
        assert!(node.texture().is_some());
        large.set_size(9, 9);
        let dispatches = backend.dispatch_count();
        assert!(node.texture().is_none());
        assert!(node.is_dirty());
        assert_eq!(backend.dispatch_count(), dispatches);
    }

    #[test]
    fn missing_inputs_yield_nothing() {
        let backend = Soft::new();
        let noise: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Wave::default()).unwrap().with_size(8, 8));
        let node = Combiner::new(&backend, Min).unwrap();
        node.set_input_a(noise.clone()).unwrap();
        assert!(!node.can_produce());
        assert!(node.texture().is_none());

        node.set_input_b(noise.clone()).unwrap();
        assert!(node.can_produce());
        assert!(node.texture().is_some());

        node.clear_inputs();
        assert!(!node.can_produce());
        assert!(node.is_dirty());

        let modifier = Modifier::with_input(&backend, Invert, noise).unwrap();
        assert!(modifier.take_input().is_some());
        assert!(modifier.texture().is_none());
        assert!(modifier.upstream().is_empty());
    }

    #[test]
    fn replacing_parameters_marks_stale() {
        let backend = Soft::new();
        let noise = Generator::new(&backend, Wave::default()).unwrap();
        noise.texture();
        noise.set_params(Wave { frequency: 2.0 });
        assert!(noise.is_dirty());
        noise.texture();

        let mut settings = noise.settings();
        settings.width = 32;
        noise.set_settings(settings);
        assert!(noise.is_dirty());
        assert_eq!(noise.texture_size(), TextureSize::new(32, 128));
        assert_eq!(noise.get("width").unwrap().as_int("width").unwrap(), 32);
        assert_eq!(noise.params(), Wave { frequency: 2.0 });
    }

    #[test]
    fn combiner_and_selector_sizes_follow_resized_inputs() {
        let backend = Soft::new();
        let a = Rc::new(Generator::new(&backend, Wave::default()).unwrap().with_size(8, 8));
        let b = Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(8, 8));
        let s = Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(8, 8));
        let sum = Combiner::with_inputs(&backend, Add::default(), a.clone(), b.clone()).unwrap();
        let pick = Selector::with_inputs(&backend, Blend, a.clone(), b.clone(), s.clone()).unwrap();
        assert!(sum.texture().is_some());
        assert!(pick.texture().is_some());

        a.set_size(20, 10);
        assert_eq!(sum.texture_size(), TextureSize::new(20, 10));
        assert_eq!(pick.texture_size(), TextureSize::new(20, 10));
        assert!(sum.is_dirty());
        assert!(pick.is_dirty());

        b.set_size(20, 10);
        s.set_size(20, 10);
        assert_eq!(sum.texture().unwrap().size(), TextureSize::new(20, 10));
        assert_eq!(pick.texture().unwrap().size(), TextureSize::new(20, 10));
    }

    #[test]
    fn unproducible_displacement_falls_back_to_neutral() {
        let backend = Soft::new();
        let plain = Generator::new(&backend, Wave::default()).unwrap().with_size(8, 8);
        let displaced = Generator::new(&backend, Wave::default()).unwrap().with_size(8, 8);
        let unwired = Rc::new(Modifier::new(&backend, Invert).unwrap());
        displaced.set_x_offset(Some(unwired.clone())).unwrap();

        assert!(displaced.can_produce());
        assert!(displaced.texture().is_some());
        assert_eq!(
            displaced.read_pixels().unwrap(),
            plain.read_pixels().unwrap()
        );

        let dispatches = backend.dispatch_count();
        assert!(!displaced.is_dirty());
        displaced.texture();
        assert_eq!(backend.dispatch_count(), dispatches);

        let source: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Simplex::default()).unwrap().with_size(8, 8));
        unwired.set_input(source).unwrap();
        assert!(displaced.is_dirty());
        assert_ne!(
            displaced.read_pixels().unwrap(),
            plain.read_pixels().unwrap()
        );
    }

    #[test]
    fn stacked_diamonds_are_walked_once() {
        let backend = Soft::new();
        let source = Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(4, 4));
        let mut top: NodeRef<Soft> = source.clone();
        for _ in 0..48 {
            let next: NodeRef<Soft> = Rc::new(
                Combiner::with_inputs(&backend, Add { normalise: true }, top.clone(), top).unwrap(),
            );
            top = next;
        }

        assert!(top.texture().is_some());
        assert_eq!(backend.dispatch_count(), 49);
        assert!(!top.is_dirty());

        source.set("red", 0.2).unwrap();
        assert!(top.is_dirty());
        assert!(top.texture().is_some());
        assert_eq!(backend.dispatch_count(), 98);
        assert!((top.colour_values(&[UVec2::ZERO])[0].x - 0.2).abs() < 1.5 / 255.0);
    }

    /// Byte size of each uniform the kernel's WGSL binds in its parameter group.
    fn shader_uniform_sizes(kernel: &str) -> Vec<(usize, u32)> {
        let source = kernels::lookup(kernel).unwrap().wgsl();
        let module = naga::front::wgsl::parse_str(&source).unwrap();
        module
            .global_variables
            .iter()
            .filter(|(_, var)| var.space == naga::AddressSpace::Uniform)
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref().filter(|b| b.group == 1)?;
                let size = module.types[var.ty].inner.size(module.to_ctx());
                Some((binding.binding as usize, size))
            })
            .collect()
    }

    #[test]
    fn parameter_records_match_shader_uniforms() {
        let settings = GeneratorSettings::default();
        let size = TextureSize::DEFAULT;
        let blocks: Vec<(&str, ParamBlock)> = vec![
            (Constant::NAME, Constant::default().encode(&settings)),
            (Simplex::NAME, Simplex::default().encode(&settings)),
            (Voronoi::NAME, Voronoi::default().encode(&settings)),
            (Wave::NAME, Wave::default().encode(&settings)),
            (Sphere::NAME, Sphere::default().encode(&settings)),
            (Absolute::NAME, Absolute::default().encode(size)),
            (Clamp::NAME, Clamp::default().encode(size)),
            (Invert::NAME, Invert.encode(size)),
            (Loop::NAME, Loop::default().encode(size)),
            (Round::NAME, Round::default().encode(size)),
            (ScaleBias::NAME, ScaleBias::default().encode(size)),
            (Step::NAME, Step::default().encode(size)),
            (Rotate::NAME, Rotate::default().encode(size)),
            (Swirl::NAME, Swirl::default().encode(size)),
            (Stretch::NAME, Stretch::default().encode(size)),
            (Perspective::NAME, Perspective::default().encode(size)),
            (NormalMap::NAME, NormalMap::default().encode(size)),
            (Colorize::NAME, Colorize::default().encode(size)),
            (ScaleCanvas::NAME, ScaleCanvas::default().encode(size)),
            (GaussianBlur::NAME, GaussianBlur::default().encode(size)),
            (Add::NAME, Add::default().encode()),
            (Subtract::NAME, Subtract.encode()),
            (Multiply::NAME, Multiply.encode()),
            (Divide::NAME, Divide.encode()),
            (Min::NAME, Min.encode()),
            (Power::NAME, Power.encode()),
            (Blend::NAME, Blend.encode()),
            (Select::NAME, Select::default().encode()),
        ];
        assert_eq!(blocks.len(), kernels::CATALOGUE.len());

        for (kernel, block) in &blocks {
            for (binding, expected) in shader_uniform_sizes(kernel) {
                let record = &block.buffers()[binding];
                assert_eq!(record.len(), expected as usize, "{kernel} binding {binding}");
            }
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let backend = Soft::new();
        let noise = Rc::new(Generator::new(&backend, Simplex::default()).unwrap());
        let invert = Rc::new(Modifier::with_input(&backend, Invert, noise.clone()).unwrap());
        let blur: NodeRef<Soft> =
            Rc::new(Modifier::with_input(&backend, GaussianBlur::default(), invert.clone()).unwrap());

        assert!(matches!(noise.set_x_offset(Some(blur)), Err(NoiseError::Cycle)));
        assert!(matches!(invert.set_input(invert.clone()), Err(NoiseError::Cycle)));
        assert!(noise.x_offset().is_none());

        let other: NodeRef<Soft> = Rc::new(Generator::new(&backend, Wave::default()).unwrap());
        assert!(noise.set_x_offset(Some(other)).is_ok());
    }

    #[test]
    fn out_of_bounds_positions_read_as_zero() {
        let backend = Soft::new();
        let node = Generator::new(&backend, Constant::new(1.0, 1.0, 1.0))
            .unwrap()
            .with_size(4, 4);
        let values = node.colour_values(&[UVec2::new(1, 1), UVec2::new(4, 0), UVec2::new(3, 3)]);
        assert_eq!(values, vec![Vec4::ONE, Vec4::ZERO, Vec4::ONE]);
        assert_eq!(node.greyscale_values(&[UVec2::new(0, 9)]), vec![0.0]);
    }

    #[test]
    fn parameter_buffers_are_reused() {
        let backend = Soft::new();
        let noise = Generator::new(&backend, Simplex::default()).unwrap().with_size(8, 8);
        noise.texture();
        let allocations = backend.buffer_allocations();
        noise.set("frequency", 3.0).unwrap();
        noise.texture();
        assert_eq!(backend.buffer_allocations(), allocations);
    }

    #[test]
    fn colorize_buffers_grow_with_stops() {
        let backend = Soft::new();
        let grey: NodeRef<Soft> =
            Rc::new(Generator::new(&backend, Constant::default()).unwrap().with_size(4, 4));
        let node = Modifier::with_input(&backend, Colorize::default(), grey).unwrap();
        node.texture();
        let allocations = backend.buffer_allocations();
        node.update(|c| c.add_stop(ColourStop::new(Vec4::ONE, 0.3, 1.0)));
        node.texture();
        // Count is unchanged at one stop, so every buffer is reused.
        assert_eq!(backend.buffer_allocations(), allocations);
        node.update(|c| c.add_stop(ColourStop::new(Vec4::ZERO, 0.7, 1.0)));
        node.texture();
        assert_eq!(backend.buffer_allocations(), allocations + 3);
    }

    #[derive(Clone)]
    struct Misfiled;

    impl Kernel for Misfiled {
        const NAME: &'static str = "addCombiner";
        const CONTROLS: &'static [Control<Self>] = &[];
    }

    impl ModifierKernel for Misfiled {
        fn encode(&self, _input: TextureSize) -> ParamBlock {
            ParamBlock::new()
        }
    }

    #[test]
    fn kernels_must_match_node_shape() {
        let backend = Soft::new();
        assert!(matches!(
            Modifier::new(&backend, Misfiled),
            Err(NoiseError::KernelCompile { .. })
        ));
    }

    #[test]
    fn png_round_trip() {
        let backend = Soft::new();
        let node = Generator::new(&backend, Sphere::default())
            .unwrap()
            .with_size(8, 4);
        let path = std::env::temp_dir().join(format!("noisegraph-{}.png", std::process::id()));
        node.save_png(&path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(decoded, node.to_image().unwrap().unwrap());
    }
}
