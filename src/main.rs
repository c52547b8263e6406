use std::path::{Path, PathBuf};
use std::rc::Rc;

use noisegraph::nodes::{
    Add, Blend, ColourStop, Colorize, GaussianBlur, NormalMap, Simplex, Swirl, Voronoi, Wave,
};
use noisegraph::{
    Combiner, ComputeBackend, ContextConfig, Generator, Modifier, NodeRef, NoiseError, Selector,
    SoftwareBackend, TextureProvider, Vec3, Vec4, WgpuBackend,
};

/// Renders a small marble-and-cells graph to PNG files.
fn render<B: ComputeBackend>(backend: &B, out_dir: &Path) -> Result<(), NoiseError> {
    let size = 256;

    let warp = Rc::new(Generator::new(backend, Simplex::default())?.with_size(size, size));
    warp.set("frequency", 2.0)?;
    warp.set("octaves", 4)?;

    let bands = Rc::new(Generator::new(backend, Wave { frequency: 4.0 })?.with_size(size, size));
    bands.set_offset_strength(0.35);
    bands.set_rotation(Vec3::new(0.0, 0.0, 0.6));
    bands.set_x_offset(Some(warp.clone()))?;
    bands.set_y_offset(Some(warp.clone()))?;

    let cells = Rc::new(Generator::new(backend, Voronoi::default())?.with_size(size, size));
    cells.set("frequency", 6.0)?;
    cells.set("seamless", true)?;

    let twisted: NodeRef<B> = Rc::new(Modifier::with_input(backend, Swirl::default(), cells)?);
    let marble: NodeRef<B> = Rc::new(Selector::with_inputs(
        backend,
        Blend,
        bands.clone(),
        twisted,
        warp.clone(),
    )?);

    let tinted: NodeRef<B> = Rc::new(Modifier::with_input(
        backend,
        Colorize::new([
            ColourStop::new(Vec4::new(0.08, 0.07, 0.12, 1.0), 0.0, 1.0),
            ColourStop::new(Vec4::new(0.55, 0.42, 0.35, 1.0), 0.45, 1.0),
            ColourStop::new(Vec4::new(0.95, 0.93, 0.88, 1.0), 1.0, 1.0),
        ]),
        marble.clone(),
    )?);
    let soft: NodeRef<B> = Rc::new(Modifier::with_input(
        backend,
        GaussianBlur { sigma: 1.5 },
        marble.clone(),
    )?);
    let normals = Modifier::with_input(backend, NormalMap::default(), soft)?;
    let glow = Combiner::with_inputs(backend, Add { normalise: true }, marble.clone(), bands)?;

    std::fs::create_dir_all(out_dir)?;
    let outputs: [(&str, &dyn TextureProvider<B>); 4] = [
        ("marble.png", marble.as_ref()),
        ("tinted.png", tinted.as_ref()),
        ("normals.png", &normals),
        ("glow.png", &glow),
    ];
    for (name, node) in outputs {
        node.save_png(&out_dir.join(name))?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("noise-out"));

    let result = match WgpuBackend::from_config(&ContextConfig::default()) {
        Ok(backend) => render(&backend, &out_dir),
        Err(err) => {
            log::warn!("{err}; falling back to the software backend");
            render(&SoftwareBackend::new(), &out_dir)
        }
    };

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(1);
    }
}
