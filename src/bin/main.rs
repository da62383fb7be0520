//! Cube Forge CLI
//!
//! Convert 3D models into Minecraft Bedrock cube geometry.

use clap::{Parser, Subcommand, ValueEnum};
use cube_forge::convert::sanitize_name;
use cube_forge::{
    export_geometry_json, load_model, AddonBundle, ConvertOptions, Converter, FillMode,
    ImportedModel, Occupancy, Placement, SourceConvention,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cube-forge")]
#[command(author, version, about = "Convert 3D models into Minecraft Bedrock cube geometry", long_about = None)]
struct Cli {
    /// Log verbosity when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a model (GLB, glTF, OBJ or FBX)
    Convert {
        /// Input model file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (defaults to the input name with a matching extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to write
        #[arg(short, long, value_enum, default_value = "mcaddon")]
        format: OutputFormat,

        /// Start from a named preset
        #[arg(long, value_enum, default_value = "standard")]
        preset: Preset,

        /// JSON file with conversion options (overrides the preset)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Grid cells per block (above 160, also lower --min-cube-size to 16 / N)
        #[arg(short, long)]
        resolution: Option<u32>,

        /// Uniform scale, in (0, 10]
        #[arg(short, long)]
        scale: Option<f32>,

        /// Source axis convention (defaults to the format's own)
        #[arg(long, value_enum)]
        convention: Option<Convention>,

        /// Geometry identifier (defaults to geometry.<file name>)
        #[arg(long)]
        identifier: Option<String>,

        /// Texture width in pixels
        #[arg(long)]
        texture_width: Option<u32>,

        /// Texture height in pixels
        #[arg(long)]
        texture_height: Option<u32>,

        /// Use exact point-to-triangle distance for occupancy
        #[arg(long)]
        surface_distance: bool,

        /// Fill the interior of closed shells
        #[arg(long)]
        solid: bool,

        /// Keep source coordinates instead of centring on the ground
        #[arg(long)]
        keep_position: bool,

        /// Smallest cube edge in pixels
        #[arg(long)]
        min_cube_size: Option<f32>,
    },

    /// Show information about a model file
    Info {
        /// Input model file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Zipped add-on with resource and behaviour packs
    Mcaddon,
    /// Resource and behaviour pack directories
    Packs,
    /// Geometry JSON only
    Geometry,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 16 cells per block
    Standard,
    /// 32 cells per block
    Fine,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Convention {
    /// Y up, right-handed (glTF, OBJ)
    YUpRh,
    /// Z up, right-handed (Blender, 3ds Max)
    ZUpRh,
    /// Y up, left-handed (Unity)
    YUpLh,
    /// Z up, left-handed (Unreal)
    ZUpLh,
}

impl From<Convention> for SourceConvention {
    fn from(value: Convention) -> Self {
        match value {
            Convention::YUpRh => SourceConvention::YUpRightHanded,
            Convention::ZUpRh => SourceConvention::ZUpRightHanded,
            Convention::YUpLh => SourceConvention::YUpLeftHanded,
            Convention::ZUpLh => SourceConvention::ZUpLeftHanded,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("cube_forge={}", cli.log_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            preset,
            options,
            resolution,
            scale,
            convention,
            identifier,
            texture_width,
            texture_height,
            surface_distance,
            solid,
            keep_position,
            min_cube_size,
        } => {
            let mut config = match options {
                Some(path) => {
                    println!("Loading options from {:?}...", path);
                    serde_json::from_str(&fs::read_to_string(&path)?)?
                }
                None => match preset {
                    Preset::Standard => ConvertOptions::standard(),
                    Preset::Fine => ConvertOptions::fine(),
                },
            };

            if let Some(resolution) = resolution {
                config = config.with_resolution(resolution);
            }
            if let Some(scale) = scale {
                config = config.with_scale(scale);
            }
            if let Some(convention) = convention {
                config = config.with_source_convention(convention.into());
            }
            if let Some(identifier) = identifier {
                config = config.with_identifier(identifier);
            } else if config.identifier == ConvertOptions::standard().identifier {
                let stem = sanitize_name(&file_stem(&input));
                config = config.with_identifier(format!("geometry.{}", stem));
            }
            if texture_width.is_some() || texture_height.is_some() {
                let width = texture_width.unwrap_or(config.texture_width);
                let height = texture_height.unwrap_or(config.texture_height);
                config = config.with_texture_size(width, height);
            }
            if surface_distance {
                config = config.with_occupancy(Occupancy::SurfaceDistance);
            }
            if solid {
                config = config.with_fill(FillMode::Solid);
            }
            if keep_position {
                config = config.with_placement(Placement::Preserve);
            }
            if let Some(size) = min_cube_size {
                config = config.with_min_cube_size(size);
            }

            convert_model(&input, output, format, config)?;
        }
        Commands::Info { input } => {
            show_model_info(&input)?;
        }
    }

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

fn load(input: &Path) -> Result<ImportedModel, Box<dyn std::error::Error>> {
    println!("Loading model from {:?}...", input);
    let model = load_model(input)?;
    println!(
        "  Found {} vertices, {} triangles",
        model.mesh.vertex_count(),
        model.mesh.triangle_count()
    );
    Ok(model)
}

fn convert_model(
    input: &Path,
    output: Option<PathBuf>,
    format: OutputFormat,
    options: ConvertOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let converter = Converter::new(options)?;
    let model = load(input)?;
    let options = converter.options();

    println!("Converting with options:");
    println!("  - Identifier: {}", options.identifier);
    println!("  - Resolution: {} cells per block", options.resolution);
    println!("  - Scale: {}", options.scale);
    println!(
        "  - Convention: {}",
        options.source_convention.unwrap_or(model.native_convention)
    );
    println!("  - Texture: {}x{}", options.texture_width, options.texture_height);

    let result = converter.convert_imported(&model)?;
    println!(
        "Generated {} cubes from {} voxels",
        result.stats.cubes, result.stats.voxels
    );

    let name = options.entity_name();
    match format {
        OutputFormat::Mcaddon => {
            let path = output.unwrap_or_else(|| input.with_file_name(format!("{}.mcaddon", name)));
            let bytes = AddonBundle::build(&result)?.to_mcaddon()?;
            fs::write(&path, &bytes)?;
            println!("Exported add-on ({} bytes) to {:?}", bytes.len(), path);
        }
        OutputFormat::Packs => {
            let dir = output.unwrap_or_else(|| input.with_file_name(format!("{}_packs", name)));
            let written = AddonBundle::build(&result)?.write_to_dir(&dir)?;
            println!("Exported {} files to {:?}", written.len(), dir);
        }
        OutputFormat::Geometry => {
            let path =
                output.unwrap_or_else(|| input.with_file_name(format!("{}.geo.json", name)));
            fs::write(&path, export_geometry_json(&result)?)?;
            println!("Exported geometry to {:?}", path);
        }
    }

    Ok(())
}

fn show_model_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let model = load(input)?;
    let mesh = &model.mesh;
    let bounds = mesh.bounding_box();

    println!("\nModel Info:");
    println!("  Convention: {}", model.native_convention);
    println!("  Vertices: {}", mesh.vertex_count());
    println!("  Triangles: {}", mesh.triangle_count());
    println!("  Normals: {}", if mesh.has_normals() { "yes" } else { "no" });
    println!("  UVs: {}", if mesh.has_uvs() { "yes" } else { "no" });
    println!("  Bounds min: {:?}", bounds.min);
    println!("  Bounds max: {:?}", bounds.max);
    println!("  Size: {:?}", bounds.dimensions());
    if let Some(color) = model.base_color {
        println!("  Base color: {:?}", color);
    }

    Ok(())
}
