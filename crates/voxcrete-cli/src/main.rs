//! voxcrete CLI - concrete voxelization from the command line
//!
//! Reads concrete and reinforcement mesh documents, voxelizes the concrete,
//! classifies every voxel by reinforcement ratio and writes the bucket table.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use voxcrete_grid::{BucketTable, GridSettings, VoxelConfig, VoxelModel};

mod document;

use document::MeshDocument;

#[derive(Parser)]
#[command(name = "voxcrete")]
#[command(about = "Voxelize concrete and classify reinforcement density", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Voxelize a concrete mesh and classify voxels by reinforcement ratio
    Voxelize {
        /// Concrete mesh document (.json)
        concrete: PathBuf,
        /// Reinforcement mesh document (.json)
        reinforcement: PathBuf,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Bucket table saved by a previous run (.json); overrides the config
        #[arg(short, long)]
        buckets: Option<PathBuf>,
        /// Voxel edge length; overrides the config
        #[arg(long, conflicts_with = "auto_size")]
        cell_size: Option<f64>,
        /// Pick the cell size from the concrete's bounding volume
        #[arg(long)]
        auto_size: bool,
        /// Where to write the bucket table (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write every voxel as JSON
        #[arg(long)]
        voxels: Option<PathBuf>,
    },
    /// Print an evenly split bucket table
    Buckets {
        /// Number of buckets
        #[arg(default_value_t = 4)]
        count: usize,
    },
    /// Display information about a mesh document
    Info {
        /// Mesh document (.json)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Voxelize {
            concrete,
            reinforcement,
            config,
            buckets,
            cell_size,
            auto_size,
            output,
            voxels,
        } => {
            let mut config = match config {
                Some(path) => VoxelConfig::load(path)?,
                None => VoxelConfig::default(),
            };
            if let Some(path) = buckets {
                config.buckets.ranges = BucketTable::load(path)?.into();
            }
            if let Some(size) = cell_size {
                config.grid.cell_size = size;
            }
            voxelize(
                &concrete,
                &reinforcement,
                config,
                auto_size,
                output.as_deref(),
                voxels.as_deref(),
            )?;
        }
        Commands::Buckets { count } => {
            println!("{}", BucketTable::even(count)?.to_json()?);
        }
        Commands::Info { file } => {
            show_info(&file)?;
        }
    }

    Ok(())
}

fn voxelize(
    concrete: &Path,
    reinforcement: &Path,
    mut config: VoxelConfig,
    auto_size: bool,
    output: Option<&Path>,
    voxels: Option<&Path>,
) -> Result<()> {
    let concrete = MeshDocument::load(concrete)?.into_solid("concrete")?;
    let reinforcement = MeshDocument::load(reinforcement)?.into_solid("reinforcement")?;

    if auto_size {
        let Some(bounds) = concrete.world_aabb() else {
            bail!("concrete mesh has no triangles, cannot pick a cell size");
        };
        config.grid = GridSettings {
            cell_size: GridSettings::for_volume(bounds.volume()).cell_size,
            ..config.grid
        };
        info!(
            "picked cell size {} for volume {:.1}",
            config.grid.cell_size,
            bounds.volume()
        );
    }

    let mut model = VoxelModel::new(concrete, reinforcement, &config)?;
    let table = model.voxelize()?.to_json()?;

    match output {
        Some(path) => {
            std::fs::write(path, &table)?;
            println!("Wrote bucket table to {}", path.display());
        }
        None => println!("{table}"),
    }

    if let Some(path) = voxels {
        std::fs::write(path, serde_json::to_string(&model.records())?)?;
        println!("Wrote {} voxels to {}", model.voxels().len(), path.display());
    }

    Ok(())
}

fn show_info(file: &Path) -> Result<()> {
    let doc = MeshDocument::load(file)?;

    println!("mesh document: {}", file.display());
    println!("  Elements: {}", doc.elements.len());
    for element in &doc.elements {
        println!(
            "  {}: {} vertices, {} triangles{}",
            element.id,
            element.mesh.num_vertices(),
            element.mesh.num_triangles(),
            if element.mesh.is_indexed() { "" } else { " (no index buffer)" }
        );
    }

    match doc.into_solid("model") {
        Ok(solid) => match solid.world_aabb() {
            Some(bounds) => {
                let volume = bounds.volume();
                println!("\nBounds:");
                println!("  Min: {:?}", [bounds.min.x, bounds.min.y, bounds.min.z]);
                println!("  Max: {:?}", [bounds.max.x, bounds.max.y, bounds.max.z]);
                println!("  Volume: {:.3}", volume);
                let settings = GridSettings::for_volume(volume);
                println!(
                    "  Suggested cell size: {} (limit {})",
                    settings.cell_size,
                    settings.size_limit()
                );
            }
            None => println!("\nNo triangles"),
        },
        Err(e) => {
            println!("\nCannot build a solid: {}", e);
        }
    }

    Ok(())
}
