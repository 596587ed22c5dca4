use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ct_slice_pairs::{
    AutoReader, Interpolation, PairedDataset, Phase, RunConfig, VolumeReader,
};
use rayon::prelude::*;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ct-slice-pairs")]
#[command(about = "Inspect and preview paired CT slice samples")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the paired volumes of a phase with their shapes
    Inspect {
        /// Dataset root containing the A/ and B/ domains
        root: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Write side-by-side PNG previews of sampled pairs
    Preview {
        /// Dataset root containing the A/ and B/ domains
        root: PathBuf,

        /// Output directory for the PNG files
        #[arg(short, long, default_value = "previews")]
        output: PathBuf,

        /// Number of pairs to render
        #[arg(short = 'n', long, default_value_t = 8)]
        count: usize,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    Train,
    Eval,
}

#[derive(Clone, Copy, ValueEnum)]
enum InterpolationArg {
    Bilinear,
    Nearest,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, value_enum, default_value = "train")]
    phase: PhaseArg,

    /// Directory name under each domain (defaults to train/test by phase)
    #[arg(long)]
    phase_dir: Option<String>,

    #[arg(long, default_value_t = 1)]
    input_nc: usize,

    #[arg(long, default_value_t = 1)]
    output_nc: usize,

    #[arg(long, default_value_t = 286)]
    load_size: usize,

    #[arg(long, default_value_t = 256)]
    fine_size: usize,

    #[arg(long, default_value_t = -1000.0, allow_hyphen_values = true)]
    hu_min: f32,

    #[arg(long, default_value_t = 3000.0, allow_hyphen_values = true)]
    hu_max: f32,

    /// Slices skipped at each end of a volume
    #[arg(long, default_value_t = 0)]
    exclude_slices: usize,

    /// Use the middle slice even in training
    #[arg(long)]
    serial_batches: bool,

    /// Randomly mirror training slices left-right
    #[arg(long)]
    flip: bool,

    #[arg(long, value_enum, default_value = "bilinear")]
    interpolation: InterpolationArg,

    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigArgs {
    fn into_config(self) -> RunConfig {
        let phase = match self.phase {
            PhaseArg::Train => Phase::Train,
            PhaseArg::Eval => Phase::Eval,
        };
        let interpolation = match self.interpolation {
            InterpolationArg::Bilinear => Interpolation::Bilinear,
            InterpolationArg::Nearest => Interpolation::Nearest,
        };
        let mut config = RunConfig::new(phase)
            .with_sizes(self.load_size, self.fine_size)
            .with_hu_window(self.hu_min, self.hu_max)
            .with_exclude_slices(self.exclude_slices)
            .with_serial_batches(self.serial_batches)
            .with_flip(self.flip)
            .with_interpolation(interpolation);
        config.input_nc = self.input_nc;
        config.output_nc = self.output_nc;
        config.phase_dir = self.phase_dir;
        config.seed = self.seed;
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { root, config } => {
            inspect(&root, config.into_config())?;
        }
        Commands::Preview {
            root,
            output,
            count,
            config,
        } => {
            preview(&root, &output, count, config.into_config())?;
        }
    }

    Ok(())
}

fn inspect(root: &Path, config: RunConfig) -> Result<()> {
    let dataset = PairedDataset::scan(root, config)
        .with_context(|| format!("Failed to index {}", root.display()))?;
    let pairs = dataset
        .paths()
        .iter()
        .map(|path_a| -> Result<_> { Ok((path_a.clone(), dataset.pair_of(path_a)?)) })
        .collect::<Result<Vec<_>>>()?;
    let reader = AutoReader::default();

    // Volumes are independent; read them across the pool and report in order.
    let lines = pairs
        .par_iter()
        .map(|(path_a, path_b)| -> Result<String> {
            let volume_a = reader
                .read(path_a)
                .with_context(|| format!("Failed to read {}", path_a.display()))?;
            let volume_b = reader
                .read(path_b)
                .with_context(|| format!("Failed to read {}", path_b.display()))?;
            if volume_a.plane_dim() != volume_b.plane_dim() {
                warn!(path = %path_a.display(), "paired volumes differ in plane size");
            }
            Ok(format!(
                "{}\tA rank {} {:?} depth {}\tB rank {} {:?} depth {}",
                path_a.display(),
                volume_a.rank(),
                volume_a.plane_dim(),
                volume_a.depth(),
                volume_b.rank(),
                volume_b.plane_dim(),
                volume_b.depth(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    for line in lines {
        println!("{line}");
    }

    Ok(())
}

fn preview(root: &Path, output: &Path, count: usize, config: RunConfig) -> Result<()> {
    let mut dataset = PairedDataset::scan(root, config)
        .with_context(|| format!("Failed to index {}", root.display()))?;
    std::fs::create_dir_all(output)?;

    for index in 0..count.min(dataset.len()) {
        let sample = dataset.get(index)?;
        let stem = volume_stem(&sample.path_a);
        let target = output.join(format!("{index:04}_{stem}.png"));
        let image = sample
            .to_image()
            .context("Sample does not fit an image buffer")?;
        image
            .save(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!(
            path = %target.display(),
            slice_a = sample.slices.index_a,
            slice_b = sample.slices.index_b,
            "wrote preview"
        );
    }

    Ok(())
}

fn volume_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.trim_end_matches(".gz")
        .trim_end_matches(".nii")
        .to_owned()
}
