//! phi_builder CLI
//!
//! Trajectory → binding matrix / phi values
//! Phi values → run statistics table (append-only)
//! Manifest → per-spacing batch tables

#[cfg(feature = "cli")]
use anyhow::{bail, Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use phi_core::CoordinateMode;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "phi_builder")]
#[command(about = "TF/TU binding occupancy from trajectory dumps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Parse one trajectory into a binding matrix and phi values
    Parse {
        /// Trajectory file (name must contain Np_<int>_run_<int>)
        trajectory: PathBuf,

        /// Coordinate convention: raw, box-scaled or fixed-box:<side>
        #[arg(long)]
        mode: CoordinateMode,

        /// Binding distance threshold
        #[arg(long, default_value_t = phi_core::DEFAULT_BINDING_THRESHOLD)]
        threshold: f64,

        /// Base output directory
        #[arg(long)]
        out: PathBuf,

        /// Binding matrix directory (default: <out>/TF_On_Off_Matrices)
        #[arg(long)]
        matrix_dir: Option<PathBuf>,

        /// Phi value directory (default: <out>/TF_Phi_Values)
        #[arg(long)]
        phi_dir: Option<PathBuf>,

        /// Output metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Append mean/std of every phi file in a directory to a statistics table
    Aggregate {
        /// Directory containing TF_phis_Np_<np>_run_<run>.json files
        #[arg(long)]
        phi_dir: PathBuf,

        /// Statistics CSV (created if missing, appended otherwise)
        #[arg(long)]
        table: PathBuf,

        /// Binding matrix directory; runs without a phi file are recovered from it
        #[arg(long)]
        matrix_dir: Option<PathBuf>,
    },

    /// Build one statistics table per TU spacing from a manifest
    Batch {
        /// Manifest YAML; the historical catalogue is used when omitted
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Trajectory root holding runSep<l> directories (without --manifest)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output directory for the tables (without --manifest)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Average run statistics per TF count
    Summarize {
        /// Statistics table (Np/Mean/Standard Deviation or TFs/phi_mean/phi_std)
        #[arg(long)]
        table: PathBuf,

        /// Output CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export the nearest TF distance of every TU per frame
    Distances {
        /// Trajectory file
        trajectory: PathBuf,

        /// Coordinate convention: raw, box-scaled or fixed-box:<side>
        #[arg(long)]
        mode: CoordinateMode,

        /// Output CSV file
        #[arg(long)]
        out: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            trajectory,
            mode,
            threshold,
            out,
            matrix_dir,
            phi_dir,
            metadata,
        } => {
            let matrix_dir = matrix_dir.unwrap_or_else(|| out.join(phi_builder::MATRIX_DIR_NAME));
            let phi_dir = phi_dir.unwrap_or_else(|| out.join(phi_builder::PHI_DIR_NAME));

            println!("🔬 Parsing trajectory...");
            println!("   Input:     {}", trajectory.display());
            println!("   Mode:      {}", mode);
            println!("   Threshold: {}", threshold);

            let meta =
                phi_builder::parse_trajectory(&trajectory, mode, threshold, &matrix_dir, &phi_dir)?;

            println!("\n✅ Processed {} frames ({} TUs)", meta.total_timesteps, meta.tu_count);
            if meta.dropped_frames > 0 {
                println!("   Dropped frames:  {}", meta.dropped_frames);
            }
            if meta.skipped_records > 0 {
                println!("   Skipped records: {}", meta.skipped_records);
            }
            println!("   - {}", meta.matrix_json.display());
            println!("   - {}", meta.phi_json.display());
            println!("   - {}", meta.phi_csv.display());

            if let Some(metadata_path) = metadata {
                phi_builder::save_metadata(&metadata_path, &meta)?;
                println!("\n📄 Metadata saved to: {}", metadata_path.display());
            }
        }

        Commands::Aggregate {
            phi_dir,
            table,
            matrix_dir,
        } => {
            let phi_dir = phi_builder::require_dir(&phi_dir)?;
            let table = phi_builder::resolve_path(&table)?;

            if let Some(matrix_dir) = matrix_dir {
                let matrix_dir = phi_builder::require_dir(&matrix_dir)?;
                let recovered = phi_core::recover_missing_phi(&matrix_dir, &phi_dir)
                    .context("Failed to recover phi values from binding matrices")?;
                if !recovered.is_empty() {
                    println!("♻️  Recovered {} phi files from binding matrices", recovered.len());
                }
            }

            println!("📊 Aggregating phi statistics...");
            println!("   Phi values: {}", phi_dir.display());
            println!("   Table:      {}", table.display());

            let report = phi_core::aggregate_dir_into(&phi_dir, &table)
                .context("Failed to aggregate phi statistics")?;

            println!("\n✅ Appended {} rows to {}", report.rows.len(), table.display());
            if !report.skipped.is_empty() {
                println!("⚠️  Skipped {} files:", report.skipped.len());
                for skipped in &report.skipped {
                    println!("   {}: {}", skipped.path.display(), skipped.reason);
                }
            }
        }

        Commands::Batch {
            manifest,
            root,
            out,
        } => {
            let manifest = match (manifest, root, out) {
                (Some(path), None, None) => {
                    let path = phi_builder::require_file(&path)?;
                    phi_core::BatchManifest::load(&path)
                        .with_context(|| format!("Failed to load manifest: {}", path.display()))?
                }
                (None, Some(root), Some(out)) => phi_core::BatchManifest::historical(
                    phi_builder::resolve_path(&root)?,
                    phi_builder::resolve_path(&out)?,
                ),
                _ => bail!("Pass either --manifest, or both --root and --out"),
            };

            println!("🗂️  Running batch over {} spacings...", manifest.entries.len());
            println!("   Trajectories: {}", manifest.trajectory_root.display());
            println!("   Output:       {}", manifest.output_dir.display());

            let report = phi_core::run_batch(&manifest).context("Batch run failed")?;

            for table in &report.tables {
                println!("✓ Saved: {} with {} entries", table.path.display(), table.rows);
            }
            let warnings = phi_builder::batch_warning_count(&report);
            if warnings > 0 {
                println!(
                    "⚠️  {} warnings ({} missing directories, {} missing files, {} unusable trajectories)",
                    warnings,
                    report.missing_dirs.len(),
                    report.missing_files.len(),
                    report.skipped.len()
                );
            }
        }

        Commands::Summarize { table, out } => {
            let summary = phi_builder::summarize_table(&table, out.as_deref())?;

            println!("{:>6} {:>10} {:>10} {:>6}", "TFs", "phi_mean", "phi_std", "runs");
            for row in &summary {
                println!(
                    "{:>6} {:>10.6} {:>10.6} {:>6}",
                    row.np, row.phi_mean, row.phi_std, row.runs
                );
            }
            if let Some(out) = out {
                println!("\n📄 Summary saved to: {}", out.display());
            }
        }

        Commands::Distances {
            trajectory,
            mode,
            out,
        } => {
            let samples = phi_builder::export_distances(&trajectory, mode, &out)?;
            println!("✅ Wrote {} distance samples to {}", samples, out.display());
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("phi_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
