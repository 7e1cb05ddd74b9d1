//! packgrep command line.
//!
//! `build` packs a project into its `.qgd`, `watch` keeps the `.qgc`
//! changes file current (escalating to a repack after large bursts), and
//! `update` forces a repack right now.

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use packgrep_indexer::{build_project, update_project, BuildProgress, WatchConfig, WatchSession};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "packgrep", version, about = "Project data-pack builder and change watcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the project and build its data pack
    Build {
        /// Path to the project file (TOML)
        project: PathBuf,
    },
    /// Watch the project and keep its changes file current
    Watch {
        /// Path to the project file (TOML)
        project: PathBuf,
    },
    /// Rebuild the pack and clear accumulated changes
    Update {
        /// Path to the project file (TOML)
        project: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build { project } => build(&project),
        Command::Update { project } => {
            update_project(&project)?;
            Ok(())
        }
        Command::Watch { project } => watch(&project),
    }
}

fn build(project: &Path) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("[{bar:30}] {pos}/{len} files, {msg}")?.progress_chars("=> "),
    );

    let stats = build_project(project, |progress: BuildProgress| {
        if bar.length() != Some(progress.files_total as u64) {
            bar.set_length(progress.files_total as u64);
        }
        bar.set_position(progress.files_done as u64);
        bar.set_message(format!(
            "{} MB in, {} MB out",
            progress.stats.uncompressed_bytes / 1024 / 1024,
            progress.stats.compressed_bytes / 1024 / 1024
        ));
    })?;
    bar.finish_and_clear();

    println!(
        "{} files, {} KB in, {} KB out",
        stats.file_count,
        stats.uncompressed_bytes / 1024,
        stats.compressed_bytes / 1024
    );
    Ok(())
}

fn watch(project: &Path) -> Result<()> {
    let session = WatchSession::start(project, WatchConfig::default())?;
    let repack_target = project.to_path_buf();
    session.run(move || update_project(&repack_target))?;
    Ok(())
}
