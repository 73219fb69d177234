use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use i3d_export::{ExportSettings, SourceScene, export_to_file};

/// Export a JSON scene description to a GIANTS i3d file.
#[derive(Parser, Debug)]
#[command(name = "i3d-export", version, about)]
struct Args {
    /// Scene description (.json)
    #[arg(long)]
    scene: PathBuf,

    /// Export settings (.json), defaults when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "out.i3d")]
    output: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut scene = SourceScene::from_path(&args.scene)
        .with_context(|| format!("failed to load scene '{}'", args.scene.display()))?;
    let settings = match &args.settings {
        Some(path) => ExportSettings::from_path(path)
            .with_context(|| format!("failed to load settings '{}'", path.display()))?,
        None => ExportSettings::default(),
    };

    let report = export_to_file(&mut scene, &settings, &args.output);
    print!("{report}");

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
