//! jarpack binary
//!
//! A packed copy (one carrying an overlay) runs the embedded application and
//! forwards every argument to it. An unpacked binary is the packing CLI.

use clap::{Parser, Subcommand};
use jarpack::{
    launcher, ExtractionCheck, Manifest, PackConfig, PackError, PackResult, PackedApp, Packer,
    RuntimeExecutable,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "JARPACK_LOG";

#[derive(Parser)]
#[command(name = "jarpack")]
#[command(about = "Pack a Java application and its runtime into one self-extracting executable")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a packed executable
    Pack(PackArgs),

    /// Show what a packed executable carries
    Inspect {
        /// Packed executable
        executable: PathBuf,
    },
}

#[derive(clap::Args)]
struct PackArgs {
    /// Manifest file (defaults to ./jarpack.toml when no inputs are given)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application name
    #[arg(short, long)]
    name: Option<String>,

    /// Application JAR
    #[arg(short, long)]
    jar: Option<PathBuf>,

    /// Runtime zip archive (JRE or JDK)
    #[arg(short = 'r', long)]
    jre: Option<PathBuf>,

    /// Extra files, directories or glob patterns to bundle
    #[arg(short, long, num_args = 0..)]
    files: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Launch with javaw instead of java
    #[arg(long)]
    windowed: bool,

    /// Install into the per-user local data directory
    #[arg(long)]
    localappdata: bool,

    /// Runtime directory name below the install location
    #[arg(long)]
    runtime_dir: Option<String>,

    /// Argument passed to the runtime before -jar (repeatable)
    #[arg(long = "runtime-arg", allow_hyphen_values = true)]
    runtime_args: Vec<String>,

    /// Treat an existing runtime directory as extracted (no marker file)
    #[arg(long)]
    existence_check: bool,

    /// Do not show a progress bar while extracting
    #[arg(long)]
    no_progress: bool,

    /// Launcher binary to copy instead of this executable
    #[arg(long)]
    launcher: Option<PathBuf>,
}

fn main() -> ExitCode {
    match PackedApp::from_current_exe() {
        Ok(Some(app)) => run_packed(app),
        Ok(None) => run_cli(),
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(error: &PackError) {
    eprintln!(
        "{} {} failed: {}",
        console::style("jarpack:").red().bold(),
        error.stage(),
        error
    );
}

fn run_packed(app: PackedApp) -> ExitCode {
    init_logging("warn");

    let args = std::env::args_os().skip(1).collect();
    match app.run(args) {
        Ok(status) => ExitCode::from(launcher::exit_code(&status)),
        Err(PackError::ChildProcessFailed { status }) => {
            tracing::debug!("Runtime exited with {}", status);
            ExitCode::from(launcher::exit_code(&status).max(1))
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    init_logging("info");

    let result = match cli.command {
        Commands::Pack(args) => pack(args),
        Commands::Inspect { executable } => inspect(&executable),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn pack(args: PackArgs) -> PackResult<()> {
    let config = pack_config(args)?;
    let output = Packer::new(config).pack()?;

    println!(
        "Created {} ({:.2} MB, {} resources)",
        output.executable.display(),
        output.size as f64 / (1024.0 * 1024.0),
        output.resource_count
    );
    println!("Run it with arguments for the application:");
    println!("  {} [args...]", output.executable.display());
    Ok(())
}

fn pack_config(args: PackArgs) -> PackResult<PackConfig> {
    let manifest_path = match args.config {
        Some(ref path) => Some(path.clone()),
        None if args.name.is_none() && args.jar.is_none() && args.jre.is_none() => {
            Manifest::find_in_dir(".")
        }
        None => None,
    };

    let mut config = match manifest_path {
        Some(path) => {
            let manifest = Manifest::from_file(&path)?;
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut config = PackConfig::from_manifest(&manifest, base_dir);
            if let Some(name) = args.name {
                config.launcher.app_name = name.clone();
                config.output_name = name;
            }
            if let Some(jar) = args.jar {
                config = config.with_payload(jar);
            }
            if let Some(jre) = args.jre {
                config.runtime_archive = jre;
            }
            config
        }
        None => {
            let missing = |flag: &str| PackError::Config(format!("Missing required {}", flag));
            let name = args.name.ok_or_else(|| missing("--name"))?;
            let jar = args.jar.ok_or_else(|| missing("--jar"))?;
            let jre = args.jre.ok_or_else(|| missing("--jre"))?;
            PackConfig::new(name, jre, jar)
        }
    };

    config.files.extend(args.files);
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(launcher) = args.launcher {
        config.base_executable = Some(launcher);
    }

    let settings = &mut config.launcher;
    if args.windowed {
        settings.executable = RuntimeExecutable::Javaw;
    }
    if args.localappdata {
        settings.use_user_profile = true;
    }
    if let Some(dir) = args.runtime_dir {
        settings.runtime_dir = dir;
    }
    if !args.runtime_args.is_empty() {
        settings.runtime_args = args.runtime_args;
    }
    if args.existence_check {
        settings.extraction_check = ExtractionCheck::Existence;
    }
    if args.no_progress {
        settings.show_progress = false;
    }

    Ok(config)
}

fn inspect(executable: &Path) -> PackResult<()> {
    let app = PackedApp::from_executable(executable)?.ok_or_else(|| {
        PackError::InvalidOverlay(format!("{} is not a packed launcher", executable.display()))
    })?;

    println!("{}", serde_json::to_string_pretty(app.config())?);
    println!();
    println!("Resources:");
    for resource in app.bundle().resources() {
        println!(
            "  {:<8} {:<40} {:>12} bytes",
            resource.kind.tag(),
            resource.name,
            resource.content.len()
        );
    }

    let location = app.discover()?;
    println!();
    println!(
        "Runtime executable: {} (root prefix: {})",
        location.relative_path,
        location.root_prefix.as_deref().unwrap_or("<none>")
    );
    Ok(())
}
