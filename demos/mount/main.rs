use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use simfs::config::Config;
use simfs::guest;
use simfs::loopback::LoopbackSim;

/// Mounts a host directory through the full passthrough protocol using the
/// in-process loopback simulator, then runs a small self-check.
#[derive(Parser)]
#[command(name = "simfs-mount")]
struct Args {
    /// Host directory to exercise the mount against.
    directory: PathBuf,

    /// Guest path presented as the mount point.
    #[arg(long, default_value = "/host")]
    mountpoint: String,

    /// Executor configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("simfs-mount: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => Config::load(path).map_err(|err| err.to_string())?,
        None => Config::default(),
    };
    let directory = std::fs::canonicalize(&args.directory)
        .map_err(|err| format!("cannot resolve {}: {err}", args.directory.display()))?;

    let sim = LoopbackSim::with_config(config);
    let mut fs = guest::mount(sim, &args.mountpoint).map_err(|err| err.to_string())?;
    println!("mounted at {} (type probe passed)", fs.mountpoint());

    let echoed = fs.remote_mountpoint().map_err(|err| format!("GetMountpoint failed: {err}"))?;
    println!("host records the mount point as {echoed}");

    // A round through the protocol: create, stat, list, remove.
    let scratch = format!("{}/simfs-selfcheck", directory.display());
    fs.mkdir(&scratch, 0o750).map_err(|err| format!("mkdir failed: {err}"))?;
    let st = fs.getattr(&scratch).map_err(|err| format!("getattr failed: {err}"))?;
    if st.st_mode & 0o777 != 0o750 {
        return Err(format!("self-check directory has mode {:o}", st.st_mode & 0o777));
    }

    let listing =
        fs.readdir(&directory.to_string_lossy()).map_err(|err| format!("readdir failed: {err}"))?;
    println!("{} entries under {}", listing.len(), directory.display());
    for name in &listing {
        println!("  {name}");
    }

    fs.rmdir(&scratch).map_err(|err| format!("rmdir failed: {err}"))?;
    println!("self-check passed");
    Ok(())
}
