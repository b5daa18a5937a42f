//! Trains an image classifier from a TOML run configuration.

use std::path::PathBuf;

use miso::config::{self, MisoConfig};
use miso::logging;
use miso::run_lock::{self, RunLock};
use miso::training::{ManifestTrainer, train_image_classification_model};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("miso-train") {
        logging::init_stderr_only();
        tracing::warn!("File logging disabled: {err}");
    }

    let config = load_config(&options)?;
    let _lock = if options.no_lock {
        None
    } else {
        Some(acquire_lock(&config)?)
    };

    let mut trainer = ManifestTrainer::new();
    let outcome =
        train_image_classification_model(&config, &mut trainer).map_err(|err| err.to_string())?;
    println!("{}", outcome.run_dir.display());
    Ok(())
}

fn load_config(options: &CliOptions) -> Result<MisoConfig, String> {
    let path = match &options.config {
        Some(path) => path.clone(),
        None => config::config_path().map_err(|err| err.to_string())?,
    };
    let mut config = if path.is_file() || options.config.is_some() {
        config::read_from_path(&path).map_err(|err| err.to_string())?
    } else {
        tracing::info!("No config at {}, using defaults", path.display());
        MisoConfig::default()
    };
    if let Some(source) = &options.source {
        config.dataset.source = source.clone();
    }
    if let Some(lock_file) = &options.lock_file {
        config.run.lock_file = lock_file.clone();
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

fn acquire_lock(config: &MisoConfig) -> Result<RunLock, String> {
    let path = &config.run.lock_file;
    tracing::info!("Waiting for run lock {}", path.display());
    let lock = run_lock::acquire_with_retry(path, config.run.retry_backoff())
        .map_err(|err| err.to_string())?;
    tracing::info!("Run lock acquired");
    Ok(lock)
}

struct CliOptions {
    config: Option<PathBuf>,
    source: Option<PathBuf>,
    lock_file: Option<PathBuf>,
    no_lock: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut config = None;
    let mut source = None;
    let mut lock_file = None;
    let mut no_lock = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--source" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--source requires a value".to_string())?;
                source = Some(PathBuf::from(value));
            }
            "--lock-file" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--lock-file requires a value".to_string())?;
                lock_file = Some(PathBuf::from(value));
            }
            "--no-lock" => no_lock = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        config,
        source,
        lock_file,
        no_lock,
    })
}

fn help_text() -> String {
    [
        "miso-train",
        "",
        "Prepares a labelled image set and hands it to the training backend.",
        "Runs sharing a lock file wait for each other.",
        "",
        "Usage:",
        "  miso-train [--config <file>] [--source <path>] [--lock-file <path>] [--no-lock]",
        "",
        "Options:",
        "  --config <file>      Run configuration (default: .miso/config.toml in the config dir).",
        "  --source <path>      Image directory, label CSV or XML project (overrides dataset.source).",
        "  --lock-file <path>   Lock file shared with other runs (overrides run.lock_file).",
        "  --no-lock            Start without waiting for other runs.",
    ]
    .join("\n")
}
