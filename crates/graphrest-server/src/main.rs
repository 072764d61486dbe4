use std::env;
use std::process::ExitCode;

use graphrest_server::ServerBuilder;
use graphrest_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

const CONFIG_ENV: &str = "GRAPHREST_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => eprintln!("Warning: ignoring .env: {err}"),
    }

    graphrest_server::init_tracing();

    let (config_path, origin) = config_path(env::args().skip(1));
    let cfg = match load_config(Some(&config_path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Configuration error ({config_path}): {err}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(path = %config_path, origin, "Configuration loaded");
    graphrest_server::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("Startup failed: {err:#}");
            return ExitCode::from(2);
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Server error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Picks the config file: `--config <path>`, then `GRAPHREST_CONFIG`, then
/// `graphrest.toml`. The second value names where the path came from.
fn config_path(mut args: impl Iterator<Item = String>) -> (String, &'static str) {
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), "--config");
        }
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, "--config");
        }
    }

    match env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => (path, CONFIG_ENV),
        _ => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}
