//! Config validation CLI tool
//!
//! Validates a guardian configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-config <config-file>");
            eprintln!();
            eprintln!("Validates a guardian engine configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config guardian.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!(
            "Error: Configuration file not found: {}",
            config_path.display()
        );
        return ExitCode::from(1);
    }

    match guardian_config::load_config(&config_path) {
        Ok(cfg) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!(
                "  Config version: {}",
                guardian_config::CURRENT_CONFIG_VERSION
            );
            println!(
                "  Default preset: {} minutes",
                cfg.default_preset.minutes()
            );
            println!("  Tick interval: {:?}", cfg.tick_interval);
            println!(
                "  Policy: broker={} gps={} silent={}",
                cfg.policy.notify_broker_on_expiry,
                cfg.policy.continuous_gps_tracking,
                cfg.policy.silent_emergency_signal
            );
            println!(
                "  Dispatch: {} attempts, backoff {:?}..{:?}",
                cfg.dispatch.max_attempts,
                cfg.dispatch.initial_backoff,
                cfg.dispatch.max_backoff
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                guardian_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                guardian_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                guardian_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                guardian_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        guardian_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
