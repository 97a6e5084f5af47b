//! Config validation CLI tool
//!
//! Validates a satchel configuration file and reports any errors.

use satchel_util::format_duration;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-config <config-file>");
            eprintln!();
            eprintln!("Validates a satchel configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config satchel.toml");
            return ExitCode::from(2);
        }
    };

    // Check file exists
    if !config_path.exists() {
        eprintln!(
            "Error: Configuration file not found: {}",
            config_path.display()
        );
        return ExitCode::from(1);
    }

    // Try to load and validate
    match satchel_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!(
                "  Config version: {}",
                satchel_config::CURRENT_CONFIG_VERSION
            );
            println!(
                "  Default planned duration: {}",
                format_duration(policy.session.default_planned_duration)
            );
            println!(
                "  Stationary settle window: {}",
                format_duration(policy.motion.stationary_settle)
            );
            println!(
                "  Motion confidence floor: {}",
                policy.motion.min_confidence
            );
            println!(
                "  Accessory disconnect grace: {}",
                format_duration(policy.accessory.disconnect_grace)
            );
            println!("  Geofence radius: {}m", policy.geofence.radius_meters);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                satchel_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                satchel_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                satchel_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                satchel_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        satchel_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
