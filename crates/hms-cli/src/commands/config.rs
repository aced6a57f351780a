//! Print the default configuration.

use anyhow::Context;
use clap::Args;
use hms_model::HmsConfig;

/// Print the default analysis configuration.
#[derive(Args)]
pub struct ConfigArgs {}

/// Run the config command.
pub fn run(_args: ConfigArgs) -> anyhow::Result<()> {
    let text = HmsConfig::default()
        .to_toml()
        .context("failed to serialize default configuration")?;
    print!("{text}");
    println!("# Full-scale WAV amplitude in pascal");
    println!("calibration = 1.0");
    Ok(())
}
