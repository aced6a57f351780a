//! Print the auditory band table.

use clap::Args;
use hms_model::band_table;

/// Print the band table.
#[derive(Args)]
pub struct BandsArgs {
    /// Emit JSON instead of a text table
    #[arg(long)]
    pub json: bool,
}

/// Run the bands command.
pub fn run(args: BandsArgs) -> anyhow::Result<()> {
    let bands = band_table();

    if args.json {
        println!("{}", serde_json::to_string_pretty(bands)?);
        return Ok(());
    }

    println!("Auditory Bands ({} bands)", bands.len());
    println!("{}", "=".repeat(44));
    println!("{:>5}  {:>8}  {:>12}  {:>12}", "index", "z", "f_c (Hz)", "Δf (Hz)");
    for band in bands {
        println!(
            "{:>5}  {:>8.1}  {:>12.1}  {:>12.1}",
            band.index, band.z, band.center_hz, band.bandwidth_hz
        );
    }

    Ok(())
}
