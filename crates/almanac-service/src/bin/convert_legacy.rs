//! Converts a JSON dump of the previous calendar schema into the current one.
//!
//! Usage: `convert_legacy <input_file> <output_file> [timezone]`

use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use almanac_interchange::legacy::Converter;
use almanac_interchange::timezone::resolve_timezone;

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: convert_legacy <input_file> <output_file> [timezone]");
    };
    let timezone = resolve_timezone(&args.next().unwrap_or_else(|| "UTC".to_string()))?;

    let raw = std::fs::read(&input).with_context(|| format!("failed to read {input}"))?;
    let records: Vec<Value> =
        serde_json::from_slice(&raw).with_context(|| format!("{input} is not a JSON array"))?;

    let converter = Converter::new(timezone);
    let total = records.len();
    let mut stdout = std::io::stdout();
    let mut converted = Vec::with_capacity(total);
    for (index, value) in records.into_iter().enumerate() {
        write!(stdout, "Processing {} of {total}\r", index + 1)?;
        stdout.flush()?;

        let record = converter.classify(value);
        if let Some(model) = record.unknown_model() {
            tracing::warn!(model, "Unknown model, copied unchanged");
        }
        converted.push(
            converter
                .convert_record(record)
                .with_context(|| format!("record {} of {total}", index + 1))?,
        );
    }
    writeln!(stdout)?;

    let body = serde_json::to_vec(&converted)?;
    std::fs::write(&output, body).with_context(|| format!("failed to write {output}"))?;
    tracing::info!(records = total, output = %output, "Conversion complete");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_e| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Conversion failed: {err:#}");
        std::process::exit(1);
    }
}
