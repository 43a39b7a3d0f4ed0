use anyhow::{Context, Result};
use curtin_net::report::render_legacy_text;
use eni_core::legacy::parse_file;

use crate::cli::{InspectArgs, OutputFormat};

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let interfaces = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_legacy_text(&interfaces)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&interfaces)?),
    }
    Ok(())
}
