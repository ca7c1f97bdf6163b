//! The `alttext describe` command: generate alt text for a local file.

use alttext_core::{AltTextGenerator, Compressor, Config, GenerateOptions, ImageInput};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the `describe` command.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Image file to describe
    pub file: PathBuf,

    /// Query providers one at a time instead of concurrently
    #[arg(long)]
    pub sequential: bool,

    /// Report provider failures inline instead of failing
    #[arg(long)]
    pub partial: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl DescribeArgs {
    /// Apply CLI flags on top of the configured pipeline options.
    fn options(&self, config: &Config) -> GenerateOptions {
        let mut options = GenerateOptions::from(&config.pipeline);
        if self.sequential {
            options.parallel = false;
        }
        if self.partial {
            options.partial_results = true;
        }
        options
    }
}

/// Execute the describe command.
pub async fn execute(args: DescribeArgs, config: Config) -> anyhow::Result<()> {
    let path = PathBuf::from(shellexpand::tilde(&args.file.to_string_lossy()).into_owned());
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let image = ImageInput::from_bytes(bytes, config.limits.max_upload_mb)
        .with_context(|| format!("Unusable image: {}", path.display()))?;
    let compressor = Compressor::new(config.compression.clone(), config.limits.decode_timeout_ms);
    let image = compressor.compress(image).await?;

    let generator = AltTextGenerator::from_config(&config)?.with_options(args.options(&config));
    let results = generator.generate(&image).await?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{output}");

    Ok(())
}
