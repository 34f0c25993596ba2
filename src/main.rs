use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dct_watermarking as wm;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Embed {
    /// The image to embed the watermark into, png or jpg.
    #[clap(value_parser, long)]
    image: PathBuf,

    /// The text to embed.
    #[clap(value_parser, long)]
    text: String,

    /// Where to write the watermarked image, defaults to <image>_watermarked.<ext>.
    #[clap(value_parser, long)]
    output: Option<PathBuf>,

    #[clap(flatten)]
    config: ConfigArgs,

    /// Use least significant bit embedding with this many bits per channel, writes png.
    #[clap(value_parser, long)]
    lsb_depth: Option<u8>,
}

/// Block codec settings, shared by embed and extract.
#[derive(Args)]
struct ConfigArgs {
    /// Watermark strength.
    #[clap(default_value_t = 20.0, value_parser, long)]
    strength: f64,

    /// Block size in pixels.
    #[clap(default_value_t = 8, value_parser, long)]
    block_size: usize,

    /// Diagonal position of the coefficient that carries the bit.
    #[clap(default_value_t = 4, value_parser, long)]
    position: usize,
}

impl ConfigArgs {
    fn config(&self) -> wm::Config {
        wm::Config {
            block_size: self.block_size,
            target_position: self.position,
            strength: self.strength,
        }
    }
}

#[derive(Args)]
struct Extract {
    /// The watermarked image.
    #[clap(value_parser, long)]
    image: PathBuf,

    /// Length of the watermark in bytes.
    #[clap(value_parser, long, conflicts_with = "manifest")]
    length: Option<usize>,

    /// Manifest written during embedding, holds the length and the configuration.
    #[clap(value_parser, long)]
    manifest: Option<PathBuf>,

    /// Configuration used with --length, must match the one used for embedding.
    #[clap(flatten)]
    config: ConfigArgs,

    /// Read a least significant bit watermark with this many bits per channel, no length needed.
    #[clap(value_parser, long, conflicts_with_all = ["length", "manifest"])]
    lsb_depth: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a text watermark into an image.
    Embed(Embed),
    /// Extract a text watermark from an image.
    Extract(Extract),
}

/// Stored next to the watermarked image, everything needed to extract again.
#[derive(Serialize, Deserialize)]
struct Manifest {
    length: usize,
    config: wm::Config,
}

fn manifest_path(image: &Path) -> PathBuf {
    image.with_extension("json")
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("could not read manifest at {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("malformed manifest at {path:?}"))
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("could not read image at {path:?}"))
}

fn default_output(image: &Path, extension: &str) -> PathBuf {
    let stem = image.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    image.with_file_name(format!("{stem}_watermarked.{extension}"))
}

fn embed_lsb(args: &Embed, depth: u8) -> Result<()> {
    let lsb = wm::Lsb::new(depth)?;
    let source = wm::service::decode(&read_image(&args.image)?)?;
    let marked = lsb.embed_image(&source, &args.text)?;
    let bytes = wm::algorithm::encode(marked, image::ImageFormat::Png)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.image, "png"));
    std::fs::write(&output, bytes).with_context(|| format!("could not write image to {output:?}"))?;
    info!("wrote {output:?}");
    println!("{}", output.display());
    Ok(())
}

fn embed(args: &Embed) -> Result<()> {
    if let Some(depth) = args.lsb_depth {
        return embed_lsb(args, depth);
    }
    let config = args.config.config();
    let service = wm::WatermarkService::new(config)?;

    let bytes = read_image(&args.image)?;
    let filename = args.image.file_name().and_then(|n| n.to_str());
    let embedded = service.embed(&bytes, filename, &args.text)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.image, embedded.extension()));
    std::fs::write(&output, &embedded.bytes)
        .with_context(|| format!("could not write image to {output:?}"))?;

    let manifest = Manifest {
        length: args.text.len(),
        config,
    };
    let manifest_file = manifest_path(&output);
    std::fs::write(&manifest_file, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("could not write manifest to {manifest_file:?}"))?;

    info!("wrote {output:?} and {manifest_file:?}");
    println!("{}", output.display());
    Ok(())
}

/// Length and configuration to extract with, from the flags or a manifest.
fn extract_settings(args: &Extract) -> Result<(usize, wm::Config)> {
    match (&args.manifest, args.length) {
        (Some(path), _) => {
            let manifest = read_manifest(path)?;
            Ok((manifest.length, manifest.config))
        }
        (None, Some(length)) => Ok((length, args.config.config())),
        (None, None) => {
            // Fall back on the manifest that embed writes next to the image.
            let path = manifest_path(&args.image);
            if !path.exists() {
                bail!("either --length or --manifest is required");
            }
            let manifest = read_manifest(&path)?;
            Ok((manifest.length, manifest.config))
        }
    }
}

fn extract(args: &Extract) -> Result<()> {
    let bytes = read_image(&args.image)?;
    if let Some(depth) = args.lsb_depth {
        let text = wm::Lsb::new(depth)?.extract(&wm::service::decode(&bytes)?)?;
        println!("{text}");
        return Ok(());
    }

    let (length, config) = extract_settings(args)?;
    let service = wm::WatermarkService::new(config)?;
    let text = service.extract(&bytes, length)?;
    println!("{text}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Embed(v) => embed(v),
        Commands::Extract(v) => extract(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_args(args: &[&str]) -> Extract {
        let mut argv = vec!["watermark", "extract"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Extract(v) => v,
            Commands::Embed(_) => panic!("parsed as embed"),
        }
    }

    #[test]
    fn test_extract_length_uses_config_flags() {
        let args = extract_args(&[
            "--image", "in.png", "--length", "2", "--block-size", "16", "--position", "3",
            "--strength", "35",
        ]);
        let (length, config) = extract_settings(&args).unwrap();
        assert_eq!(length, 2);
        assert_eq!(
            config,
            wm::Config {
                block_size: 16,
                target_position: 3,
                strength: 35.0,
            }
        );
    }

    #[test]
    fn test_extract_length_defaults() {
        let args = extract_args(&["--image", "in.png", "--length", "2"]);
        assert_eq!(extract_settings(&args).unwrap().1, wm::Config::default());
    }

    #[test]
    fn test_lsb_depth_conflicts_with_length() {
        assert!(Cli::try_parse_from([
            "watermark", "extract", "--image", "in.png", "--length", "2", "--lsb-depth", "1",
        ])
        .is_err());
        assert_eq!(extract_args(&["--image", "in.png", "--lsb-depth", "2"]).lsb_depth, Some(2));
    }
}
