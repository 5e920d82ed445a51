//! Command-line interface definitions for `shelf-scan`.
//!
//! ```bash
//! # Scan with a USB barcode scanner (keyboard wedge), print the ISBN as JSON
//! shelf-scan scan
//!
//! # Same, but fall back to a photo if no scanner is usable
//! shelf-scan scan --image cover.jpg
//!
//! # Recognize straight from a photo (needs SHELF_VISION_API_KEY)
//! shelf-scan recognize cover.jpg
//!
//! # Check what the normalizer makes of some text
//! shelf-scan normalize "ISBN 978-0-13-468599-1"
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ISBN scanner for the Shelf bookstore.
#[derive(Debug, Parser)]
#[command(name = "shelf-scan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE", global = true, env = "SHELF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a live scan session and print the first valid ISBN
    Scan(ScanArgs),
    /// Recognize an ISBN from a photo of a book
    Recognize(RecognizeArgs),
    /// Normalize and validate a piece of text
    Normalize(NormalizeArgs),
    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Use this device id instead of the label heuristic
    #[arg(long, value_name = "ID")]
    pub device: Option<String>,

    /// Photo to recognize if no camera is usable
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RecognizeArgs {
    /// JPEG, PNG, WebP or GIF image of the book
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Text as a decoder or model would produce it
    #[arg(value_name = "TEXT")]
    pub text: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,
}
