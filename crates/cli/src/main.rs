use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use daforge::commands::{
    extract_command, info_command, merge_command, scan_command, ImageSelector, MergeRequest,
};
use daforge::parse_u16;

/// Download-agent container editor and security-engine offset finder.
///
/// This CLI is a thin wrapper around `daforge-core` (exposed in code as
/// `daforge_core`). All substantive logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "daforge",
    version,
    about = "DA container editor and SEJ offset finder",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, default_value_t = false, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct ImageArgs {
    /// Image index inside the container. Defaults to the first image.
    #[arg(long)]
    image: Option<usize>,

    /// Select the image by hardware code instead of index (e.g. 0x0766).
    #[arg(long, value_parser = parse_u16_arg, conflicts_with = "image")]
    hw_code: Option<u16>,

    /// Hardware sub-code used with --hw-code. Defaults to 0.
    #[arg(long, value_parser = parse_u16_arg, requires = "hw_code")]
    hw_sub_code: Option<u16>,
}

impl From<ImageArgs> for ImageSelector {
    fn from(args: ImageArgs) -> Self {
        ImageSelector { index: args.image, hw_code: args.hw_code, hw_sub_code: args.hw_sub_code }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the images and regions of a DA container.
    Info {
        /// Path to the DA container.
        container: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Extract stage payloads and signatures from a DA container.
    ///
    /// Writes `da1.bin` / `da2.bin`, plus `da1.sig` / `da2.sig` for signed stages.
    Extract {
        /// Path to the DA container.
        container: String,

        #[command(flatten)]
        image: ImageArgs,

        /// Directory for the extracted files. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        out_dir: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Re-pack replacement stage payloads into a donor DA container.
    ///
    /// Signature slots of replaced stages are zero-filled; the result will not
    /// pass vendor signature verification.
    Merge {
        /// Donor DA container supplying header and region order.
        donor: PathBuf,

        /// Replacement payload for stage 1.
        #[arg(long)]
        da1: Option<PathBuf>,

        /// Replacement payload for stage 2.
        #[arg(long)]
        da2: Option<PathBuf>,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        image: ImageArgs,

        /// Rewrite the header's region table to match the new layout.
        #[arg(long, default_value_t = false)]
        sync_header: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Locate the security engine base address in a raw boot-stage binary.
    Scan {
        /// Path to the binary (e.g. an extracted da2.bin).
        binary: String,

        /// Optional YAML/JSON scan config overriding the built-in constants and limits.
        #[arg(long)]
        config: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_u16_arg(value: &str) -> Result<u16, String> {
    parse_u16(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    daforge_core::logging::init_logging(cli.verbose, cli.log_json);
    tracing::debug!(command = ?cli.command, "parsed arguments");

    match cli.command {
        Command::Info { container, json } => info_command(&container, json)?,
        Command::Extract { container, image, out_dir, json } => {
            extract_command(&container, image.into(), &out_dir, json)?;
        }
        Command::Merge { donor, da1, da2, output, image, sync_header, json } => {
            let request =
                MergeRequest { donor, da1, da2, output, selector: image.into(), sync_header };
            merge_command(&request, json)?;
        }
        Command::Scan { binary, config, json } => {
            scan_command(&binary, config.as_deref(), json)?;
        }
    }

    Ok(())
}
