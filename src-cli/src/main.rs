//! VeriCap Command-Line Interface
//!
//! A headless frontend for the identity-verification flow: lists the
//! document catalogs, drives capture sessions against the background
//! service, and renders the verification result, all scriptable via
//! structured exit codes and `--json` output.

mod client;
mod colors;
mod commands;
mod exit_codes;
mod platform;

use clap::{Args, Parser, Subcommand, ValueEnum};

use vericap_common::{CaptureMode, FitMode};

use commands::CaptureOptions;
use exit_codes::ExitCode;

/// VeriCap - Identity Verification CLI
#[derive(Parser, Debug)]
#[command(name = "vericap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalogs (document types, countries)
    List {
        #[command(subcommand)]
        source: ListSource,
    },
    /// Show wizard and capture session state
    Status,
    /// Leave the landing page and start a flow
    Begin,
    /// Choose document type and country
    Select {
        /// Document type id (see 'vericap list types')
        document_type: String,
        /// Country code (see 'vericap list countries')
        country: String,
    },
    /// Capture a document side or a selfie
    Capture {
        /// What to capture
        #[arg(value_enum)]
        target: Target,

        #[command(flatten)]
        options: CaptureArgs,
    },
    /// Save a confirmed still's preview to a file
    Preview {
        /// Which still to preview
        #[arg(value_enum)]
        target: Target,

        /// Output path; prints size info when omitted
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Submit both stills to the verification backend
    Submit,
    /// Show the result of a completed verification
    Result,
    /// Run the whole flow: select, capture both, submit
    Run {
        /// Document type id
        document_type: String,
        /// Country code
        country: String,

        #[command(flatten)]
        options: CaptureArgs,
    },
    /// Abandon the flow and return to the landing page
    Reset,
    /// Ask the background service to exit
    Shutdown,
}

#[derive(Subcommand, Debug)]
enum ListSource {
    /// List accepted document types
    Types,
    /// List supported countries
    Countries,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Target {
    /// Identity document (rectangular guide, rear camera)
    Document,
    /// Self-portrait (circular guide, front camera)
    Selfie,
}

impl From<Target> for CaptureMode {
    fn from(target: Target) -> Self {
        match target {
            Target::Document => CaptureMode::DocumentSide,
            Target::Selfie => CaptureMode::Selfie,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Fit {
    /// Video fills the box, overflow clipped
    Cover,
    /// Video letterboxed inside the box
    Contain,
}

impl From<Fit> for FitMode {
    fn from(fit: Fit) -> Self {
        match fit {
            Fit::Cover => FitMode::Cover,
            Fit::Contain => FitMode::Contain,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct CaptureArgs {
    /// Simulated on-screen video width, display pixels
    #[arg(long, default_value_t = 393.0)]
    width: f64,

    /// Simulated on-screen video height, display pixels
    #[arg(long, default_value_t = 660.0)]
    height: f64,

    /// How the video fits its on-screen box
    #[arg(long, value_enum, default_value = "cover")]
    fit: Fit,

    /// Retake this many times before confirming
    #[arg(long, default_value_t = 0)]
    retakes: u32,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

impl From<CaptureArgs> for CaptureOptions {
    fn from(args: CaptureArgs) -> Self {
        CaptureOptions {
            width: args.width,
            height: args.height,
            fit: args.fit.into(),
            retakes: args.retakes,
            timeout_secs: args.timeout,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code: ExitCode = match cli.command {
        Commands::List { source } => match source {
            ListSource::Types => commands::list_types(cli.json, cli.quiet).await,
            ListSource::Countries => commands::list_countries(cli.json, cli.quiet).await,
        },
        Commands::Status => commands::status(cli.json, cli.quiet).await,
        Commands::Begin => commands::begin(cli.quiet).await,
        Commands::Select {
            document_type,
            country,
        } => commands::select(&document_type, &country, cli.quiet).await,
        Commands::Capture { target, options } => {
            commands::capture(target.into(), &options.into(), cli.quiet).await
        }
        Commands::Preview { target, output } => {
            commands::preview(target.into(), output.as_deref(), cli.quiet).await
        }
        Commands::Submit => commands::submit(cli.json, cli.quiet).await,
        Commands::Result => commands::result(cli.json, cli.quiet).await,
        Commands::Run {
            document_type,
            country,
            options,
        } => {
            commands::run_flow(
                &document_type,
                &country,
                &options.into(),
                cli.json,
                cli.quiet,
            )
            .await
        }
        Commands::Reset => commands::reset(cli.quiet).await,
        Commands::Shutdown => commands::shutdown(cli.quiet).await,
    };

    std::process::exit(code.as_i32());
}
