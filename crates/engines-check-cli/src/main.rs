use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engines_check_app::{run_check, write_atomic, CheckOutput, Mode, RunOptions};
use engines_check_types::{EngineMap, Outcome, ReceiptEnvelope, Wanted};

const DEFAULT_DEBUG_LOG: &str = "artifacts/engines-check/raw.log";

#[derive(Parser, Debug)]
#[command(
    name = "engines-check",
    version,
    about = "Check the running node/npm against package.json `engines` ranges"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print `true` when every declared engine is satisfied, `false` otherwise.
    #[command(
        after_help = "EXAMPLES:\n    engines-check check\n    engines-check check --root ./app --detail\n    engines-check check --engines '{\"node\":\">=18\"}' --known node=20.11.0"
    )]
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Print the detailed JSON report instead of a boolean
        #[arg(long)]
        detail: bool,
    },

    /// Print the detailed JSON report.
    Detail {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Fail with a readable message when any engine is unsatisfied.
    #[command(after_help = "EXAMPLES:\n    engines-check assert\n    engines-check assert --root ./app --md comment.md")]
    Assert {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Render markdown from an existing receipt.
    #[command(after_help = "EXAMPLES:\n    engines-check md path/to/report.json\n    engines-check md path/to/report.json --out comment.md")]
    Md {
        /// Path to the receipt JSON
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Output markdown file path
        #[arg(long, default_value = "artifacts/engines-check/comment.md")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Directory to search upward from for package.json
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Expectations as JSON: an engines object, a manifest-shaped object
    /// or a string naming a directory to search from
    #[arg(long, value_name = "JSON")]
    engines: Option<String>,

    /// Known actual version, skips probing for that engine (repeatable)
    #[arg(long, value_name = "NAME=VERSION", value_parser = parse_known)]
    known: Vec<(String, String)>,

    /// Optional engines-check.toml path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Receipt output path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Optional markdown output path
    #[arg(long)]
    md: Option<PathBuf>,

    /// Enable debug logging (writes to artifacts/engines-check/raw.log by default).
    /// The log is a side artifact and never changes the result.
    #[arg(long)]
    debug: bool,

    /// Custom debug log file path (implies --debug).
    #[arg(long, env = "ENGINES_CHECK_DEBUG_LOG")]
    log_file: Option<PathBuf>,
}

fn parse_known(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, version)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), version.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VERSION, got {:?}", s)),
    }
}

impl InputArgs {
    fn wanted(&self) -> anyhow::Result<Wanted> {
        let Some(raw) = &self.engines else {
            return Ok(Wanted::DefaultCwd);
        };
        let value: serde_json::Value = serde_json::from_str(raw).context("parse --engines JSON")?;
        Ok(Wanted::from_json(&value)?)
    }

    fn run_options(&self, detail: bool) -> anyhow::Result<RunOptions> {
        let debug_log_path = match &self.log_file {
            Some(path) => Some(path.clone()),
            None if self.debug => Some(PathBuf::from(DEFAULT_DEBUG_LOG)),
            None => None,
        };

        Ok(RunOptions {
            wanted: self.wanted()?,
            known: self.known.iter().cloned().collect::<EngineMap>(),
            config_path: self.config.clone(),
            detail,
            debug_log_path,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (input, mode, detail) = match cli.cmd {
        Command::Check { input, detail } => (input, Mode::Check, detail),
        Command::Detail { input } => (input, Mode::Detail, true),
        Command::Assert { input } => (input, Mode::Assert, true),
        Command::Md { report, out } => {
            let bytes = fs::read(&report).with_context(|| format!("read {}", report.display()))?;
            let receipt: ReceiptEnvelope =
                serde_json::from_slice(&bytes).context("parse receipt JSON")?;
            let md = engines_check_render::render_markdown(&receipt);
            write_atomic(&out, md.as_bytes())?;
            return Ok(());
        }
    };

    let result = input
        .run_options(detail)
        .and_then(|options| run_check(&input.root, mode, options))
        .context("run engines-check");

    match result {
        Ok(output) => {
            emit(&input, &output)?;
            std::process::exit(output.exit_code);
        }
        Err(err) => {
            eprintln!("engines-check: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn emit(input: &InputArgs, output: &CheckOutput) -> anyhow::Result<()> {
    if let Some(out) = &input.out {
        let json = serde_json::to_vec_pretty(&output.receipt)?;
        write_atomic(out, &json)?;
    }
    if let Some(md_path) = &input.md {
        write_atomic(md_path, output.markdown.as_bytes())?;
    }

    match (&output.failure, &output.outcome) {
        (Some(message), _) => eprint!("{}", message),
        (None, Outcome::Summary(ok)) => println!("{}", ok),
        (None, Outcome::Detailed(report)) => println!("{}", serde_json::to_string_pretty(report)?),
    }

    eprintln!(
        "engines-check: {}",
        engines_check_render::render_summary(&output.receipt.report)
    );
    Ok(())
}
