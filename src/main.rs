use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docquery::checks::{run_checks, Report};
use docquery::config::Config;
use docquery::document::parser::{decode_module_output, dump_documents, load_documents};
use docquery::document::Document;
use docquery::file::loader::{read_captured_file, read_captured_stdin};
use docquery::query::{select_exactly, select_many, Condition, FieldPath};
use docquery::runner::capture;

/// docquery - query and validate generated cluster configuration
#[derive(Parser)]
#[command(name = "docquery")]
#[command(version)]
#[command(about = "Query and validate multi-document YAML emitted by config generators", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/docquery/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate captured generator output
    Check {
        /// Captured output (omit or use '-' to read stdin)
        file: Option<PathBuf>,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: ReportArgs,
    },
    /// Print documents matching a query
    Select {
        /// Captured output (omit or use '-' to read stdin)
        file: Option<PathBuf>,

        /// Condition such as "kind == epiphany-cluster" or "kind ^= configuration/"
        #[arg(short, long)]
        query: String,

        /// Require exactly this many matches
        #[arg(short, long)]
        exactly: Option<usize>,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Run a generator command, then validate its stdout
    Run {
        /// Seconds to wait before killing the command (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: ReportArgs,

        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// Input is already the document stream, not wrapped generator output
    #[arg(long)]
    documents: bool,

    /// Path of the embedded document stream (default from config)
    #[arg(long)]
    embedded_path: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Evaluate every check even after a failure
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    init_tracing(&config);

    match cli.command {
        Command::Check {
            file,
            input,
            output,
        } => {
            let raw = read_input(file.as_ref())?;
            let documents = decode(&raw, &input, &config)?;
            report(&documents, &output, &config)
        }
        Command::Select {
            file,
            query,
            exactly,
            input,
        } => {
            let condition = Condition::parse(&query).context("Invalid query")?;
            let raw = read_input(file.as_ref())?;
            let documents = decode(&raw, &input, &config)?;
            let selected = match exactly {
                Some(n) => select_exactly(&documents, &condition, n)?,
                None => select_many(&documents, &condition),
            };
            let encoded = dump_documents(selected)?;
            io::stdout().write_all(encoded.as_bytes())?;
            Ok(())
        }
        Command::Run {
            timeout,
            input,
            output,
            command,
        } => {
            let (program, args) = command
                .split_first()
                .context("No command given to run")?;
            let timeout = timeout
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| config.timeout());
            let captured = capture(program, args, timeout)?;
            io::stderr().write_all(captured.stderr.as_bytes())?;
            let documents = decode(&captured.stdout, &input, &config)
                .with_context(|| format!("Failed to decode output of `{}`", program))?;
            report(&documents, &output, &config)
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("DOCQUERY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => read_captured_file(path),
        _ => read_captured_stdin(),
    }
}

fn decode(raw: &str, input: &InputArgs, config: &Config) -> Result<Vec<Document>> {
    if input.documents {
        return Ok(load_documents(raw, "input")?);
    }
    let path = match &input.embedded_path {
        Some(path) => FieldPath::parse(path).context("Invalid --embedded-path")?,
        None => config
            .embedded_field_path()
            .context("Invalid embedded_path in config")?,
    };
    Ok(decode_module_output(raw, &path)?)
}

fn report(documents: &[Document], args: &ReportArgs, config: &Config) -> Result<()> {
    let mut settings = config.settings();
    if args.keep_going {
        settings.fail_fast = false;
    }

    let report: Report = run_checks(documents, &settings);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} checks did not pass", failed, report.outcomes().len());
    }
    Ok(())
}
