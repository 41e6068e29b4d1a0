//! midsin CLI entry point.
//!
//! Endpoint-dilution titres from the command line: one assay from flags,
//! a batch CSV file, or the built-in example.

use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use midsin_common::{format_error_human, Error, ErrorReport, OutputFormat, SCHEMA_VERSION};
use midsin_config::{load_settings, load_settings_file, EstimatorSettings, CONFIG_SCHEMA_VERSION};
use midsin_core::assay::AssayInput;
use midsin_core::evaluate::{evaluate, ResultRecord};
use midsin_core::exit_codes::ExitCode;
use midsin_core::log_event;
use midsin_core::logging::{event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage};
use midsin_core::output::{self, Detail, Envelope};
use midsin_core::records::{self, RowFailure};
use midsin_core::schema::{self, SchemaFormat};

#[derive(Parser)]
#[command(name = "midsin")]
#[command(author, version, about = "Endpoint-dilution titres: SIN/mL posterior, Reed-Muench and Spearman-Kärber TCID50")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands.
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Settings file [default: $MIDSIN_CONFIG, then the XDG and system locations]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Log errors only (-qq: nothing)
    #[arg(long, short = 'q', global = true, action = ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,

    /// Log line format [default: jsonl for json/jsonl output, else human]
    #[arg(long, global = true, env = "MIDSIN_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one assay given on the command line
    Evaluate(EvaluateArgs),

    /// Evaluate every assay row of a CSV file
    Batch(BatchArgs),

    /// Evaluate the built-in example assay
    Example(DetailArgs),

    /// Print an input CSV template (always CSV)
    Template(TemplateArgs),

    /// Print JSON schemas of the output types
    Schema(SchemaArgs),

    /// Show or validate estimator settings
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct DetailArgs {
    /// Include the tabulated posterior (grid, pdf, cdf) in JSON output
    #[arg(long)]
    with_posterior: bool,

    /// Include plot data for the posterior and dose-response panels
    #[arg(long)]
    plot_data: bool,
}

impl DetailArgs {
    fn detail(&self) -> Detail {
        Detail {
            posterior: self.with_posterior,
            plots: self.plot_data,
        }
    }
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Assay label
    #[arg(long)]
    label: Option<String>,

    /// Inoculum volume per well, in mL
    #[arg(long)]
    inoculum_volume: f64,

    /// Dilution of the most concentrated column (e.g. 0.01)
    #[arg(long)]
    min_dilution: f64,

    /// Dilution factor between neighbouring columns (e.g. 0.1)
    #[arg(long)]
    dilution_factor: f64,

    /// Wells per column, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    total: Vec<u32>,

    /// Infected wells per column, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    infected: Vec<u32>,

    #[command(flatten)]
    detail: DetailArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Input CSV file, or - for stdin
    input: PathBuf,

    /// Write results here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    #[command(flatten)]
    detail: DetailArgs,
}

#[derive(Args, Debug)]
struct TemplateArgs {
    /// Dilution columns per assay
    #[arg(long, default_value_t = 11, value_parser = clap::value_parser!(u32).range(1..))]
    dilutions: u32,

    /// Wells per dilution
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    replicates: u32,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name (e.g. ResultRecord)
    name: Option<String>,

    /// List the available types
    #[arg(long, conflicts_with_all = ["name", "all"])]
    list: bool,

    /// Print every schema
    #[arg(long, conflicts_with = "name")]
    all: bool,

    /// Compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective settings and where they came from
    Show,

    /// Validate a settings file
    Validate {
        /// Settings file to check
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let cli_level = match (cli.global.quiet, cli.global.verbose) {
        (0, 0) => None,
        (0, v) => Some(LogLevel::from_verbosity(v)),
        (1, _) => Some(LogLevel::Error),
        _ => Some(LogLevel::Off),
    };
    // Machine-readable stdout gets machine-readable stderr unless asked otherwise.
    let cli_format = cli
        .global
        .log_format
        .or_else(|| cli.global.format.is_machine().then_some(LogFormat::Jsonl));
    init_logging(&LogConfig::from_env(cli_level, cli_format));

    let ctx = LogContext::generate();
    let command = command_name(cli.command.as_ref());
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Parse,
        "run started",
        command = command,
        format = tracing::field::display(cli.global.format)
    );

    let result = match &cli.command {
        None => run_example(&cli.global, &ctx, Detail::default()),
        Some(Commands::Example(args)) => run_example(&cli.global, &ctx, args.detail()),
        Some(Commands::Evaluate(args)) => run_evaluate(&cli.global, &ctx, args),
        Some(Commands::Batch(args)) => run_batch(&cli.global, &ctx, args),
        Some(Commands::Template(args)) => run_template(args),
        Some(Commands::Schema(args)) => run_schema(&cli.global, args),
        Some(Commands::Config(args)) => run_config(&cli.global, &ctx, args),
        Some(Commands::Version) => print_version(&cli.global),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => output_error(&cli.global, &err),
    };
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Output,
        "run finished",
        exit_code = exit_code.as_i32()
    );

    std::process::exit(exit_code.as_i32());
}

fn command_name(command: Option<&Commands>) -> &'static str {
    match command {
        None | Some(Commands::Example(_)) => "example",
        Some(Commands::Evaluate(_)) => "evaluate",
        Some(Commands::Batch(_)) => "batch",
        Some(Commands::Template(_)) => "template",
        Some(Commands::Schema(_)) => "schema",
        Some(Commands::Config(_)) => "config",
        Some(Commands::Version) => "version",
    }
}

fn load_estimator_settings(global: &GlobalOpts, ctx: &LogContext) -> Result<EstimatorSettings, Error> {
    let loaded = load_settings(global.config.as_deref())?;
    let path = loaded.path.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_LOADED,
        Stage::Parse,
        "settings loaded",
        source = tracing::field::display(loaded.source),
        path = path.as_str()
    );
    Ok(loaded.settings)
}

fn run_example(global: &GlobalOpts, ctx: &LogContext, detail: Detail) -> Result<ExitCode, Error> {
    let settings = load_estimator_settings(global, ctx)?;
    evaluate_single(global, ctx, "example", records::example_input(), &settings, detail)
}

fn run_evaluate(global: &GlobalOpts, ctx: &LogContext, args: &EvaluateArgs) -> Result<ExitCode, Error> {
    let settings = load_estimator_settings(global, ctx)?;
    let input = AssayInput {
        label: args.label.clone(),
        inoculum_volume: args.inoculum_volume,
        min_dilution: args.min_dilution,
        dilution_factor: args.dilution_factor,
        total_wells: args.total.clone(),
        infected_wells: args.infected.clone(),
    };
    evaluate_single(global, ctx, "evaluate", input, &settings, args.detail.detail())
}

fn evaluate_single(
    global: &GlobalOpts,
    ctx: &LogContext,
    command: &str,
    input: AssayInput,
    settings: &EstimatorSettings,
    detail: Detail,
) -> Result<ExitCode, Error> {
    let record = evaluate(&input, settings)?;
    let records = [record];
    let rendered = match global.format {
        OutputFormat::Csv => {
            csv_string(&records::result_table(std::slice::from_ref(&input), &records, &settings.coverages))?
        }
        _ => render(global.format, &ctx.run_id, command, &records, &[], detail)?,
    };
    write_output(ctx, global.format, None, &rendered)?;
    Ok(ExitCode::Clean)
}

fn run_batch(global: &GlobalOpts, ctx: &LogContext, args: &BatchArgs) -> Result<ExitCode, Error> {
    let settings = load_estimator_settings(global, ctx)?;
    let reader: Box<dyn Read> = if args.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&args.input)?)
    };
    let rows = records::read_rows(reader)?;
    log_event!(
        ctx,
        INFO,
        event_names::RECORDS_PARSED,
        Stage::Parse,
        "input read",
        rows = rows.len()
    );

    let outcome = records::evaluate_rows(&rows, &settings);
    let rendered = match global.format {
        OutputFormat::Csv => csv_string(&outcome.csv_rows)?,
        _ => render(
            global.format,
            &ctx.run_id,
            "batch",
            &outcome.records,
            &outcome.failures,
            args.detail.detail(),
        )?,
    };
    write_output(ctx, global.format, args.output.as_deref(), &rendered)?;

    // Failed rows are already in the JSON envelope.
    if global.format != OutputFormat::Json {
        report_failures(global, &outcome.failures);
    }

    if outcome.is_partial() {
        Ok(ExitCode::PartialFail)
    } else {
        Ok(ExitCode::Clean)
    }
}

fn run_template(args: &TemplateArgs) -> Result<ExitCode, Error> {
    let rows = records::template_rows(args.dilutions as usize, args.replicates);
    records::write_rows(io::stdout().lock(), &rows)?;
    Ok(ExitCode::Clean)
}

fn run_schema(global: &GlobalOpts, args: &SchemaArgs) -> Result<ExitCode, Error> {
    let format = if args.compact {
        SchemaFormat::JsonCompact
    } else {
        SchemaFormat::Json
    };

    let text = if args.all {
        let all = serde_json::to_value(schema::generate_all_schemas())?;
        schema::format_schema(&all, format)?
    } else if let Some(name) = args.name.as_deref() {
        let value = schema::generate_schema(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown schema type: {}", name)))?;
        schema::format_schema(&value, format)?
    } else if global.format.is_machine() {
        let list: Vec<serde_json::Value> = schema::available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        schema::format_schema(&serde_json::Value::from(list), format)?
    } else {
        schema::available_schemas()
            .into_iter()
            .map(|(name, description)| format!("{:<20} {}", name, description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    println!("{}", text);
    Ok(ExitCode::Clean)
}

fn run_config(global: &GlobalOpts, ctx: &LogContext, args: &ConfigArgs) -> Result<ExitCode, Error> {
    match &args.command {
        ConfigCommands::Show => run_config_show(global, ctx),
        ConfigCommands::Validate { path } => run_config_validate(global, ctx, path),
    }
}

/// Display the effective settings (defaults when no file is found).
fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> Result<ExitCode, Error> {
    let loaded = load_settings(global.config.as_deref())?;
    let path = loaded.path.as_ref().map(|p| p.display().to_string());

    if global.format.is_machine() {
        let response = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "run_id": ctx.run_id,
            "source": {
                "kind": loaded.source.to_string(),
                "path": path,
                "using_defaults": loaded.path.is_none(),
            },
            "settings": loaded.settings,
        });
        println!("{}", output::render_json(&response)?);
    } else {
        println!("# Estimator settings");
        println!();
        match &path {
            Some(p) => println!("Source: {} ({})", p, loaded.source),
            None => println!("Source: built-in defaults"),
        }
        println!();
        println!("```json");
        println!("{}", loaded.settings.to_json_pretty());
        println!("```");
    }
    Ok(ExitCode::Clean)
}

fn run_config_validate(global: &GlobalOpts, ctx: &LogContext, path: &Path) -> Result<ExitCode, Error> {
    let settings = load_settings_file(path)?;

    if global.format.is_machine() {
        let response = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "run_id": ctx.run_id,
            "status": "valid",
            "path": path.display().to_string(),
            "settings_schema_version": settings.schema_version,
        });
        println!("{}", output::render_json(&response)?);
    } else {
        println!("{}: valid (schema {})", path.display(), CONFIG_SCHEMA_VERSION);
    }
    Ok(ExitCode::Clean)
}

fn print_version(global: &GlobalOpts) -> Result<ExitCode, Error> {
    if global.format.is_machine() {
        let version_info = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "midsin_version": env!("CARGO_PKG_VERSION"),
            "rust_version": env!("CARGO_PKG_RUST_VERSION"),
        });
        println!("{}", output::render_json(&version_info)?);
    } else {
        println!("midsin {}", env!("CARGO_PKG_VERSION"));
        println!("schema version: {}", SCHEMA_VERSION);
    }
    Ok(ExitCode::Clean)
}

/// Render records in any format except CSV.
fn render(
    format: OutputFormat,
    run_id: &str,
    command: &str,
    records: &[ResultRecord],
    failures: &[RowFailure],
    detail: Detail,
) -> Result<String, Error> {
    let text = match format {
        OutputFormat::Json | OutputFormat::Csv => {
            let values = records
                .iter()
                .map(|r| output::result_value(r, detail))
                .collect::<serde_json::Result<Vec<_>>>()?;
            let envelope = Envelope::new(run_id, command, &values).with_failures(failures);
            let mut text = output::render_json(&envelope)?;
            text.push('\n');
            text
        }
        OutputFormat::Jsonl => {
            let values = records
                .iter()
                .map(|r| output::result_value(r, detail))
                .collect::<serde_json::Result<Vec<_>>>()?;
            output::render_jsonl(&values)?
        }
        OutputFormat::Md => output::render_markdown(records),
        OutputFormat::Summary => output::render_summary(records),
    };
    Ok(text)
}

fn csv_string(rows: &[Vec<String>]) -> Result<String, Error> {
    let mut buf = Vec::new();
    records::write_rows(&mut buf, rows)?;
    String::from_utf8(buf).map_err(|e| Error::Internal(e.to_string()))
}

fn write_output(ctx: &LogContext, format: OutputFormat, path: Option<&Path>, text: &str) -> Result<(), Error> {
    match path {
        Some(p) => {
            let mut file = File::create(p)?;
            file.write_all(text.as_bytes())?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    let destination = path.map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
    log_event!(
        ctx,
        DEBUG,
        event_names::OUTPUT_WRITTEN,
        Stage::Output,
        "output written",
        format = tracing::field::display(format),
        bytes = text.len(),
        destination = destination.as_str()
    );
    Ok(())
}

fn use_color(global: &GlobalOpts) -> bool {
    !global.no_color && io::stderr().is_terminal()
}

/// One stderr line per skipped batch row.
fn report_failures(global: &GlobalOpts, failures: &[RowFailure]) {
    for failure in failures {
        if global.format.is_machine() {
            eprintln!("{}", output::failure_report(failure).to_json());
        } else {
            let label = failure.label.as_deref().filter(|l| !l.is_empty()).unwrap_or("-");
            eprintln!("skipped line {} ({}): {}", failure.line, label, failure.error);
        }
    }
}

/// Print a fatal error in the appropriate format and pick the exit code.
fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    if global.format.is_machine() {
        eprintln!("{}", ErrorReport::from(err).to_json());
    } else {
        eprintln!("{}", format_error_human(err, use_color(global)));
    }
    ExitCode::for_error(err)
}
