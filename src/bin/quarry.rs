//! Binary entry point for the quarry predicate compiler CLI.
#![forbid(unsafe_code)]

#[path = "quarry/ui.rs"]
mod ui;

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use quarry::{
    catalog::{FixedTenant, InMemoryCatalog},
    config::{default_config_path, CompilerOptions},
    logging::init_logging,
    query::{
        explain::{explain, explain_to_value, render_text},
        Collaborators, CompileError, CompileErrorWithCode, CompiledQuery, Query, QueryCompiler,
    },
};
use ui::{Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Compiles repository query predicates into join plans and filter fragments",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Compiler config file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        conflicts_with = "config",
        help = "Named option preset (default, legacy, benchmark, strict)"
    )]
    preset: Option<String>,

    #[arg(
        long,
        global = true,
        env = "QUARRY_LOG",
        default_value = "warn",
        help = "Tracing filter directive"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Theme::Auto,
        help = "Colour theme for text output"
    )]
    theme: Theme,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long, value_name = "FILE", help = "TOML catalog fixture")]
    catalog: PathBuf,

    #[arg(long, value_name = "FILE", help = "JSON query, '-' for stdin")]
    query: PathBuf,

    #[arg(long, help = "Tenant domain for unqualified object references")]
    tenant: Option<String>,

    #[arg(long, help = "Store booleans, floats and doubles as text")]
    legacy_layout: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a query and print joins and fragments.
    Compile(QueryArgs),
    /// Compile a query and print its explain tree.
    Explain {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, help = "Hide literal values")]
        redact: bool,
    },
    /// Write the active options to a config file.
    InitConfig {
        #[arg(long, value_name = "FILE", help = "Target path (defaults to the user config dir)")]
        path: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            if let Some(compile) = err.downcast_ref::<CompileError>() {
                eprintln!("invalid query: {}", CompileErrorWithCode(compile));
                std::process::exit(2);
            }
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let ui = Ui::new(cli.theme);
    let options = match &cli.preset {
        Some(name) => CompilerOptions::preset(name)?,
        None => CompilerOptions::load(cli.config.as_deref())?,
    };

    match cli.command {
        Command::Compile(args) => {
            let compiled = compile(&args, options)?;
            emit(cli.format, &compiled, || print_compiled_text(&ui, &compiled))?;
        }
        Command::Explain { query, redact } => {
            let compiled = compile(&query, options)?;
            let plan = explain(&compiled);
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&explain_to_value(&plan, redact))?)
                }
                OutputFormat::Text => print!("{}", render_text(&plan, redact)),
            }
        }
        Command::InitConfig { path } => {
            let target = path
                .or_else(default_config_path)
                .ok_or("no config directory found; pass --path")?;
            options.persist(&target)?;
            ui.success(&format!("wrote {}", target.display()));
        }
    }
    Ok(())
}

fn compile(args: &QueryArgs, options: CompilerOptions) -> Result<CompiledQuery, Box<dyn Error>> {
    let fixture = fs::read_to_string(&args.catalog)
        .map_err(|e| format!("failed to read catalog {}: {e}", args.catalog.display()))?;
    let catalog = Arc::new(InMemoryCatalog::from_toml_str(&fixture)?);
    let mut query: Query = serde_json::from_str(&read_query(&args.query)?)?;
    if args.legacy_layout {
        query.support_boolean_float_double = Some(false);
    }
    let mut collaborators = Collaborators::from_catalog(catalog);
    if let Some(tenant) = &args.tenant {
        collaborators = collaborators.with_tenant(Arc::new(FixedTenant(Some(tenant.clone()))));
    }
    let compiler = QueryCompiler::open(collaborators, options)?;
    Ok(compiler.compile(&query)?)
}

fn read_query(path: &Path) -> Result<String, Box<dyn Error>> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path)
        .map_err(|e| format!("failed to read query {}: {e}", path.display()).into())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_compiled_text(ui: &Ui, compiled: &CompiledQuery) {
    let selectors: Vec<&str> = compiled.selectors.iter().map(|s| s.0.as_str()).collect();
    ui.section(
        "Plan",
        [
            ("plan_hash", format!("{:016x}", compiled.plan_hash)),
            ("selectors", selectors.join(", ")),
        ],
    );
    ui.list(
        "Joins",
        compiled
            .single_joins
            .iter()
            .chain(&compiled.multi_joins)
            .map(|join| {
                let selector = join.key.selector.as_ref().map_or("-", |s| s.0.as_str());
                format!(
                    "{:<24} {selector} {} {} ({:?})",
                    join.alias,
                    join.key.kind.label(),
                    join.key.qname,
                    join.cardinality
                )
            }),
    );
    ui.list(
        "Fragments",
        compiled
            .fragments
            .iter()
            .zip(&compiled.strategies)
            .map(|(fragment, strategy)| format!("{fragment}  [{strategy}]")),
    );
}
