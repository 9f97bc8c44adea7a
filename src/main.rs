//! Storefront Templates CLI
//!
//! Usage:
//!   storefront-templates [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -r, --root <DIR>     Directory templates are resolved against
//!   -c, --config <FILE>  Engine configuration (TOML format)
//!   -d, --data <FILE>    Component data (JSON object of name -> records)
//!   --check              Report directive diagnostics instead of rendering
//!   -v, --verbose        Log engine decisions to stderr
//!   -h, --help           Print help

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use storefront_templates::{
    ComponentDataRegistry, Dialect, EngineConfig, Script, TemplateEngine,
};

#[derive(Parser)]
#[command(name = "storefront-templates")]
#[command(about = "Render storefront HTML/XML templates against component data")]
struct Cli {
    /// Template path, relative to the template root
    template: PathBuf,

    /// Directory templates are resolved against (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Component data file (JSON object mapping names to records)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Print diagnostics for a rule-script template instead of rendering it
    #[arg(long)]
    check: bool,

    /// Log engine decisions (debug level) to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config = config.with_template_root(root);
    }

    let registry = match &cli.data {
        Some(path) => match ComponentDataRegistry::from_json_file(path) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("Error loading data '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ComponentDataRegistry::new(),
    };

    let engine = TemplateEngine::with_config(config).with_registry(registry);

    if cli.check {
        check(&engine, &cli.template);
        return;
    }

    match engine.render(&cli.template) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check(engine: &TemplateEngine, template: &Path) {
    let source = match engine.source(template) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if Dialect::choose(&source) == Dialect::ComponentLoop {
        println!("{}: component-loop template, nothing to check", template.display());
        return;
    }

    let filename = template.display().to_string();
    let diagnostics = Script::parse(&source).check();
    for diagnostic in &diagnostics {
        eprint!("{}", diagnostic.format(&source, &filename));
    }
    if diagnostics.is_empty() {
        println!("{}: ok", filename);
    } else {
        eprintln!("{}: {} warning(s)", filename, diagnostics.len());
        std::process::exit(1);
    }
}
