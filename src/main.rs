use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use ocsfrel::config::AnalysisConfig;
use ocsfrel::filter::{self, FilterConfig};
use ocsfrel::report::Summary;
use ocsfrel::{DirectorySource, Loader, NormalizedSchemaModel, Pipeline, erd};

#[derive(Parser)]
#[command(name = "ocsfrel")]
#[command(about = "Derive a normalized relational model from an OCSF schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print schema version and definition counts
    Info {
        #[arg(short, long)]
        schema_path: PathBuf,
    },
    /// Resolve inheritance and classify every field
    Analyze {
        #[command(flatten)]
        opts: AnalyzeOpts,
        /// Print the full model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the model as ERD notation
    Erd {
        #[command(flatten)]
        opts: AnalyzeOpts,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AnalyzeOpts {
    /// OCSF schema repository root
    #[arg(short, long)]
    schema_path: PathBuf,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    table_prefix: Option<String>,
    #[arg(long)]
    table_suffix: Option<String>,
    /// Override a primitive mapping, e.g. `timestamp_t=datetime`
    #[arg(long = "type-override")]
    type_overrides: Vec<String>,
    /// Keep only objects reachable from this object
    #[arg(long)]
    core_object: Option<String>,
    /// Reference hops from the core object
    #[arg(long)]
    max_depth: Option<usize>,
    /// Also keep events that reference kept objects
    #[arg(long)]
    include_events: bool,
}

impl AnalyzeOpts {
    fn config(&self) -> Result<AnalysisConfig, String> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path).map_err(|e| e.to_string())?,
            None => AnalysisConfig::default(),
        };

        if let Some(prefix) = &self.table_prefix {
            config.naming.table_prefix = prefix.clone();
        }
        if let Some(suffix) = &self.table_suffix {
            config.naming.table_suffix = suffix.clone();
        }
        for spec in &self.type_overrides {
            config.set_override(spec).map_err(|e| e.to_string())?;
        }

        if let Some(core) = &self.core_object {
            config.filter = Some(FilterConfig::new(core.clone()));
        }
        if let Some(filter) = config.filter.as_mut() {
            if let Some(depth) = self.max_depth {
                filter.max_depth = depth;
            }
            filter.include_events |= self.include_events;
        }

        Ok(config)
    }

    fn run(&self) -> Result<(AnalysisConfig, NormalizedSchemaModel), String> {
        let config = self.config()?;
        let pipeline = Pipeline::from_config(&config);
        let model = pipeline
            .run(&DirectorySource::new(&self.schema_path))
            .map_err(|e| e.to_string())?;

        let model = match &config.filter {
            Some(filter_config) => {
                let (partial, report) =
                    filter::extract(&model, filter_config).map_err(|e| e.to_string())?;
                tracing::info!(
                    "kept {} objects around {} ({} added for inheritance, {} excluded)",
                    report.object_depths.len(),
                    filter_config.core_object,
                    report.inheritance_additions.len(),
                    report.excluded_objects.len()
                );
                partial
            }
            None => model,
        };

        for warning in model.warnings() {
            eprintln!("warning: {}", warning);
        }
        Ok((config, model))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Info { schema_path } => {
            let corpus = Loader::load(&DirectorySource::new(&schema_path)).map_err(|errors| {
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            print!("{}", Summary::from_corpus(&corpus).render());
        }
        Command::Analyze { opts, json } => {
            let (_, model) = opts.run()?;
            if json {
                println!("{}", model.to_json().map_err(|e| e.to_string())?);
            } else {
                print!("{}", Summary::from_model(&model).render());
            }
        }
        Command::Erd { opts, output } => {
            let (config, model) = opts.run()?;
            let text = erd::render(&model, &config.naming);
            match output {
                Some(path) => fs::write(&path, &text)
                    .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?,
                None => print!("{}", text),
            }
        }
    }
    Ok(())
}
