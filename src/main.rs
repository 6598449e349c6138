use clap::{Parser, Subcommand};
use retouch::batch::{self, Batch, LoadFailure};
use retouch::config::{self, RetouchConfig};
use retouch::imaging::{ImageBackend, ModelGate, RembgCommand, RustBackend};
use retouch::operations::OpContext;
use retouch::output;
use retouch::pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Apply an image editing pipeline to a directory of images")]
#[command(long_about = "\
Apply an image editing pipeline to a directory of images

Every image in the input directory is run through the same ordered list of
operations and written under the same file name to the output directory.

Pipeline file (JSON):

  [
    {\"process\": \"Resize\", \"arg\": {\"height\": 50}},
    {\"process\": \"Flip\", \"arg\": {\"vertical\": true}},
    {\"process\": \"Crop\", \"arg\": {\"is_auto\": true}}
  ]

or TOML, one [[step]] table per operation:

  [[step]]
  process = \"Resize\"
  arg = { height = 50 }

Operations:
  Resize              height, width (integer = pixels, float = rate)
  Flip                vertical, horizontal
  Rotate              rotate (degrees), center_rate [x, y]
  Crop                is_auto, lt_position_rate [x, y], crop_size_rate [w, h]
  Masking             mask (rows of booleans or mask image path), is_positive
  Background_Masking  mode (\"rembg\"), is_positive

Run 'retouch gen-config' to generate a documented retouch.toml.")]
#[command(version)]
struct Cli {
    /// Input directory (overrides paths.input)
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output directory (overrides paths.output)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Config file (default: ./retouch.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail (per-step tracing)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a pipeline to every input image
    Run {
        /// Pipeline descriptor file (.json or .toml)
        #[arg(long)]
        pipeline: PathBuf,
    },
    /// Validate a pipeline file without touching any image
    Check {
        /// Pipeline descriptor file (.json or .toml)
        #[arg(long)]
        pipeline: PathBuf,
    },
    /// List the input images that would be processed
    List,
    /// Print a stock retouch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Run { pipeline } => {
            let config = resolve_config(&cli)?;
            let pipeline = Arc::new(Pipeline::load(pipeline)?);
            output::print_pipeline(&pipeline);
            println!();

            init_thread_pool(&config.processing);
            let backend = RustBackend::new();
            let mut batch = Batch::load(
                &config.paths.input,
                &config.paths.output,
                &config.paths.extensions,
                &backend,
            )?;
            for line in output::format_load_failures(&batch.load_failures) {
                println!("{}", line);
            }

            let remover = RembgCommand::new(
                config.background.command.clone(),
                config.background.model.clone(),
            )
            .with_timeout(config.background.timeout());
            let gate = ModelGate::new(config.processing.max_model_jobs);
            let ctx = OpContext::new(&remover, &gate);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = batch.run(pipeline, &backend, &ctx, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            let reconciliation = batch.reconcile(config.processing.prune_stale)?;
            output::print_run_summary(&report, &reconciliation);

            if report.failed() > 0 || !batch.load_failures.is_empty() {
                let failed = report.failed() + batch.load_failures.len();
                return Err(format!("{failed} image(s) could not be processed").into());
            }
        }
        Command::Check { pipeline } => {
            let pipeline = Pipeline::load(pipeline)?;
            output::print_pipeline(&pipeline);
            println!("==> Pipeline is valid");
        }
        Command::List => {
            let config = resolve_config(&cli)?;
            let backend = RustBackend::new();
            let sources = batch::search(&config.paths.input, &config.paths.extensions)?;

            let mut names = Vec::new();
            let mut failures = Vec::new();
            for path in sources {
                match backend.identify(&path) {
                    Ok(_) => names.push(
                        path.file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                    ),
                    Err(error) => failures.push(LoadFailure { path, error }),
                }
            }
            output::print_listing(&config.paths.input, &names, &failures);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `-v`.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Load config and apply the command-line directory overrides.
fn resolve_config(cli: &Cli) -> Result<RetouchConfig, config::ConfigError> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(input) = &cli.input {
        config.paths.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output = output.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
