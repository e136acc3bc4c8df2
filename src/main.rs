use clap::{Parser, Subcommand};
use scad_batch::execute::{self, BuildContext};
use scad_batch::render::{self, OpenScadRenderer};
use scad_batch::{config, logging, output, paths, scan};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scad-batch")]
#[command(about = "Render a directory of OpenSCAD models in parallel")]
#[command(long_about = "\
Render a directory of OpenSCAD models in parallel

Every .scad file at the top level of SOURCE is rendered to
DESTINATION/out/<name>.stl by the OpenSCAD command-line binary. A file can
ask for more through a directive block:

  //PARALLEL-PROPS
  AVAILABLE_MODES=3;   # render <name>_0 .. <name>_2 with -D EXPORT_MODE=<i>
  RENDER_WITH=50;      # render a copy with every $fn line set to $fn=50;
  TEST_MODE=0;         # pass -D TEST_MODE=0
  //END-PARALLEL-PROPS

Renderer lookup (first found wins):
  --openscad PATH, then $OPENSCAD, then the platform's default install
  location, then `openscad` on PATH.

Run 'scad-batch gen-config' to generate a documented scad-batch.toml.")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Directory containing the source models
    source: PathBuf,

    /// Directory in which `out/` is created
    destination: PathBuf,

    /// Path to the OpenSCAD executable
    #[arg(long, env = "OPENSCAD")]
    openscad: Option<PathBuf>,

    /// Remove an existing `out/` directory without asking
    #[arg(long)]
    force: bool,

    /// Max parallel renders (capped at the number of CPU cores)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Render every model of SOURCE into DESTINATION/out
    Build(BuildArgs),
    /// List the renders a build would run, without running them
    Plan {
        /// Directory containing the source models
        source: PathBuf,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock scad-batch.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Command::Build(args) => build(args),
        Command::Plan { source, json } => plan(source, json),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build(args: BuildArgs) -> Result<ExitCode, Box<dyn Error>> {
    paths::check_dir("Source", &args.source)?;
    paths::check_writable_dir("Destination", &args.destination)?;

    let mut build_config = config::load_config(&args.source)?;
    if let Some(jobs) = args.jobs {
        build_config.processing.max_processes = Some(jobs);
        build_config.validate()?;
    }

    let executable = render::resolve_executable(args.openscad.as_deref())?;
    tracing::info!(executable = %executable.display(), "using renderer");
    let renderer = OpenScadRenderer::new(executable);

    let ctx = BuildContext::new(&args.source, &args.destination, build_config);
    if ctx.output_dir.exists() && !args.force {
        let confirmed =
            paths::confirm_removal(&ctx.output_dir, std::io::stdin().lock(), std::io::stdout())?;
        if !confirmed {
            eprintln!("Aborted: {} left untouched", ctx.output_dir.display());
            return Ok(ExitCode::FAILURE);
        }
    }
    paths::reset_dir(&ctx.output_dir)?;

    let scan = scan::scan(&ctx.source_dir, &ctx.config.render)?;

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = execute::run_build(&ctx, scan, &renderer, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let report = result?;

    output::print_report(&report);
    println!("==> Output: {}", ctx.output_dir.display());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn plan(source: PathBuf, json: bool) -> Result<ExitCode, Box<dyn Error>> {
    paths::check_dir("Source", &source)?;
    let build_config = config::load_config(&source)?;
    let scan = scan::scan(&source, &build_config.render)?;

    if json {
        println!("{}", output::format_plan_json(&scan, &build_config.render)?);
    } else {
        output::print_plan(&scan, &build_config.render);
    }

    Ok(if scan.rejected.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
