use clap::{CommandFactory, Parser};
use dcreg_core::{FslBackend, Pipeline, PipelineArgs, PipelineConfig, PipelineError, ToolLocations};
use std::ffi::OsString;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fewer tokens than this and the run is refused with usage text.
const MIN_ARG_COUNT: usize = 17;

#[derive(Parser, Debug)]
#[command(name = "dcreg")]
#[command(
    about = "Correct T1w/T2w images for fieldmap distortion and register T2w to T1w",
    long_about = None
)]
struct Cli {
    /// Working directory for intermediate files
    #[arg(long = "workingdir", default_value = ".")]
    working_dir: String,
    /// T1w image
    #[arg(long = "t1")]
    t1: String,
    /// Brain-extracted T1w image
    #[arg(long = "t1brain")]
    t1_brain: String,
    /// T2w image (empty or NONE for a T1w-only run)
    #[arg(long = "t2")]
    t2: String,
    /// Brain-extracted T2w image
    #[arg(long = "t2brain")]
    t2_brain: String,
    /// Fieldmap magnitude image
    #[arg(long = "fmapmag")]
    fmap_mag: String,
    /// Fieldmap phase image
    #[arg(long = "fmapphase")]
    fmap_phase: String,
    /// Echo time difference of the fieldmap acquisition (ms)
    #[arg(long = "echodiff")]
    echo_diff: String,
    /// T1w readout sample spacing (s)
    #[arg(long = "t1sampspacing")]
    t1_sample_spacing: String,
    /// T2w readout sample spacing (s)
    #[arg(long = "t2sampspacing")]
    t2_sample_spacing: String,
    /// Unwarp direction: x, y, z, x-, y- or z-
    #[arg(long = "unwarpdir", allow_hyphen_values = true)]
    unwarp_dir: String,
    /// Output corrected T1w image
    #[arg(long = "ot1")]
    out_t1: String,
    /// Output corrected T1w brain image
    #[arg(long = "ot1brain")]
    out_t1_brain: String,
    /// Output T1w distortion-correction warp
    #[arg(long = "ot1warp")]
    out_t1_warp: String,
    /// Output corrected, registered T2w image
    #[arg(long = "ot2")]
    out_t2: String,
    /// Output T2w warp (distortion correction + registration)
    #[arg(long = "ot2warp")]
    out_t2_warp: String,
    /// Gradient distortion coefficients file (optional, NONE to skip)
    #[arg(long = "gdcoeffs", default_value = "")]
    gd_coeffs: String,
}

impl From<Cli> for PipelineArgs {
    fn from(cli: Cli) -> Self {
        PipelineArgs {
            working_dir: Some(cli.working_dir),
            t1: cli.t1,
            t1_brain: cli.t1_brain,
            t2: cli.t2,
            t2_brain: cli.t2_brain,
            fmap_mag: cli.fmap_mag,
            fmap_phase: cli.fmap_phase,
            echo_diff: cli.echo_diff,
            t1_sample_spacing: cli.t1_sample_spacing,
            t2_sample_spacing: cli.t2_sample_spacing,
            unwarp_dir: cli.unwarp_dir,
            out_t1: cli.out_t1,
            out_t1_brain: cli.out_t1_brain,
            out_t1_warp: cli.out_t1_warp,
            out_t2: cli.out_t2,
            out_t2_warp: cli.out_t2_warp,
            gd_coeffs: Some(cli.gd_coeffs),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ArgCount {
    /// Usage was asked for by running with no arguments.
    Empty,
    TooFew,
    Enough,
}

fn check_arg_count(supplied: usize) -> ArgCount {
    match supplied {
        0 => ArgCount::Empty,
        n if n < MIN_ARG_COUNT => ArgCount::TooFew,
        _ => ArgCount::Enough,
    }
}

fn print_usage() {
    let mut command = Cli::command();
    if command.print_help().is_err() {
        eprintln!("Use 'dcreg --help' for usage");
    }
    println!();
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("dcreg=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn run(cli: Cli, raw_args: &[OsString]) -> anyhow::Result<()> {
    let tools = ToolLocations::from_env_values(
        std::env::var("FSLDIR").ok(),
        std::env::var("HCPPIPEDIR_Global").ok(),
    )?;
    let launch_dir = std::env::current_dir()?;
    let invocation = raw_args
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let config = PipelineConfig::from_args(cli.into(), launch_dir, invocation)?;
    let backend = FslBackend::new(tools);
    let summary = Pipeline::new(&config, &backend).run()?;

    for output in &summary.published {
        tracing::info!("wrote {}", output);
    }
    tracing::info!("QA script: {}", summary.qa_script.display());
    Ok(())
}

fn main() -> ExitCode {
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    match check_arg_count(raw_args.len().saturating_sub(1)) {
        ArgCount::Empty => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        ArgCount::TooFew => {
            print_usage();
            return ExitCode::from(1);
        }
        ArgCount::Enough => {}
    }

    let cli = Cli::parse_from(&raw_args);

    dotenvy::dotenv().ok();
    if let Err(e) = init_tracing() {
        eprintln!("Error initialising logging: {}", e);
        return ExitCode::from(1);
    }

    match run(cli, &raw_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
