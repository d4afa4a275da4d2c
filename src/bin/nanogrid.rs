use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use nanogrid::das::DasClient;
use nanogrid::submit::CrabSubmitter;
use nanogrid::{Era, GridError, JobGenerator, JobTarget, Manifest, Settings};

#[derive(Parser, Debug)]
#[command(name = "nanogrid")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate crab config files for multiple datasets")]
#[command(long_about = None)]
struct Cli {
    /// Choose specific era. If not specified, run on all eras
    #[arg(short, long, value_enum)]
    era: Option<Era>,

    /// Json file(s) with dataset list
    #[arg(short, long, required = true, num_args = 1..)]
    datasets: Vec<PathBuf>,

    /// Site to which to write the output
    #[arg(short, long)]
    site: String,

    /// Folder in which to write the config files
    #[arg(short, long, default_value = "./")]
    output: PathBuf,

    /// CMSSW installation holding the pset files
    #[arg(long, env = "CMSSW_BASE")]
    cmssw_base: PathBuf,

    /// User owning the output area under /store/user
    #[arg(long, env = "USER")]
    user: String,

    /// Settings file (defaults to ~/.nanogrid/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Submit every generated configuration with `crab submit`
    #[arg(long)]
    submit: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Ok(Settings::load(path)?),
        None => match dirs::home_dir() {
            Some(home) => Ok(Settings::load_or_default(home.join(".nanogrid").join("config.toml"))?),
            None => Ok(Settings::default()),
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_ref()).context("Failed to load settings")?;
    let manifest = Manifest::load_all(&cli.datasets)?;
    log::debug!("{} dataset(s) in {} era(s)", manifest.dataset_count(), manifest.eras().len());

    let submitter = if cli.submit { Some(CrabSubmitter::locate()?) } else { None };
    let catalog = DasClient::new(&settings.catalog).context("Failed to set up the DAS client")?;
    let target = JobTarget {
        site: cli.site,
        output_dir: cli.output,
        user: cli.user,
        pset_root: settings.pset_root(&cli.cmssw_base),
    };
    let generator = JobGenerator::new(settings, target, catalog);
    let jobs = generator.run(manifest, cli.era)?;

    println!(
        "{} {} configuration file(s) written",
        "✅".green(),
        jobs.len().to_string().bold()
    );
    if let Some(submitter) = submitter {
        for job in &jobs {
            submitter.submit(&job.path)?;
            println!("{} submitted {}", "🚀".green(), job.request_name);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<GridError>().and_then(GridError::suggestion) {
            eprintln!("  {} {}", "hint:".yellow(), suggestion);
        }
        process::exit(1);
    }
}
