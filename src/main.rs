mod cli;

use crate::cli::{Cli, Commands, RecordsArgs, RenderArgs, SubmitArgs};
use clap::Parser;
use idp_submit::error::Result;
use idp_submit::pipeline;
use idp_submit::scheduler::{DryRun, Sbatch};
use idp_submit::submitter::{SubmissionReport, Submitter};
use log::{debug, error};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);
    debug!("parsed arguments: {:?}", &cli);

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the command-line verbosity.
fn setup_logging(verbosity: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Submit(args) => submit(args),
        Commands::Records(args) => records(args),
        Commands::Render(args) => render(args),
    }
}

fn submit(args: SubmitArgs) -> Result<()> {
    let mut overrides = args.config.overrides();
    overrides.delay_secs = args.delay;
    overrides.failure_policy = args.failure_policy;
    let config = args.config.resolve(overrides)?;
    let report = if args.dry_run {
        pipeline::run(&config, DryRun)?
    } else {
        pipeline::run(&config, Sbatch::with_program(args.sbatch))?
    };
    print_report(&report);
    Ok(())
}

fn print_report(report: &SubmissionReport) {
    for record in &report.records {
        println!("{}\t{}\t{}", record.job, record.script.display(), record.outcome);
    }
    println!(
        "batch {}: {} submitted, {} failed, {} total",
        report.batch_id,
        report.submitted(),
        report.failures().count(),
        report.records.len()
    );
}

fn records(args: RecordsArgs) -> Result<()> {
    let config = args.config.resolve(args.config.overrides())?;
    let table = pipeline::build_table(&config);
    let path = match args.output {
        Some(path) => {
            table.write_csv(&path)?;
            path
        }
        None => pipeline::write_records(&config, &table)?,
    };
    println!("{}", path.display());
    Ok(())
}

fn render(args: RenderArgs) -> Result<()> {
    let config = args.config.resolve(args.config.overrides())?;
    config.plan.validate(&pipeline::build_table(&config))?;
    let submitter = Submitter::new(
        DryRun,
        config.base_dir.clone(),
        config.workflow,
        pipeline::load_template(&config)?,
        config.context.clone(),
    );
    for job in config.plan.jobs(config.workflow, &config.resources) {
        println!("==> {} <==", job.script_name());
        print!("{}", submitter.render(&job)?);
        println!();
    }
    Ok(())
}
