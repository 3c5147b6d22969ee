// vyos-api CLI - run commands on VyOS devices and wait for conditionals

use std::io::{self, Write};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use vyos_api::config::{
    api_config, load_task, resolve_hosts, resolve_key, ConnectionOverrides, RunConfig, TaskOverrides,
    API_KEY_ENV,
};
use vyos_api::executor::ApiClient;
use vyos_api::modules::ApiCommandModule;
use vyos_api::output::errors::VyosError;
use vyos_api::output::{OutputFormat, OutputWriter, PlayRecap, TaskResult};

#[derive(Parser)]
#[command(
    name = "vyos-api",
    about = "Run commands on VyOS devices over the HTTP API and wait for conditions",
    version,
    disable_colored_help = true,
    term_width = 0,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show failures
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    output_format: OutputFormat,
}

#[derive(Subcommand)]
#[command(disable_colored_help = true)]
enum Commands {
    /// Run commands on one or more devices and wait for conditionals
    Run {
        #[command(flatten)]
        task: TaskOverrides,

        #[command(flatten)]
        connection: ConnectionOverrides,

        /// Devices to run against (repeatable or comma-separated)
        #[arg(short = 'H', long = "host", value_delimiter = ',')]
        hosts: Vec<String>,

        /// Maximum parallel devices
        #[arg(long, default_value = "10")]
        forks: usize,
    },

    /// Check commands and compile conditionals without contacting any device
    Validate {
        #[command(flatten)]
        task: TaskOverrides,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            task,
            connection,
            hosts,
            forks,
        } => {
            run_task(task, connection, hosts, forks, cli.verbose, cli.quiet, cli.output_format).await
        }
        Commands::Validate { task } => validate_task(task),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout stays machine-readable
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vyos_api=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn prompt_key() -> Result<String, VyosError> {
    // Prompt on stderr so it appears even with redirected stdout
    eprint!("{}", "API key: ".cyan());
    io::stderr().flush().ok();

    let key = rpassword::read_password().map_err(|e| VyosError::Io {
        message: format!("Failed to read API key: {}", e),
        path: None,
    })?;
    eprintln!();
    Ok(key)
}

async fn run_task(
    task_args: TaskOverrides,
    conn_args: ConnectionOverrides,
    cli_hosts: Vec<String>,
    forks: usize,
    verbose: bool,
    quiet: bool,
    output_format: OutputFormat,
) -> Result<bool, VyosError> {
    let RunConfig {
        task: params,
        hosts: file_hosts,
        connection: file_conn,
    } = load_task(task_args)?;
    let hosts = resolve_hosts(cli_hosts, file_hosts)?;

    // Everything local fails here, before any device is contacted
    let module = ApiCommandModule::prepare(&params)?;
    let env_key = std::env::var(API_KEY_ENV).ok();
    let key = zeroize::Zeroizing::new(resolve_key(&conn_args, &file_conn, env_key, prompt_key)?);

    let output = OutputWriter::new(output_format, verbose, quiet);
    output.print_run_header(module.name(), hosts.len());

    let start = Instant::now();
    let semaphore = Semaphore::new(forks.max(1));

    let module = &module;
    let output = &output;
    let semaphore = &semaphore;
    let key: &str = &key;
    let conn_args = &conn_args;
    let file_conn = &file_conn;

    let futures: Vec<_> = hosts
        .iter()
        .map(|host| async move {
            // The semaphore is never closed
            let _permit = semaphore.acquire().await.ok();

            let result = match ApiClient::new(api_config(host, key, conn_args, file_conn)) {
                Ok(client) => module.run(client).await,
                Err(e) => TaskResult::failed(host.as_str(), module.name(), e.summary()),
            };

            output.print_task_result(&result);
            result
        })
        .collect();

    let results = join_all(futures).await;

    let mut recap = PlayRecap::new();
    for result in &results {
        recap.record(result);
    }
    recap.total_duration = start.elapsed();
    output.print_recap(&recap);

    Ok(!recap.has_failures())
}

fn validate_task(task_args: TaskOverrides) -> Result<bool, VyosError> {
    let RunConfig { task, .. } = load_task(task_args)?;
    let module = ApiCommandModule::prepare(&task)?;

    for warning in module.warnings() {
        println!("{} {}", "[WARNING]".yellow(), warning);
    }

    println!(
        "{} {}: {} command(s), {} conditional(s), match {}",
        "OK".green().bold(),
        module.name(),
        module.batch().len(),
        module.conditionals().len(),
        module.config().match_policy
    );

    for cond in module.conditionals() {
        println!("  {} {}", "wait_for".dimmed(), cond);
    }

    Ok(true)
}
