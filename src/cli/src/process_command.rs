use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use daemonize::{Daemonize, Outcome};

use sfbridge_client::config_manager::ConfigLoader;
use sfbridge_common::constants::{PID_FILE, STDERR_FILE, STDOUT_FILE, WORKING_DIR};
use sfbridge_daemon::client::DaemonClient;
use sfbridge_daemon::daemon::run;

use crate::commands::{Cli, Commands};
use crate::logging::setup_logging;
use crate::nondaemon_commands::{
    clean_up_after_daemon, print_config_info, setup_config, test_source_connection, wait,
};

pub fn start_daemon() -> Result<Outcome<()>> {
    std::fs::create_dir_all(WORKING_DIR).context("Failed to create working directory")?;

    let daemon = Daemonize::new();
    Ok(daemon
        .pid_file(PID_FILE)
        .working_directory(WORKING_DIR)
        .stdout(File::create(STDOUT_FILE).context("Failed to create stdout file")?)
        .stderr(File::create(STDERR_FILE).context("Failed to create stderr file")?)
        .umask(0o002)
        .execute())
}

pub fn process_cli() -> Result<()> {
    // has to be sync due to daemonizing
    let cli = Cli::parse();
    let explicit_config = cli.config.as_deref().map(Path::new);

    // Setup and cleanup must work before a valid config exists.
    match cli.command {
        Commands::Setup(args) => return setup_config(args, explicit_config),
        Commands::Cleanup => {
            clean_up_after_daemon()?;
            println!("Daemon files cleaned up successfully.");
            return Ok(());
        }
        _ => {}
    }

    let config = ConfigLoader::load_config(explicit_config)?;

    let _sentry_guard = (!cfg!(test)).then(|| {
        config.sentry_dsn.as_deref().map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        })
    });

    let api_client = DaemonClient::new(format!("http://{}", config.server));

    match cli.command {
        Commands::Init(args) => {
            println!("Starting bridge daemon...");

            if !args.no_daemonize {
                match start_daemon()? {
                    Outcome::Parent(Ok(_)) => {
                        tokio::runtime::Runtime::new()?.block_on(async {
                            wait(&api_client).await?;
                            print_config_info(&api_client, &config).await
                        })?;
                        println!("Daemon started successfully.");
                        return Ok(());
                    }
                    Outcome::Parent(Err(e)) => {
                        println!("Failed to start daemon. Maybe the daemon is already running? If it's not, run `sfbridge cleanup` to remove the previous daemon files.");
                        println!("{:}", e);
                        return Ok(());
                    }
                    Outcome::Child(Err(e)) => {
                        anyhow::bail!(e);
                    }
                    Outcome::Child(Ok(_)) => {}
                }
            }

            let _log_guard = setup_logging(args.no_daemonize)?;
            run(config)?;
            if !args.no_daemonize {
                clean_up_after_daemon()?;
            }
            Ok(())
        }
        Commands::Test => {
            tokio::runtime::Runtime::new()?.block_on(test_source_connection(&config))
        }
        Commands::Info => {
            tokio::runtime::Runtime::new()?.block_on(print_config_info(&api_client, &config))
        }
        Commands::Terminate => tokio::runtime::Runtime::new()?.block_on(async {
            api_client
                .send_terminate_request()
                .await
                .context("Failed to reach the daemon. Maybe it is not running?")?;
            println!("Terminate request sent.");
            Ok(())
        }),
        Commands::Setup(_) | Commands::Cleanup => unreachable!("handled above"),
    }
}
