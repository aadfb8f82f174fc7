use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tokio::time::sleep;
use tracing::debug;

use sfbridge_client::config_manager::{Config, ConfigLoader};
use sfbridge_client::source::SalesforceSession;
use sfbridge_common::constants::{CONFIG_FILE_NAME, PID_FILE, STDERR_FILE, STDOUT_FILE};
use sfbridge_daemon::client::DaemonClient;

use crate::commands::SetupArgs;

pub fn clean_up_after_daemon() -> Result<()> {
    for file in [PID_FILE, STDOUT_FILE, STDERR_FILE] {
        if Path::new(file).exists() {
            std::fs::remove_file(file).with_context(|| format!("Failed to remove {file}"))?;
        }
    }
    Ok(())
}

/// Polls the daemon's /info endpoint until it answers, with backoff.
pub async fn wait(api_client: &DaemonClient) -> Result<()> {
    for n in 0..5 {
        match api_client
            .client
            .get(api_client.get_url("/info"))
            .send()
            .await
        {
            // if timeout, retry
            Err(e) => {
                if !(e.is_timeout() || e.is_connect()) {
                    bail!(e)
                }
            }
            Ok(resp) => {
                if resp.status().is_success() {
                    return Ok(());
                }
                debug!("Got response, retrying: {:?}", resp);
            }
        }

        let duration = 1 << n;
        println!("Starting daemon... ({duration}s elapsed)");
        sleep(std::time::Duration::from_secs(duration)).await;
    }

    bail!("Daemon not started yet")
}

pub async fn print_config_info(api_client: &DaemonClient, config: &Config) -> Result<()> {
    let info = match api_client.send_info_request().await {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!("Error getting info response: {e}");
            println!("\n{}", "sfbridge installed.".bold());
            println!("  Daemon status: {}", "Not running".yellow());
            println!(
                "\n  Run {} to start forwarding events.",
                "sfbridge init".cyan().bold()
            );
            println!(
                "  Configured channel: {} -> topic: {}",
                config.salesforce.channel, config.kafka.topic
            );
            return Ok(());
        }
    };

    println!("\n{}", "=== SFBRIDGE INFO ===".bold());
    println!("  Daemon status:      {}", "Running".green());
    println!("  Event channel:      {}", info.channel);
    println!("  Kafka topic:        {}", info.topic);
    println!("  Sink:               {}", info.sink);
    println!("  Events forwarded:   {}", info.events_forwarded);
    println!("  Events failed:      {}", info.events_failed);
    println!("  Uptime:             {}", info.formatted_runtime());
    println!("  Daemon version:     {}", info.version);

    let clickable_url = format!(
        "\u{1b}]8;;{0}\u{1b}\\{0}\u{1b}]8;;\u{1b}\\",
        config.grafana_workspace_url
    );
    println!(
        "  Grafana dashboard:  {}",
        clickable_url.cyan().underline()
    );

    let config_sources = if config.config_sources.is_empty() {
        vec!["No config file used".to_string()]
    } else {
        config.config_sources.clone()
    };
    println!("  Config sources:     {}", config_sources.join(", "));
    println!("  Log files:          {}", STDOUT_FILE);
    println!("                      {}", STDERR_FILE);

    Ok(())
}

/// Startup fail-fast check without starting the daemon: loads the config and
/// opens a session against the event source.
pub async fn test_source_connection(config: &Config) -> Result<()> {
    let session = SalesforceSession::open(&config.salesforce)
        .await
        .context("Could not authenticate against the event source")?;

    println!(
        "{} Authenticated against {}.",
        "Success:".green(),
        session.endpoint()
    );
    println!(
        "sfbridge will forward {} to topic {}.",
        config.salesforce.channel, config.kafka.topic
    );
    Ok(())
}

pub fn setup_config(args: SetupArgs, explicit_path: Option<&Path>) -> Result<()> {
    let mut config = ConfigLoader::load_unchecked(explicit_path)?;

    if let Some(username) = args.username {
        config.salesforce.username = username;
    }
    if let Some(password) = args.password {
        config.salesforce.password = password;
    }
    if args.security_token.is_some() {
        config.salesforce.security_token = args.security_token;
    }
    if let Some(client_id) = args.client_id {
        config.salesforce.client_id = client_id;
    }
    if let Some(client_secret) = args.client_secret {
        config.salesforce.client_secret = client_secret;
    }
    if let Some(channel) = args.channel {
        config.salesforce.channel = channel;
    }
    if !args.brokers.is_empty() {
        config.kafka.brokers = args.brokers;
    }
    if let Some(topic) = args.topic {
        config.kafka.topic = topic;
    }

    let target = explicit_path
        .map(Path::to_path_buf)
        .or_else(ConfigLoader::user_config_path)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    ConfigLoader::save_config(&config, &target)?;
    println!("Configuration written to {}.", target.display());

    if let Err(e) = config.validate() {
        println!(
            "{} configuration is still incomplete: {e}",
            "Note:".yellow()
        );
    }

    Ok(())
}
