use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sfbridge",
    version,
    about = "Forwards Salesforce platform events to a Kafka topic"
)]
pub struct Cli {
    /// Path to a configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bridge daemon
    Init(InitArgs),
    /// Check configuration and event source credentials without starting
    Test,
    /// Show the running daemon's status
    Info,
    /// Stop the running daemon
    Terminate,
    /// Remove files left behind by a previous daemon
    Cleanup,
    /// Write a configuration file with the given connection settings
    Setup(SetupArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Stay in the foreground instead of daemonizing
    #[arg(long)]
    pub no_daemonize: bool,
}

#[derive(Args, Default)]
pub struct SetupArgs {
    /// Salesforce username
    #[arg(long)]
    pub username: Option<String>,

    /// Salesforce password
    #[arg(long)]
    pub password: Option<String>,

    /// Salesforce security token, appended to the password at login
    #[arg(long)]
    pub security_token: Option<String>,

    /// Connected app consumer key
    #[arg(long)]
    pub client_id: Option<String>,

    /// Connected app consumer secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Event channel to subscribe to, e.g. /event/Monitoring_Event__e
    #[arg(long)]
    pub channel: Option<String>,

    /// Kafka broker addresses, comma separated
    #[arg(long, value_delimiter = ',')]
    pub brokers: Vec<String>,

    /// Destination Kafka topic
    #[arg(long)]
    pub topic: Option<String>,
}
