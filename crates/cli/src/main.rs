mod config_commands;
mod invoke_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    unfurler_config::UnfurlerConfig,
};

#[derive(Parser)]
#[command(name = "unfurler", about = "Unfurler: VersionOne link previews for Slack")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "UNFURLER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default when no subcommand is provided).
    Serve {
        /// Address to bind to (overrides config value).
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config value).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one HTTP-event JSON document through the dispatcher.
    Dispatch {
        /// Event file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run one queue delivery through the worker.
    Consume {
        #[arg(long, value_enum)]
        format: invoke_commands::DeliveryFormat,
        /// Trigger event id for Pub/Sub background deliveries.
        #[arg(long)]
        event_id: Option<String>,
        /// Delivery file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Unfurl a single link directly.
    Unfurl {
        link: String,
        #[arg(long)]
        ts: String,
        #[arg(long)]
        channel: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load configuration from `--config` or the standard locations, with
/// environment overrides applied.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<UnfurlerConfig> {
    match path {
        Some(path) => {
            let config = unfurler_config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?;
            Ok(unfurler_config::apply_env_overrides(config))
        },
        None => Ok(unfurler_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "unfurler starting");

    match cli.command {
        None => {
            let config = load_config(cli.config.as_ref())?;
            serve(config, None, None).await
        },
        Some(Commands::Serve { bind, port }) => {
            let config = load_config(cli.config.as_ref())?;
            serve(config, bind, port).await
        },
        Some(Commands::Dispatch { input }) => {
            let config = load_config(cli.config.as_ref())?;
            invoke_commands::dispatch(&config, input.as_deref()).await
        },
        Some(Commands::Consume {
            format,
            event_id,
            input,
        }) => {
            let config = load_config(cli.config.as_ref())?;
            invoke_commands::consume(&config, format, event_id.as_deref(), input.as_deref()).await
        },
        Some(Commands::Unfurl { link, ts, channel }) => {
            let config = load_config(cli.config.as_ref())?;
            invoke_commands::unfurl(&config, link, ts, channel).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}

async fn serve(
    mut config: UnfurlerConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    // CLI args override config values
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let result = unfurler_config::validate(&config);
    config_commands::log_diagnostics(&result);
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `unfurler config check`",
            result.count(unfurler_config::Severity::Error)
        );
    }

    unfurler_gateway::start_gateway(config).await
}
