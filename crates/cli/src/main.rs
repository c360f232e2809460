use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linebot")]
#[command(about = "LINE bot that answers text messages with Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server (default when no subcommand is given). Secrets come from LINE_CHANNEL_ACCESS_TOKEN, LINE_CHANNEL_SECRET and GEMINI_API_KEY, or the config file.
    Serve {
        /// Config file path (default: LINEBOT_CONFIG_PATH; environment only when unset)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from PORT, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Resolve the configuration and report what the server would use, without secrets.
    Check {
        /// Config file path (default: LINEBOT_CONFIG_PATH; environment only when unset)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("linebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Check { config }) => {
            if let Err(e) = run_check(config) {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("server failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_serve(None, None).await {
                log::error!("server failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_settings(config_path: Option<PathBuf>) -> anyhow::Result<lib::config::Settings> {
    let (config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = &path {
        log::debug!("loaded config from {}", p.display());
    }
    Ok(lib::config::Settings::from_config(&config)?)
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut settings = load_settings(config_path)?;
    if let Some(p) = port {
        settings.port = p;
    }
    log::info!("starting server on {}", settings.bind_addr());
    lib::gateway::run_gateway(settings).await
}

fn run_check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    println!("listen: {}", settings.bind_addr());
    println!("gemini model: {}", settings.gemini_model);
    println!(
        "line api: {}",
        settings.line_api_base.as_deref().unwrap_or("https://api.line.me")
    );
    println!("credentials: ok");
    Ok(())
}
