//! weather-mcp - tool server, gateway, and dev token CLI.
//!
//! - `serve`: weather tools over HTTP behind bearer auth
//! - `gateway`: REST-style weather endpoints calling the tool server
//! - `token`: mint an HS256 token for local testing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use weather_mcp::auth::mint_token;
use weather_mcp::client::GatewayServer;
use weather_mcp::server::HttpServer;
use weather_mcp::Config;

#[derive(Debug, Parser)]
#[command(name = "weather-mcp", version, about = "Mock weather tools over HTTP")]
struct Cli {
    /// JSON configuration file; environment variables override it.
    #[arg(long, global = true, env = "WEATHER_MCP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the tool server.
    Serve,
    /// Run the gateway.
    Gateway,
    /// Print a signed bearer token.
    Token {
        #[arg(long)]
        subject: String,
        /// Role claim to include; repeatable. Defaults to the required claim.
        #[arg(long = "role")]
        roles: Vec<String>,
        #[arg(long, default_value = "1h", value_parser = parse_duration)]
        ttl: Duration,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    weather_mcp::observability::init_tracing(&config.observability);

    match cli.command {
        Command::Serve => {
            let server = HttpServer::from_config(&config)?;
            cancel_on_ctrl_c(server.cancellation_token());
            server.serve().await?;
        }
        Command::Gateway => {
            let gateway = GatewayServer::from_config(&config)?;
            cancel_on_ctrl_c(gateway.cancellation_token());
            gateway.serve().await?;
        }
        Command::Token {
            subject,
            roles,
            ttl,
        } => {
            config.validate_auth()?;
            let roles = if roles.is_empty() {
                vec![config.auth.required_claim.clone()]
            } else {
                roles
            };
            println!("{}", mint_token(&config.auth, &subject, &roles, ttl)?);
        }
    }

    Ok(())
}
