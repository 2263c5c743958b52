//! tierctl - Command-line client for the tierd daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "tierctl")]
#[command(about = "tierd command execution daemon CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "TIERD_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a shell command to a priority tier
    Submit {
        /// Priority tier (high, medium, low)
        #[arg(short, long, default_value = "high")]
        tier: String,

        /// Command line; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show queue depths and worker counts
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct SubmitResult {
    command_id: String,
    tier: String,
    state: String,
    queue_depth: usize,
}

#[derive(Deserialize, Tabled)]
struct TierRow {
    tier: String,
    queue_depth: usize,
    workers: usize,
    min_workers: usize,
    max_workers: usize,
}

#[derive(Deserialize)]
struct StatsResult {
    tiers: Vec<TierRow>,
    in_flight: usize,
    total_workers: usize,
    global_max_workers: usize,
    uptime_seconds: i64,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit { tier, command } => {
            let params = json!({
                "command": command.join(" "),
                "tier": tier,
            });

            let result = call_rpc(&cli.rpc_url, "cmd.submit.v1", params).await?;
            let submit_result: SubmitResult = serde_json::from_value(result)?;

            println!(
                "{}",
                format!("✓ Command sent to {} queue", submit_result.tier)
                    .green()
                    .bold()
            );
            println!();

            let table = Table::new(vec![submit_result]).to_string();
            println!("{}", table);
        }

        Commands::Status => {
            println!("{}", "Daemon Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(value) => {
                    let stats: StatsResult = serde_json::from_value(value)?;
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!(
                        "  {} {} / {}",
                        "Workers:".bold(),
                        stats.total_workers,
                        stats.global_max_workers
                    );
                    println!(
                        "  {} {} / {}",
                        "Executing:".bold(),
                        stats.in_flight,
                        stats.global_max_workers
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), stats.uptime_seconds);
                    println!();
                    println!("{}", Table::new(stats.tiers));
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
