use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "celo-mcp-cli")]
#[command(about = "Query the celo-mcp admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "CELO_MCP_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status and uptime
    Status,
    /// Session counts per namespace
    Sessions {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            if let Some(json) = read_response(res).await? {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Commands::Sessions { json } => {
            let res = client
                .get(format!("{}/admin/sessions", cli.url))
                .headers(headers)
                .send()
                .await?;
            if let Some(body) = read_response(res).await? {
                if json {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    print_sessions(&body);
                }
            }
        }
    }

    Ok(())
}

async fn read_response(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }

    Ok(Some(res.json().await?))
}

fn print_sessions(body: &Value) {
    println!("{:<12} {:>8} {:>8} {:>8} {:>8}", "NAMESPACE", "TTL", "ACTIVE", "ARMED", "EXPIRED");
    for ns in body.as_array().into_iter().flatten() {
        println!(
            "{:<12} {:>7}s {:>8} {:>8} {:>8}",
            ns["namespace"].as_str().unwrap_or("?"),
            ns["ttl_secs"].as_u64().unwrap_or(0),
            ns["active"].as_u64().unwrap_or(0),
            ns["armed"].as_u64().unwrap_or(0),
            ns["expired"].as_u64().unwrap_or(0),
        );
    }
}
