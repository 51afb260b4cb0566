use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the game gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gateway's aggregated health report
    Status,
    /// List registered instances with their health and breaker state
    Services,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/status", cli.url)).send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }
    let report: Value = res.json().await?;

    match cli.command {
        Commands::Status => println!("{}", serde_json::to_string_pretty(&report)?),
        Commands::Services => print_services(&report),
    }
    Ok(())
}

fn print_services(report: &Value) {
    println!(
        "{:<20} {:<24} {:<22} {:<6} {:<10}",
        "SERVICE", "INSTANCE", "ENDPOINT", "STATUS", "BREAKER"
    );
    let details = report["serviceDetails"].as_array().map(Vec::as_slice).unwrap_or_default();
    for instance in details {
        let endpoint = format!(
            "{}:{}",
            instance["address"].as_str().unwrap_or("?"),
            instance["port"].as_u64().unwrap_or(0)
        );
        println!(
            "{:<20} {:<24} {:<22} {:<6} {:<10}",
            instance["name"].as_str().unwrap_or("?"),
            instance["instanceId"].as_str().unwrap_or("?"),
            endpoint,
            instance["status"].as_str().unwrap_or("?"),
            instance["breaker"].as_str().unwrap_or("?"),
        );
    }
    println!(
        "\n{} of {} instances operational",
        report["operationalServices"].as_u64().unwrap_or(0),
        report["totalServices"].as_u64().unwrap_or(0)
    );
}
