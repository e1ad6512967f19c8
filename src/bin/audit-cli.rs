use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "audit-cli")]
#[command(about = "Management CLI for the request audit server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "AUDIT_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status,
    /// Show audit statistics
    Stats,
    /// List audit entries, newest first
    Logs(LogFilter),
    /// List per-client rate limit records
    RateLimits,
    /// Reset the rate limit record for one client
    ClearRateLimit {
        /// Client identifier (usually an IP address)
        client_id: String,
    },
    /// Drop every retained audit entry
    ClearLogs,
}

#[derive(Args)]
struct LogFilter {
    /// Only abnormal requests
    #[arg(long)]
    abnormal_only: bool,
    /// Only rate-limited requests
    #[arg(long)]
    rate_limited_only: bool,
    /// Only entries at or after this time (ms since epoch)
    #[arg(long)]
    since: Option<u64>,
    #[arg(long)]
    client_id: Option<String>,
    #[arg(long)]
    status_code: Option<u16>,
    #[arg(long)]
    method: Option<String>,
    /// Regular expression matched against the path
    #[arg(long)]
    path_pattern: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
}

impl LogFilter {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if self.abnormal_only {
            query.push(("abnormal_only", "true".to_string()));
        }
        if self.rate_limited_only {
            query.push(("rate_limited_only", "true".to_string()));
        }
        if let Some(since) = self.since {
            query.push(("since", since.to_string()));
        }
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.clone()));
        }
        if let Some(status) = self.status_code {
            query.push(("status_code", status.to_string()));
        }
        if let Some(method) = &self.method {
            query.push(("method", method.to_uppercase()));
        }
        if let Some(pattern) = &self.path_pattern {
            query.push(("path_pattern", pattern.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")).send().await?,
        Commands::Stats => client.get(format!("{base}/admin/audit/stats")).send().await?,
        Commands::Logs(filter) => {
            client
                .get(format!("{base}/admin/audit/logs"))
                .query(&filter.to_query())
                .send()
                .await?
        }
        Commands::RateLimits => {
            client
                .get(format!("{base}/admin/audit/rate-limits"))
                .send()
                .await?
        }
        Commands::ClearRateLimit { client_id } => {
            let mut url = reqwest::Url::parse(&format!("{base}/admin/audit/rate-limits/"))?;
            url.path_segments_mut()
                .map_err(|_| "base URL cannot carry a path")?
                .pop_if_empty()
                .push(client_id);
            client.delete(url).send().await?
        }
        Commands::ClearLogs => client.delete(format!("{base}/admin/audit/logs")).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
