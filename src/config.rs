use clap::Parser;
use url::Url;

/// Oracle Sentinel terminal monitor
#[derive(Parser, Debug, Clone)]
#[command(name = "sentinel-monitor", version, about)]
pub struct Config {
    /// Sentinel API base URL
    #[arg(long, env = "SENTINEL_API_URL", default_value = "http://127.0.0.1:8099")]
    pub api_url: String,

    /// Dashboard snapshot polling interval in seconds
    #[arg(long, env = "DASHBOARD_POLL_SECS", default_value = "30")]
    pub dashboard_poll_secs: u64,

    /// Whale feed polling interval in seconds
    #[arg(long, env = "WHALE_POLL_SECS", default_value = "60")]
    pub whale_poll_secs: u64,

    /// Delay between log stream reconnect attempts in seconds
    #[arg(long, env = "LOG_RECONNECT_SECS", default_value = "5")]
    pub log_reconnect_secs: u64,

    /// Maximum log lines kept in the stream buffer
    #[arg(long, env = "LOG_BUFFER_CAP", default_value = "500")]
    pub log_buffer_cap: usize,

    /// Minimum whale trade notional to track (USD)
    #[arg(long, env = "WHALE_MIN_TRADE_USD", default_value = "5000.0")]
    pub whale_min_trade_usd: f64,

    /// Days to keep whale trades before pruning
    #[arg(long, env = "WHALE_RETENTION_DAYS", default_value = "7")]
    pub whale_retention_days: i64,

    /// Interval between console summaries in seconds
    #[arg(long, env = "SUMMARY_INTERVAL_SECS", default_value = "30")]
    pub summary_interval_secs: u64,

    /// Per-request HTTP timeout in seconds (the log stream is exempt)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// Print the detail view for one prediction and exit
    #[arg(long)]
    pub prediction: Option<i64>,

    /// Send one question to the AI analyst and exit
    #[arg(long)]
    pub ask: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("api_url is not a valid URL: {}", e))?;
        if self.dashboard_poll_secs == 0 {
            anyhow::bail!("dashboard_poll_secs must be at least 1");
        }
        if self.whale_poll_secs == 0 {
            anyhow::bail!("whale_poll_secs must be at least 1");
        }
        if self.summary_interval_secs == 0 {
            anyhow::bail!("summary_interval_secs must be at least 1");
        }
        if self.log_buffer_cap == 0 {
            anyhow::bail!("log_buffer_cap must be at least 1");
        }
        if self.whale_retention_days <= 0 {
            anyhow::bail!("whale_retention_days must be positive");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
