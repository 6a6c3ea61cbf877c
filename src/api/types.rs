use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Directional recommendation attached to a signal.
///
/// Unknown values from the wire collapse to `NoTrade`, matching the backend's
/// own default when a recommendation is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    BuyYes,
    BuyNo,
    Skip,
    #[serde(other)]
    NoTrade,
}

impl Default for SignalType {
    fn default() -> Self {
        SignalType::NoTrade
    }
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::BuyYes => "BUY_YES",
            SignalType::BuyNo => "BUY_NO",
            SignalType::NoTrade => "NO_TRADE",
            SignalType::Skip => "SKIP",
        }
    }

    /// BUY_YES and BUY_NO are the only signals worth surfacing to an operator.
    pub fn is_actionable(&self) -> bool {
        matches!(self, SignalType::BuyYes | SignalType::BuyNo)
    }
}

/// Confidence tier assigned by the AI assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Low,
    #[serde(other)]
    Medium,
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Medium
    }
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

/// One AI-generated trading recommendation for a market at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub id: Option<i64>,
    /// Backend market row id, the preferred dedup key.
    #[serde(default)]
    pub market_id: Option<i64>,
    #[serde(default)]
    pub polymarket_id: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub signal_type: SignalType,
    /// AI-estimated probability of the YES outcome (0.0–1.0).
    #[serde(default)]
    pub ai_probability: Option<f64>,
    #[serde(default)]
    pub market_yes_price: Option<f64>,
    #[serde(default)]
    pub market_no_price: Option<f64>,
    /// Signed edge in percentage points: (AI probability − market price) × 100.
    #[serde(default)]
    pub edge: f64,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Signal {
    /// Key under which this signal is merged: the market id when the backend
    /// sent one, otherwise the question text.
    pub fn dedup_key(&self) -> String {
        match self.market_id {
            Some(id) => id.to_string(),
            None => self.question.clone(),
        }
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// A tracked signal with outcome-verification fields layered on.
///
/// `direction_correct` is tri-state: unresolved (None) / correct / incorrect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub opportunity_id: Option<i64>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub signal_type: SignalType,
    #[serde(default)]
    pub ai_probability: Option<f64>,
    #[serde(default)]
    pub market_price_at_signal: Option<f64>,
    #[serde(default)]
    pub edge_at_signal: Option<f64>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub price_after_1h: Option<f64>,
    #[serde(default)]
    pub price_after_6h: Option<f64>,
    #[serde(default)]
    pub price_after_24h: Option<f64>,
    /// The backend stores this as 0/1/NULL in SQLite.
    #[serde(default, deserialize_with = "tri_state_flag")]
    pub direction_correct: Option<bool>,
    #[serde(default)]
    pub final_resolution: Option<String>,
    #[serde(default)]
    pub hypothetical_pnl: Option<f64>,
    #[serde(default)]
    pub signal_source: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub market_end_date: Option<String>,
}

impl Prediction {
    pub fn is_resolved(&self) -> bool {
        self.direction_correct.is_some()
    }
}

/// Accuracy aggregates as computed server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccuracyStats {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub buy_yes: i64,
    #[serde(default)]
    pub buy_no: i64,
    #[serde(default)]
    pub correct: i64,
    #[serde(default)]
    pub resolved: i64,
    #[serde(default)]
    pub avg_edge: f64,
    #[serde(default)]
    pub accuracy_pct: f64,
}

/// Top-level counters in the dashboard snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_markets: i64,
    #[serde(default)]
    pub total_opportunities: i64,
    #[serde(default)]
    pub total_signals: i64,
    #[serde(default)]
    pub total_predictions: i64,
    #[serde(default)]
    pub last_scan: Option<String>,
}

/// A scanned prediction market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub yes_price: f64,
    #[serde(default)]
    pub no_price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub polymarket_id: Option<String>,
    #[serde(default)]
    pub opportunity_count: i64,
}

/// Severity of a backend log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Warning,
    Error,
    #[serde(other)]
    Info,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// One structured log record delivered over the SSE stream (or embedded in
/// the dashboard snapshot).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub message: String,
}

/// Everything `GET /api/dashboard` returns in one shot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub active_signals: Vec<Signal>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub accuracy_stats: AccuracyStats,
    #[serde(default)]
    pub system_logs: Vec<LogLine>,
    #[serde(default)]
    pub stats: DashboardStats,
    #[serde(default)]
    pub server_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Sell,
    #[serde(other)]
    Buy,
}

impl Default for TradeSide {
    fn default() -> Self {
        TradeSide::Buy
    }
}

/// A large on-chain trade observation.
///
/// Serde aliases cover the alternate column spellings the backend uses when
/// embedding whale rows in a prediction detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhaleTrade {
    #[serde(default, alias = "transactionHash")]
    pub tx_hash: Option<String>,
    #[serde(default, alias = "market_title")]
    pub market: String,
    /// Trade notional in USD (size × price, pre-computed server-side).
    #[serde(default, alias = "trade_size")]
    pub size: f64,
    #[serde(default, alias = "trade_side")]
    pub side: TradeSide,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, alias = "trader_name")]
    pub trader: Option<String>,
    #[serde(default, alias = "alerted_at")]
    pub time: Option<String>,
}

impl WhaleTrade {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.time.as_deref().and_then(parse_timestamp)
    }
}

/// 24h whale aggregates as computed server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhaleStats {
    #[serde(default)]
    pub total_trades: i64,
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default)]
    pub avg_size: f64,
    #[serde(default)]
    pub buys: i64,
    #[serde(default)]
    pub sells: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopMarket {
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub trades: i64,
}

/// Shape of `GET /api/whales`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhaleFeed {
    #[serde(default)]
    pub trades: Vec<WhaleTrade>,
    #[serde(default)]
    pub stats: WhaleStats,
    #[serde(default)]
    pub top_markets: Vec<TopMarket>,
}

/// Detail record for a single prediction (`GET /api/prediction/{id}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub market_id: Option<i64>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub signal_type: SignalType,
    #[serde(default)]
    pub signal_source: Option<String>,
    #[serde(default)]
    pub whale_trader: Option<String>,
    #[serde(default)]
    pub whale_trade_size: Option<f64>,
    #[serde(default)]
    pub ai_probability: Option<f64>,
    #[serde(default)]
    pub edge: f64,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub key_factors_for: Vec<String>,
    #[serde(default)]
    pub key_factors_against: Vec<String>,
    #[serde(default)]
    pub risks: String,
    #[serde(default)]
    pub market_yes_price: f64,
    #[serde(default)]
    pub market_no_price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub polymarket_id: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub resolution_source: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Outcome-tracking snapshot, present once the accuracy tracker picks the
    /// prediction up.
    #[serde(default)]
    pub tracking: Option<Prediction>,
    #[serde(default)]
    pub whales: Vec<WhaleTrade>,
}

/// One turn of the pass-through agent chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Reply from `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Shape of `GET /api/health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parse the two timestamp formats the backend emits: RFC 3339 (API-generated
/// fields) and SQLite's `%Y-%m-%d %H:%M:%S` (row defaults). Both are UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Deserialize 0/1/NULL (or a plain bool) into `Option<bool>`.
fn tri_state_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}
