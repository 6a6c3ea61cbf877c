use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod feed;
mod signals;
mod whales;

use api::types::{LogLevel, PredictionDetail};
use api::SentinelClient;
use config::Config;
use feed::{ConnState, DashboardSource, HttpLogTransport, LogStream, Poller, WhaleSource};
use whales::WhaleBook;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let client = SentinelClient::new(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    // One-shot modes: print and exit, no background tasks
    if let Some(id) = config.prediction {
        let detail = client.fetch_prediction(id).await?;
        print_prediction(&detail);
        return Ok(());
    }
    if let Some(question) = &config.ask {
        let reply = client.chat(question, &[]).await?;
        println!("{}", reply.response);
        if !reply.data_sources.is_empty() {
            println!("\n[sources: {}]", reply.data_sources.join(", "));
        }
        return Ok(());
    }

    match client.health().await {
        Ok(h) => info!("Backend healthy: {} (db: {})", h.status, h.db.as_deref().unwrap_or("?")),
        Err(e) => warn!("Backend health check failed, continuing anyway: {}", e),
    }

    // Background consolidation: two pollers plus the log stream
    let dashboard = Poller::spawn(
        DashboardSource::new(client.clone()),
        Duration::from_secs(config.dashboard_poll_secs),
    );
    let whale_feed = Poller::spawn(
        WhaleSource::new(client.clone()),
        Duration::from_secs(config.whale_poll_secs),
    );
    let logs = LogStream::spawn(
        HttpLogTransport::new(client.clone()),
        config.log_buffer_cap,
        Duration::from_secs(config.log_reconnect_secs),
    );
    info!(
        "Monitoring {} (dashboard every {}s, whales every {}s)",
        config.api_url, config.dashboard_poll_secs, config.whale_poll_secs
    );

    let mut whale_book = WhaleBook::new(config.whale_min_trade_usd);
    let retention = chrono::Duration::days(config.whale_retention_days);

    let mut summary_interval =
        tokio::time::interval(Duration::from_secs(config.summary_interval_secs));
    summary_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = summary_interval.tick() => {
                if let Some(feed) = whale_feed.latest().await {
                    let added = whale_book.absorb(&feed.trades);
                    let pruned = whale_book.prune(retention, chrono::Utc::now());
                    if added > 0 || pruned > 0 {
                        info!("Whale book: +{} new, -{} pruned, {} tracked", added, pruned, whale_book.len());
                    }
                }
                print_summary(&dashboard, &whale_feed, &logs, &whale_book).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    // Orderly teardown: no timer or connection survives past this point
    dashboard.shutdown().await;
    whale_feed.shutdown().await;
    logs.shutdown().await;

    Ok(())
}

async fn print_summary(
    dashboard: &Poller<DashboardSource>,
    whale_feed: &Poller<WhaleSource>,
    logs: &LogStream,
    whale_book: &WhaleBook,
) {
    let snapshot = match dashboard.latest().await {
        Some(s) => s,
        None => {
            warn!("No dashboard snapshot yet");
            return;
        }
    };

    let deduped = signals::dedupe_signals(&snapshot.active_signals);
    let top = signals::actionable_ranked(deduped);
    info!(
        "{} market(s) scanned, {} active signal(s) after dedup",
        snapshot.stats.total_markets,
        top.len()
    );
    for sig in top.iter().take(5) {
        info!(
            "  {} {:+.1}% [{}] {}",
            sig.signal_type.as_str(),
            sig.edge,
            sig.confidence.as_str(),
            sig.question
        );
    }
    if let Some(newest) = top.iter().filter_map(|s| s.created_at_utc()).max() {
        info!("Newest signal at {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let accuracy = signals::summarize(&snapshot.predictions);
    match accuracy.hit_rate() {
        Some(rate) => info!(
            "Accuracy: {}/{} resolved correct ({:.0}%), {} tracked",
            accuracy.correct,
            accuracy.resolved,
            rate * 100.0,
            accuracy.total
        ),
        None => info!("Accuracy: {} tracked, none resolved yet", accuracy.total),
    }

    if whale_book.is_empty() {
        info!("Whales: none tracked yet");
    } else {
        info!(
            "Whales: {} tracked (${:.0} total notional)",
            whale_book.len(),
            whale_book.total_volume()
        );
        for t in whale_book.recent(3) {
            info!(
                "  {:?} ${:.0} {} @ {:.2} | {}",
                t.side, t.size, t.outcome, t.price, t.market
            );
        }
    }

    // Surface recent backend warnings/errors from the stream buffer
    let buffered = logs.lines().await;
    for line in buffered
        .iter()
        .rev()
        .filter(|l| l.level != LogLevel::Info)
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
    {
        warn!("[backend:{}] {}", line.component, line.message);
    }

    let stream_state = logs.state().await;
    let health_note = match (dashboard.is_healthy(), whale_feed.is_healthy()) {
        (true, true) => "pollers ok",
        (false, true) => "dashboard poll failing",
        (true, false) => "whale poll failing",
        (false, false) => "all pollers failing",
    };
    info!(
        "Log stream: {:?} ({} buffered) | {}",
        stream_state,
        logs.len().await,
        health_note
    );
    if stream_state != ConnState::Connected {
        warn!("Log stream is not connected; reconnecting in the background");
    }
}

fn print_prediction(d: &PredictionDetail) {
    println!("#{} {}", d.id.unwrap_or(0), d.question);
    println!(
        "{} | edge {:+.1}% | confidence {} | AI {:.0}% vs market {:.0}%",
        d.signal_type.as_str(),
        d.edge,
        d.confidence.as_str(),
        d.ai_probability.unwrap_or(0.0) * 100.0,
        d.market_yes_price * 100.0
    );
    if let Some(source) = &d.signal_source {
        println!("source: {}", source);
    }
    if !d.recommendation.is_empty() {
        println!("\nRecommendation: {}", d.recommendation);
    }
    if !d.reasoning.is_empty() {
        println!("\n{}", d.reasoning);
    }
    if !d.key_factors_for.is_empty() {
        println!("\nFor:");
        for f in &d.key_factors_for {
            println!("  + {}", f);
        }
    }
    if !d.key_factors_against.is_empty() {
        println!("Against:");
        for f in &d.key_factors_against {
            println!("  - {}", f);
        }
    }
    if !d.risks.is_empty() {
        println!("\nRisks: {}", d.risks);
    }
    if let Some(tracking) = &d.tracking {
        match tracking.direction_correct {
            Some(true) => println!("\nOutcome: resolved CORRECT"),
            Some(false) => println!("\nOutcome: resolved WRONG"),
            None => println!("\nOutcome: unresolved"),
        }
    }
    if !d.whales.is_empty() {
        println!("\nWhale activity:");
        for w in &d.whales {
            println!(
                "  {:?} ${:.0} by {}",
                w.side,
                w.size,
                w.trader.as_deref().unwrap_or("unknown")
            );
        }
    }
}
