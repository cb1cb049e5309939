use std::sync::Arc;

use aggregator::VolumeAggregator;
use config::{NotificationTarget, NotifierConfig, FETCH_INTERVAL};
use graph::{SwapFetcher, Watermark};
use notify::{EmailNotifier, Notifier, SmtpMailer, TelegramBot, TelegramNotifier};
use scheduler::{fetch_task, notify_task, FetchJob};
use store::{MetricStore, RedisStore};
use tracing::{info, Level};

pub mod aggregator;
pub mod aux;
pub mod config;
pub mod errors;
pub mod graph;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod utils;

/// Starts the fetch and notification timers and runs until killed.
pub async fn run() -> eyre::Result<()> {
    aux::init(format!("uni-volume={}", Level::INFO).parse()?);

    let config = NotifierConfig::from_env()?;
    info!(target: "uni-volume", "starting to monitor uniswap {} swaps, notifying by {}", config.version, config.target.mode());

    let store: Arc<dyn MetricStore> = Arc::new(RedisStore::connect(&config.redis_url).await?);

    let notifier = match &config.target {
        NotificationTarget::Email(smtp) => Notifier::Email(EmailNotifier::new(
            store.clone(),
            Arc::new(SmtpMailer::new(smtp)?),
            config.threshold,
        )),
        NotificationTarget::Telegram(telegram) => Notifier::Telegram(TelegramNotifier::new(
            store.clone(),
            Arc::new(TelegramBot::new(telegram)),
            config.threshold,
        )),
    };

    let fetch_job = FetchJob::new(
        SwapFetcher::new(config.graph_url.clone(), config.version),
        VolumeAggregator::new(store),
        Watermark::now(),
    );

    let fetch = tokio::spawn(fetch_task(fetch_job, FETCH_INTERVAL));
    let notify = tokio::spawn(notify_task(notifier, config.notification_interval));

    let (fetch, notify) = futures::future::join(fetch, notify).await;
    fetch?;
    notify?;

    Ok(())
}
