use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::{
    aggregator::VolumeAggregator,
    graph::{SwapFetcher, Watermark},
    notify::Notifier,
};

/// Everything the fetch timer needs between ticks. Owned by the fetch task,
/// never shared.
pub struct FetchJob {
    fetcher: SwapFetcher,
    aggregator: VolumeAggregator,
    watermark: Watermark,
}

impl FetchJob {
    pub fn new(fetcher: SwapFetcher, aggregator: VolumeAggregator, watermark: Watermark) -> Self {
        Self { fetcher, aggregator, watermark }
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// One fetch-and-aggregate pass. Failures are logged, never returned.
    pub async fn tick(&mut self) {
        let swaps = self.fetcher.poll(&mut self.watermark).await;
        if swaps.is_empty() {
            return;
        }

        if let Err(e) = self.aggregator.apply(&swaps).await {
            error!(target: "uni-volume::scheduler", "failed to aggregate {} swaps - {:?}", swaps.len(), e);
        }
    }
}

/// first tick lands one full period after start
fn timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Runs until the process is killed.
pub async fn fetch_task(mut job: FetchJob, period: Duration) {
    info!(target: "uni-volume::scheduler", "starting fetch task (interval: {}ms, watermark: {})", period.as_millis(), job.watermark().get());

    let mut timer = timer(period);
    loop {
        timer.tick().await;
        debug!(target: "uni-volume::scheduler", "fetch tick");
        job.tick().await;
    }
}

/// Runs until the process is killed.
pub async fn notify_task(notifier: Notifier, period: Duration) {
    info!(target: "uni-volume::scheduler", "starting notification task (interval: {}ms)", period.as_millis());

    let mut timer = timer(period);
    loop {
        timer.tick().await;
        notifier.run_once().await;
    }
}
