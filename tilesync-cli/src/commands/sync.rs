//! `tilesync sync`: bring a sector into the local cache.
//!
//! Runs one bulk retrieval with a progress bar. A watchdog cancels and
//! restarts the run when progress stalls for `bulk.watchdog_secs`, up to
//! `bulk.max_restarts` times. Ctrl+C cancels cleanly; tiles fetched so far
//! stay cached and the next run resumes from there.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tilesync::bulk::{BulkConfig, BulkHandle, BulkOutcome, BulkState};
use tilesync::config::format_size;
use tilesync::coord::Sector;
use tilesync::layer::TiledLayer;
use tilesync::retrieval::RetrievalService;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{parse_limit, DetailArgs, ProviderArgs, SectorArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub sector: SectorArgs,

    #[command(flatten)]
    pub detail: DetailArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Concurrent downloads (overrides download.parallel)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Refuse to start when the estimated download exceeds this size (e.g. 2GB)
    #[arg(long, value_parser = parse_limit)]
    pub max_download: Option<u64>,

    /// Fixed seed for the progress estimate (overrides bulk.seed)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds without progress before restarting; 0 disables (overrides bulk.watchdog_secs)
    #[arg(long)]
    pub watchdog: Option<u64>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print the final outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Restart policy for stalled runs.
#[derive(Debug, Clone, Copy)]
struct Watchdog {
    timeout: Duration,
    max_restarts: u32,
}

pub fn run(args: SyncArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("sync");

    let provider = runner.provider(args.provider.provider.as_deref(), args.provider.layer.as_deref())?;
    let layer = runner.layer(&provider, args.provider.cache_dir.clone())?;
    let sector = args.sector.to_sector()?;
    let resolution = args.detail.resolution(&layer)?;

    let Some(local) = layer.local_sector(&sector) else {
        println!("{} does not cover {}", layer.name(), sector);
        return Ok(());
    };

    let mut config = runner.config().bulk_config();
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let watchdog = Watchdog {
        timeout: args
            .watchdog
            .map(Duration::from_secs)
            .unwrap_or_else(|| runner.config().watchdog()),
        max_restarts: runner.config().bulk.max_restarts,
    };

    let runtime = runner.runtime()?;
    let retrieval = runner.retrieval(args.parallel)?;

    if let Some(limit) = args.max_download {
        let estimated = layer.estimated_missing_data_size(
            &local,
            resolution,
            &mut config.rng(),
            &CancellationToken::new(),
        )?;
        if estimated > limit {
            return Err(CliError::TooLarge { estimated, limit });
        }
    }

    let interrupt = CancellationToken::new();
    let on_signal = interrupt.clone();
    ctrlc::set_handler(move || on_signal.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let bar = progress_bar(args.no_progress || args.json);
    if !args.json {
        println!(
            "Syncing {} over {} (press Ctrl+C to stop)",
            style(layer.name()).bold(),
            local
        );
    }

    let outcome = runtime.block_on(supervise(
        &layer,
        &local,
        resolution,
        retrieval as Arc<dyn RetrievalService>,
        config,
        watchdog,
        &interrupt,
        &bar,
    ))?;
    bar.finish_and_clear();

    if args.json {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| CliError::Config(format!("Failed to encode outcome: {}", e)))?;
        println!("{}", json);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

/// Runs the bulk retrieval, restarting it when the watchdog fires.
#[allow(clippy::too_many_arguments)]
async fn supervise(
    layer: &Arc<TiledLayer>,
    sector: &Sector,
    resolution: f64,
    retrieval: Arc<dyn RetrievalService>,
    config: BulkConfig,
    watchdog: Watchdog,
    interrupt: &CancellationToken,
    bar: &ProgressBar,
) -> Result<BulkOutcome, CliError> {
    let mut restarts = 0;
    loop {
        let handle = layer
            .make_local(sector, resolution, Arc::clone(&retrieval), config.clone(), None)
            .ok_or_else(|| CliError::Config(format!("{} does not cover {}", layer.name(), sector)))?;

        let stalled = monitor(&handle, interrupt, watchdog.timeout, bar).await;
        let outcome = handle.wait().await?;

        if stalled && outcome.state == BulkState::Cancelled && restarts < watchdog.max_restarts {
            restarts += 1;
            warn!(
                restarts,
                max_restarts = watchdog.max_restarts,
                stalled_secs = watchdog.timeout.as_secs(),
                "No progress, restarting bulk retrieval"
            );
            bar.println(format!(
                "{} no progress for {}s, restarting ({}/{})",
                style("watchdog:").yellow(),
                watchdog.timeout.as_secs(),
                restarts,
                watchdog.max_restarts
            ));
            continue;
        }

        info!(state = %outcome.state, restarts, "Bulk retrieval finished");
        return Ok(outcome);
    }
}

/// Refreshes the progress bar until the run ends.
///
/// Returns true if the run was cancelled because it stalled.
async fn monitor(
    handle: &BulkHandle,
    interrupt: &CancellationToken,
    watchdog: Duration,
    bar: &ProgressBar,
) -> bool {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    loop {
        tokio::select! {
            _ = interrupt.cancelled() => {
                bar.println("Interrupted, stopping after in-flight requests...");
                handle.cancel();
                return false;
            }
            _ = ticker.tick() => {}
        }

        let snapshot = handle.snapshot();
        bar.set_length(snapshot.total_count);
        bar.set_position(snapshot.current_count);
        bar.set_message(format!(
            "{} / {}, {} failed",
            format_size(snapshot.current_size),
            format_size(snapshot.total_size),
            snapshot.failed_count
        ));

        if handle.is_finished() {
            return false;
        }
        if !watchdog.is_zero()
            && handle.state() == BulkState::Running
            && snapshot.is_stalled(watchdog)
        {
            handle.cancel();
            return true;
        }
    }
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden || !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_summary(outcome: &BulkOutcome) {
    let progress = &outcome.progress;
    let label = outcome.state.to_string();
    let state = match outcome.state {
        BulkState::Completed => style(label).green(),
        BulkState::Cancelled => style(label).yellow(),
        _ => style(label).red(),
    };
    println!("Sync {}", state);
    println!(
        "  Retrieved: {} tiles (~{})",
        progress.current_count,
        format_size(progress.current_size)
    );
    if progress.failed_count > 0 {
        println!(
            "  Failed:    {} tiles (run again to retry)",
            style(progress.failed_count).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tilesync::cache::{AbsentResourceList, MemoryTileStore};
    use tilesync::level::{LevelSet, LevelSetConfig};
    use tilesync::provider::{TemplateUrlBuilder, TileScheme};
    use tilesync::retrieval::{CompletionHandler, RetrievalRequest};

    /// Accepts every request and never completes any.
    #[derive(Default)]
    struct StuckService {
        submitted: AtomicUsize,
    }

    impl RetrievalService for StuckService {
        fn is_available(&self) -> bool {
            true
        }

        fn submit(&self, _request: RetrievalRequest, on_complete: CompletionHandler) {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            std::mem::forget(on_complete);
        }
    }

    /// Two-level layer; the test sector holds one level-0 tile.
    fn layer() -> Arc<TiledLayer> {
        let levels = LevelSet::new(LevelSetConfig {
            num_levels: 2,
            num_empty_levels: 0,
            ..Default::default()
        });
        let builder =
            TemplateUrlBuilder::new("stuck", "https://t.test/{z}/{x}/{y}", TileScheme::XYZ).unwrap();
        Arc::new(TiledLayer::new(
            "stuck",
            levels,
            Arc::new(builder),
            Arc::new(MemoryTileStore::new()),
            Arc::new(AbsentResourceList::default()),
        ))
    }

    fn sector_and_resolution(layer: &TiledLayer) -> (Sector, f64) {
        let level = layer.levels().level(1).unwrap();
        let sector = Sector::from_degrees(0.0, 20.0, 0.0, 40.0).unwrap();
        (sector, level.texel_size())
    }

    #[tokio::test]
    async fn test_watchdog_restarts_stalled_runs() {
        let layer = layer();
        let (sector, resolution) = sector_and_resolution(&layer);
        let service = Arc::new(StuckService::default());
        let config = BulkConfig::default()
            .with_seed(1)
            .with_poll_interval(Duration::from_millis(20));
        let watchdog = Watchdog {
            timeout: Duration::from_millis(300),
            max_restarts: 2,
        };

        let outcome = supervise(
            &layer,
            &sector,
            resolution,
            Arc::clone(&service) as Arc<dyn RetrievalService>,
            config,
            watchdog,
            &CancellationToken::new(),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        // Each run stalls on its first tile: one submission per attempt.
        assert_eq!(outcome.state, BulkState::Cancelled);
        assert_eq!(service.submitted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_interrupt_stops_without_restart() {
        let layer = layer();
        let (sector, resolution) = sector_and_resolution(&layer);
        let service = Arc::new(StuckService::default());
        let interrupt = CancellationToken::new();
        let watchdog = Watchdog {
            timeout: Duration::from_secs(60),
            max_restarts: 5,
        };

        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = supervise(
            &layer,
            &sector,
            resolution,
            Arc::clone(&service) as Arc<dyn RetrievalService>,
            BulkConfig::default().with_seed(1),
            watchdog,
            &interrupt,
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, BulkState::Cancelled);
        assert_eq!(service.submitted.load(Ordering::SeqCst), 1);

        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["state"], "Cancelled");
        assert_eq!(json["progress"]["current_count"], 0);
    }
}
