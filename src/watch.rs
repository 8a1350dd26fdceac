//! Periodic snapshot refresh

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::feed::error::RefreshError;
use crate::feed::snapshot::{Feeds, SnapshotSource};

/// Shortest period accepted by [`run_refresh_loop`]
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

/// Refresh `feeds` once on the blocking pool
pub async fn refresh_once<S: SnapshotSource>(
    feeds: Arc<Feeds<S>>,
) -> Result<u64, RefreshError> {
    tokio::task::spawn_blocking(move || feeds.refresh())
        .await
        .map_err(|e| RefreshError::Aborted(e.to_string()))?
}

/// Refresh `feeds` every `period` until `shutdown` resolves.
///
/// The first refresh happens immediately. Failures are logged and the loop
/// keeps going; readers continue to see the last published snapshot.
/// `on_refresh` is called with every newly published generation.
/// A `period` below [`MIN_REFRESH_PERIOD`] is raised to it.
pub async fn run_refresh_loop<S, F>(
    feeds: Arc<Feeds<S>>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
    mut on_refresh: F,
) where
    S: SnapshotSource,
    F: FnMut(u64),
{
    let period = if period < MIN_REFRESH_PERIOD {
        warn!(
            "Refresh period {:?} is too short, using {:?}",
            period, MIN_REFRESH_PERIOD
        );
        MIN_REFRESH_PERIOD
    } else {
        period
    };

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("Starting refresh loop every {:?}", period);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Refresh loop stopped");
                return;
            }
            _ = ticker.tick() => {
                match refresh_once(Arc::clone(&feeds)).await {
                    Ok(generation) => {
                        debug!("Refresh produced generation {}", generation);
                        on_refresh(generation);
                    }
                    Err(e) => error!("Refresh failed: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::error::CatalogError;
    use crate::feed::dedup::tests::row;
    use crate::feed::snapshot::MockSnapshotSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn refresh_once_publishes_snapshot() {
        let mut source = MockSnapshotSource::new();
        source
            .expect_load()
            .times(1)
            .returning(|| Ok(vec![row(0, 1, 0, Some("a"), None)]));
        let feeds = Arc::new(Feeds::new(source));

        let generation = refresh_once(Arc::clone(&feeds)).await.unwrap();

        assert_eq!(generation, 1);
        assert_eq!(feeds.recent_packages(10).len(), 1);
    }

    #[tokio::test]
    async fn run_refresh_loop_refreshes_until_shutdown() {
        let mut source = MockSnapshotSource::new();
        source
            .expect_load()
            .returning(|| Ok(vec![row(0, 1, 0, Some("a"), None)]));
        let feeds = Arc::new(Feeds::new(source));
        let mut generations = Vec::new();

        run_refresh_loop(
            Arc::clone(&feeds),
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(100)),
            |generation| generations.push(generation),
        )
        .await;

        assert!(!generations.is_empty());
        assert_eq!(generations[0], 1);
        assert!(generations.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(
            feeds.snapshot().generation(),
            *generations.last().unwrap()
        );
    }

    #[tokio::test]
    async fn run_refresh_loop_with_zero_period_uses_minimum() {
        let mut source = MockSnapshotSource::new();
        source
            .expect_load()
            .returning(|| Ok(vec![row(0, 1, 0, Some("a"), None)]));
        let feeds = Arc::new(Feeds::new(source));
        let mut generations = Vec::new();

        run_refresh_loop(
            Arc::clone(&feeds),
            Duration::ZERO,
            tokio::time::sleep(Duration::from_millis(20)),
            |generation| generations.push(generation),
        )
        .await;

        assert!(!generations.is_empty());
        assert_eq!(feeds.recent_packages(10).len(), 1);
    }

    #[tokio::test]
    async fn run_refresh_loop_keeps_going_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut source = MockSnapshotSource::new();
        source.expect_load().returning(move || {
            // Every other load fails
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(CatalogError::LockPoisoned)
            } else {
                Ok(vec![row(0, 1, 0, Some("a"), None)])
            }
        });
        let feeds = Arc::new(Feeds::new(source));

        run_refresh_loop(
            Arc::clone(&feeds),
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(100)),
            |_| {},
        )
        .await;

        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert!(feeds.snapshot().generation() >= 1);
    }
}
