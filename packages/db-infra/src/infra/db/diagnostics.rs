/// Process-wide counters for migration runs and schema checks
pub mod migration_counters {
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Something the orchestrator or the drift check did.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MigrationEvent {
        FastPathHit,
        FastPathMiss,
        LockAcquired,
        LockBackoff,
        LockTimeout,
        MigratorRan,
        MigrationFailed,
        BodyTimeout,
        Cancelled,
        PostcheckMismatch,
        DriftDetected,
    }

    impl MigrationEvent {
        pub const ALL: [MigrationEvent; 11] = [
            MigrationEvent::FastPathHit,
            MigrationEvent::FastPathMiss,
            MigrationEvent::LockAcquired,
            MigrationEvent::LockBackoff,
            MigrationEvent::LockTimeout,
            MigrationEvent::MigratorRan,
            MigrationEvent::MigrationFailed,
            MigrationEvent::BodyTimeout,
            MigrationEvent::Cancelled,
            MigrationEvent::PostcheckMismatch,
            MigrationEvent::DriftDetected,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                MigrationEvent::FastPathHit => "fast_path_hit",
                MigrationEvent::FastPathMiss => "fast_path_miss",
                MigrationEvent::LockAcquired => "lock_acquired",
                MigrationEvent::LockBackoff => "lock_backoff",
                MigrationEvent::LockTimeout => "lock_timeout",
                MigrationEvent::MigratorRan => "migrator_ran",
                MigrationEvent::MigrationFailed => "migration_failed",
                MigrationEvent::BodyTimeout => "body_timeout",
                MigrationEvent::Cancelled => "cancelled",
                MigrationEvent::PostcheckMismatch => "postcheck_mismatch",
                MigrationEvent::DriftDetected => "drift_detected",
            }
        }

        fn slot(self) -> usize {
            self as usize
        }
    }

    static COUNTS: [AtomicUsize; MigrationEvent::ALL.len()] =
        [const { AtomicUsize::new(0) }; MigrationEvent::ALL.len()];

    pub fn record(event: MigrationEvent) {
        COUNTS[event.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(event: MigrationEvent) -> usize {
        COUNTS[event.slot()].load(Ordering::Relaxed)
    }

    /// Every counter as `(name, total)`, in declaration order.
    pub fn snapshot() -> Vec<(&'static str, usize)> {
        MigrationEvent::ALL
            .iter()
            .map(|event| (event.as_str(), count(*event)))
            .collect()
    }

    /// Log the non-zero counters as one `name=total` line.
    pub fn log_snapshot(context: &str) {
        let totals = snapshot()
            .into_iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| format!("{name}={total}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(context, counters = %totals, "migration counters");
    }

}
