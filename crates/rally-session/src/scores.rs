use chrono::Utc;

use rally_core::store::{self, KeyValueStore};
use rally_core::{ScoreRecord, SessionKind, Stats, SCORES_KEY, STATS_KEY};

/// Most-recent sessions kept in memory for the current run.
const RECENT_CAP: usize = 5;
/// Persisted high-score list length.
const HIGHSCORE_CAP: usize = 10;

/// Turns finalized sessions into persisted score records and statistics.
///
/// Keeps an ephemeral most-recent-first list of this run's sessions (never
/// persisted), maintains the descending top-10 high-score list, and
/// recomputes the running statistics on every finalize. Store failures fall
/// back to defaults on read and are logged on write; they never propagate.
///
/// # Example
/// ```
/// use rally_session::ScoreAggregator;
/// use rally_core::MemoryStore;
/// let mut store = MemoryStore::new();
/// let mut aggregator = ScoreAggregator::new();
/// let record = aggregator.finalize(&mut store, 12, 30.0);
/// assert_eq!(record.score, 12);
/// ```
#[derive(Default)]
pub struct ScoreAggregator {
    recent: Vec<ScoreRecord>,
}

impl ScoreAggregator {
    /// Create an aggregator with no recent sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize one session: build its record, persist the updated
    /// high-score list and statistics, and return the record.
    pub fn finalize(
        &mut self,
        store: &mut dyn KeyValueStore,
        score: u32,
        duration_secs: f64,
    ) -> ScoreRecord {
        let now = Utc::now();
        let record = ScoreRecord {
            id: format!("{:x}-{:08x}", now.timestamp_millis(), rand::random::<u32>()),
            score,
            date: now.to_rfc3339(),
            duration_secs,
            kind: SessionKind::Free,
            // Session-level count only; sub-rally breaks are not tracked.
            longest_rally: score,
        };

        self.recent.insert(0, record.clone());
        self.recent.truncate(RECENT_CAP);

        let mut highscores: Vec<ScoreRecord> = store::read_or_default(store, SCORES_KEY);
        highscores.push(record.clone());
        highscores.sort_by(|a, b| b.score.cmp(&a.score));
        highscores.truncate(HIGHSCORE_CAP);
        store::write_logged(store, SCORES_KEY, &highscores);

        let mut stats: Stats = store::read_or_default(store, STATS_KEY);
        stats.total_hits += u64::from(score);
        stats.longest_rally = stats.longest_rally.max(score);
        stats.total_sessions += 1;
        // Full recomputation from the totals, not an incremental average.
        stats.average_rally_length = stats.total_hits as f64 / stats.total_sessions as f64;
        stats.total_play_time_secs += duration_secs;
        store::write_logged(store, STATS_KEY, &stats);

        log::debug!("finalized session: {score} hits in {duration_secs:.1}s");
        record
    }

    /// This run's sessions, most recent first. Never persisted.
    #[must_use]
    pub fn recent(&self) -> &[ScoreRecord] {
        &self.recent
    }
}
