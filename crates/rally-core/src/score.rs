use serde::{Deserialize, Serialize};

/// Kind of counted session.
///
/// Only [`SessionKind::Free`] is produced today; the other variants are
/// reserved for future game modes and kept so persisted records from newer
/// versions still deserialize.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Free play: count until the player stops or times out.
    #[default]
    Free,
    /// Fixed-duration session (reserved).
    Timed,
    /// Play-to-target session (reserved).
    Target,
}

/// One finalized session, as persisted in the high-score list.
///
/// Immutable once created.
///
/// # Example
/// ```
/// use rally_core::{ScoreRecord, SessionKind};
/// let record = ScoreRecord {
///     id: "18c2-03af".into(),
///     score: 42,
///     date: "2026-08-23T10:00:00+00:00".into(),
///     duration_secs: 61.5,
///     kind: SessionKind::Free,
///     longest_rally: 42,
/// };
/// assert_eq!(record.score, 42);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScoreRecord {
    /// Unique record id.
    pub id: String,
    /// Total counted hits for the session.
    pub score: u32,
    /// Finalization timestamp, ISO-8601.
    pub date: String,
    /// Session duration in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// Session kind.
    #[serde(rename = "type")]
    pub kind: SessionKind,
    /// Longest rally within the session. Equals `score` today: the core
    /// tracks session-level hits, not sub-rally breaks.
    #[serde(rename = "longestRally")]
    pub longest_rally: u32,
}

/// Running all-time statistics, recomputed on every finalized session.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Hits across all sessions.
    pub total_hits: u64,
    /// Highest session score ever recorded.
    pub longest_rally: u32,
    /// Number of finalized sessions.
    pub total_sessions: u64,
    /// `total_hits / total_sessions`, fully recomputed each time (not an
    /// incrementally updated running average).
    pub average_rally_length: f64,
    /// Accumulated session durations in seconds.
    #[serde(rename = "totalPlayTime")]
    pub total_play_time_secs: f64,
}
