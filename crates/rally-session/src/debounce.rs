/// Accept a classified hit only if enough time passed since the last one.
///
/// Pure predicate: rejects when `now_ms − last_hit_ms < min_interval_ms`,
/// even if the classifier fired. On acceptance the caller updates the last
/// hit timestamp and increments the count. Applied only while a session is
/// active.
///
/// # Example
/// ```
/// use rally_session::debounce;
/// assert!(debounce(1000, 700, 200));
/// assert!(!debounce(1000, 900, 200));
/// ```
#[must_use]
pub fn debounce(now_ms: u64, last_hit_ms: u64, min_interval_ms: u64) -> bool {
    now_ms.saturating_sub(last_hit_ms) >= min_interval_ms
}
