//! Window arithmetic
//!
//! All mapping between absolute time and window indexes goes through these
//! functions. Everything is integer milliseconds; floating point never enters
//! time math.

use crate::types::WindowIndex;

/// Window index covering the given timestamp
///
/// A window with index `w` covers `[w * window_ms, (w + 1) * window_ms)`.
pub fn window_index(time_ms: i64, window_ms: i64) -> WindowIndex {
    time_ms.div_euclid(window_ms)
}

/// Start of the window in absolute milliseconds
pub fn window_start_ms(index: WindowIndex, window_ms: i64) -> i64 {
    index * window_ms
}

/// Clamp a `[from_ms, to_ms]` query range to retained window indexes
///
/// Returns the inclusive index range `[from, to]` restricted to
/// `[earliest, active - 1]`; the active window is always excluded. `None` if
/// the clamped range is empty.
pub fn resolve_range(
    from_ms: i64,
    to_ms: i64,
    window_ms: i64,
    earliest: WindowIndex,
    active: WindowIndex,
) -> Option<(WindowIndex, WindowIndex)> {
    let from = window_index(from_ms, window_ms).max(earliest);
    let to = window_index(to_ms, window_ms).min(active - 1);
    if from > to {
        None
    } else {
        Some((from, to))
    }
}
