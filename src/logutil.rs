//! Logging helpers for client-supplied strings (session ids, actions, directions).

const MAX_PREVIEW: usize = 80;

/// Single-line, length-capped rendering of a request value for log lines.
/// Control characters, quotes and backslashes come out in their `Debug` escaped form.
pub fn escape_log(s: &str) -> String {
    let mut out: String = s
        .chars()
        .take(MAX_PREVIEW)
        .flat_map(char::escape_debug)
        .collect();
    if s.chars().nth(MAX_PREVIEW).is_some() {
        out.push('…');
    }
    out
}
