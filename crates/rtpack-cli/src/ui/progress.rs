//! Download progress formatting.

/// Step between printed updates when the total size is unknown.
const UNKNOWN_TOTAL_STEP: u64 = 16 * 1024 * 1024;

/// Human readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Fixed-width bar using ▓ (filled) and ░ (empty).
pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        (((current as f64 / total as f64) * width as f64).round() as usize).min(width)
    } else {
        0
    };
    format!("{}{}", "▓".repeat(filled), "░".repeat(width - filled))
}

/// `▓▓▓░░░  50%  1.0 KB`, or just the byte count when the server sent no
/// length.
pub fn format_transfer(current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(total) => {
            let pct = (current * 100 / total).min(100);
            let bar = format_progress_bar(current, total, 24);
            format!("{bar}  {pct:>3}%  {}", format_size(total))
        }
        None => format_size(current),
    }
}

/// Which bucket a transfer is in; an update is printed when it changes.
///
/// Tenths of the total when known, otherwise 16 MiB steps.
pub fn progress_bucket(current: u64, total: Option<u64>) -> u64 {
    match total.filter(|&t| t > 0) {
        Some(total) => (current * 10 / total).min(10),
        None => current / UNKNOWN_TOTAL_STEP,
    }
}
