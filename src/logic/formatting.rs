//! Formatting and display logic
//!
//! Pure functions for formatting sizes and throughput for human-readable display.

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;

/// Format bytes into human-readable string (e.g., "1.20 KB", "5.30 MB")
///
/// # Examples
/// ```
/// use fileshelf::logic::formatting::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if value >= TB {
        format!("{:.2} TB", value / TB)
    } else if value >= GB {
        format!("{:.2} GB", value / GB)
    } else if value >= MB {
        format!("{:.2} MB", value / MB)
    } else if value >= KB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a transfer rate using the largest base-1024 unit not above the value
///
/// Units stop at GB/s. Non-finite or negative rates render as `0 B/s`.
///
/// # Examples
/// ```
/// use fileshelf::logic::formatting::format_speed;
///
/// assert_eq!(format_speed(0.0), "0 B/s");
/// assert_eq!(format_speed(512.0), "512 B/s");
/// assert_eq!(format_speed(2.5 * 1024.0 * 1024.0), "2.50 MB/s");
/// ```
pub fn format_speed(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B/s".to_string();
    }

    if bytes_per_second >= GB {
        format!("{:.2} GB/s", bytes_per_second / GB)
    } else if bytes_per_second >= MB {
        format!("{:.2} MB/s", bytes_per_second / MB)
    } else if bytes_per_second >= KB {
        format!("{:.2} KB/s", bytes_per_second / KB)
    } else {
        format!("{:.0} B/s", bytes_per_second.floor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(format_bytes(2 * 1024u64.pow(4)), "2.00 TB");
    }

    #[test]
    fn test_format_speed_boundaries() {
        assert_eq!(format_speed(1023.9), "1023 B/s");
        assert_eq!(format_speed(1024.0), "1.00 KB/s");
        assert_eq!(format_speed(1024.0 * 1024.0), "1.00 MB/s");
    }

    #[test]
    fn test_format_speed_caps_at_gb() {
        // No TB/s unit
        assert_eq!(format_speed(2048.0 * 1024.0 * 1024.0 * 1024.0), "2048.00 GB/s");
    }

    #[test]
    fn test_format_speed_degenerate() {
        assert_eq!(format_speed(-5.0), "0 B/s");
        assert_eq!(format_speed(f64::NAN), "0 B/s");
        assert_eq!(format_speed(f64::INFINITY), "0 B/s");
    }
}
