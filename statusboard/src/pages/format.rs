//! Number formatting shared by the pages.

use crate::metrics::{GB, MB};

/// Decimal units, as used for network throughput.
const NET_KB: f64 = 1000.0;
const NET_MB: f64 = NET_KB * 1000.0;
const NET_GB: f64 = NET_MB * 1000.0;

fn round_to(v: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (v * scale).round() / scale
}

/// One decimal below 10, none above: "7.5%", "42%".
pub fn percent(v: f64) -> String {
    if v < 10.0 {
        format!("{:.1}%", round_to(v, 1))
    } else {
        format!("{:.0}%", v.round())
    }
}

/// "used MB / total MB", or "used MB / total GB" from 1 GB up.
pub fn memory(used: f64, total: f64) -> String {
    if total / GB < 1.0 {
        format!("{:3} MB / {:3} MB", (used / MB).round() as u64, (total / MB).round() as u64)
    } else {
        format!("{:4} MB / {:1} GB", (used / MB).round() as u64, (total / GB).round() as u64)
    }
}

/// Disk sizes: "x.xxx MB" below 1 GB, "x.xxx GB" otherwise.
pub fn size(bytes: f64) -> String {
    if bytes / GB < 1.0 {
        format!("{:.3} MB", round_to(bytes / MB, 3))
    } else {
        format!("{:.3} GB", round_to(bytes / GB, 3))
    }
}

/// Throughput keeping 4 significant digits: "0.512 KB/s", "12.34 KB/s",
/// "123.4 MB/s".
pub fn rate(bytes: f64) -> String {
    if bytes < NET_KB {
        return format!("{:.3} KB/s", round_to(bytes / NET_KB, 3));
    }
    for (scale, unit) in [(NET_KB, "KB/s"), (NET_MB, "MB/s"), (NET_GB, "GB/s")] {
        let v = bytes / scale;
        if round_to(v, 3) < 10.0 {
            return format!("{:.3} {}", round_to(v, 3), unit);
        }
        if round_to(v, 2) < 100.0 {
            return format!("{:.2} {}", round_to(v, 2), unit);
        }
        if round_to(v, 1) < 1000.0 {
            return format!("{:.1} {}", round_to(v, 1), unit);
        }
    }
    format!("{:.0} GB/s", (bytes / NET_GB).round())
}
