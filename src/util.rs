// Human-readable throughput, binary units throughout
pub fn format_rate(kb_per_sec: f64) -> String {
    const MB: f64 = 1024.0;
    const GB: f64 = 1024.0 * MB;

    if kb_per_sec >= GB {
        format!("{:.2} GB/s", kb_per_sec / GB)
    } else if kb_per_sec >= MB {
        format!("{:.2} MB/s", kb_per_sec / MB)
    } else {
        format!("{:.2} KB/s", kb_per_sec)
    }
}

pub fn format_bytes_total(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = 1024 * KB;
    const GB: i64 = 1024 * MB;
    const TB: i64 = 1024 * GB;
    if bytes >= TB {
        format!("{:.2} TiB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_pick_largest_unit() {
        assert_eq!(format_rate(0.0), "0.00 KB/s");
        assert_eq!(format_rate(512.0), "512.00 KB/s");
        assert_eq!(format_rate(1536.0), "1.50 MB/s");
        assert_eq!(format_rate(1_048_576.0), "1.00 GB/s");
    }

    #[test]
    fn totals_pick_largest_unit() {
        assert_eq!(format_bytes_total(0), "0 B");
        assert_eq!(format_bytes_total(2048), "2.00 KiB");
        assert_eq!(format_bytes_total(18_790_563_840), "17.50 GiB");
    }
}
