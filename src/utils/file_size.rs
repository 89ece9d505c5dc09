pub struct FileSizeUtils;

impl FileSizeUtils {
    /// Compact size label used in upload history, e.g. `512 B`, `1.5 KB`, `2.0 MB`
    pub fn format_size(size: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut value = size as f64;
        let mut unit_index = 0;

        while value >= 1024.0 && unit_index < UNITS.len() - 1 {
            value /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size, UNITS[0])
        } else {
            format!("{:.1} {}", value, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(FileSizeUtils::format_size(0), "0 B");
        assert_eq!(FileSizeUtils::format_size(1023), "1023 B");
        assert_eq!(FileSizeUtils::format_size(1536), "1.5 KB");
        assert_eq!(FileSizeUtils::format_size(2 * 1024 * 1024), "2.0 MB");
    }
}
