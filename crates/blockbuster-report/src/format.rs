use crate::report::SizeReport;
use owo_colors::OwoColorize;
use std::io::Write;

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Separator line printed around the report
pub const BANNER: &str = "-------------------------------------------------";

/// Human-readable size such as `1.5 KB`; zero is `0B`
pub fn convert_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let exponent = bytes.ilog(1024);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    // Exact halves round to even: 1.125 -> 1.12
    let rounded = (value * 100.0).round_ties_even() / 100.0;
    // `{:?}` keeps at least one fractional digit: 1.0, 1.5, 1.23
    format!("{rounded:?} {}", UNITS[exponent as usize])
}

/// Write `report` as plain text lines, with ANSI colors when `colors` is set
pub fn render_report<W: Write>(report: &SizeReport, out: &mut W, colors: bool) -> std::io::Result<()> {
    writeln!(out, "{BANNER}")?;

    for entry in &report.entries {
        let label = format!("{} ({}):", entry.name, entry.kind);
        let size = format!("{} - {} bytes", convert_size(entry.size), entry.size);
        if colors {
            writeln!(out, "{} {}", label.cyan(), size.yellow())?;
        } else {
            writeln!(out, "{label} {size}")?;
        }

        for reference in entry.references.iter().flatten() {
            if colors {
                writeln!(out, "{}", reference.blue())?;
            } else {
                writeln!(out, "{reference}")?;
            }
        }
    }

    writeln!(out, "{BANNER}")?;
    writeln!(out, "Total size: {}", convert_size(report.total))?;
    writeln!(out, "{BANNER}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_size() {
        assert_eq!(convert_size(0), "0B");
        assert_eq!(convert_size(1), "1.0 B");
        assert_eq!(convert_size(1023), "1023.0 B");
        assert_eq!(convert_size(1024), "1.0 KB");
        assert_eq!(convert_size(1536), "1.5 KB");
        assert_eq!(convert_size(1_073_741_824), "1.0 GB");
    }

    #[test]
    fn test_convert_size_two_decimals() {
        // 1260 / 1024 = 1.2304...
        assert_eq!(convert_size(1260), "1.23 KB");
        assert_eq!(convert_size(u64::MAX), "16.0 EB");
    }

    #[test]
    fn test_convert_size_halves_round_to_even() {
        // 1152 / 1024 = 1.125 and 3200 / 1024 = 3.125, both exact
        assert_eq!(convert_size(1152), "1.12 KB");
        assert_eq!(convert_size(3200), "3.12 KB");
        // 1.375 rounds up to the even hundredth
        assert_eq!(convert_size(1408), "1.38 KB");
    }

    #[test]
    fn test_render_empty_report() {
        let mut out = Vec::new();
        render_report(&SizeReport::default(), &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("{BANNER}\n{BANNER}\nTotal size: 0B\n{BANNER}\n")
        );
    }
}
