use clap::ValueEnum;
use owo_colors::OwoColorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stdout is a terminal and NO_COLOR is unset
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        self.resolve(isatty::stdout_isatty(), std::env::var_os("NO_COLOR").is_some())
    }

    fn resolve(self, is_tty: bool, no_color: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_tty && !no_color,
        }
    }
}

/// One-line summary printed after the report when datablocks were skipped
pub fn skipped_summary(count: usize, colors: bool) -> String {
    let text = format!("{count} item(s) skipped, see warnings above");
    if colors {
        text.yellow().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_choice() {
        assert!(ColorChoice::Always.resolve(false, true));
        assert!(!ColorChoice::Never.resolve(true, false));
        assert!(ColorChoice::Auto.resolve(true, false));
        assert!(!ColorChoice::Auto.resolve(false, false));
        assert!(!ColorChoice::Auto.resolve(true, true));
    }

    #[test]
    fn test_skipped_summary_plain() {
        assert_eq!(
            skipped_summary(2, false),
            "2 item(s) skipped, see warnings above"
        );
        assert!(!skipped_summary(1, false).contains("-v"));
    }
}
