use crate::cli::ColorMode;
use nu_ansi_term::Color;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_EXIT_CODE: i32 = 1;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(cmode: ColorMode) {
    USE_COLOR.store(matches!(cmode, ColorMode::On), Ordering::Relaxed);
}

fn use_color() -> ColorMode {
    match USE_COLOR.load(Ordering::Relaxed) {
        true => ColorMode::On,
        false => ColorMode::Off,
    }
}

fn format_error(color: ColorMode, text: &str) -> String {
    match color {
        ColorMode::On => {
            let style = Color::Red.bold();
            let text_style = Color::Default.bold();

            format!("{} {}", style.paint("error:"), text_style.paint(text))
        }
        ColorMode::Off => format!("error: {}", text),
    }
}

pub(crate) fn error_internal(text: &str) {
    eprintln!("{}", format_error(use_color(), text));
}

/// Prints an error to stderr and exits with [`DEFAULT_EXIT_CODE`].
#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_are_prefixed() {
        assert_eq!(
            format_error(ColorMode::Off, "no such config"),
            "error: no such config"
        );
    }

    #[test]
    fn colored_errors_keep_the_text() {
        let formatted = format_error(ColorMode::On, "no such config");

        assert!(formatted.contains("error:"));
        assert!(formatted.contains("no such config"));
        assert!(formatted.contains('\u{1b}'));
    }
}
