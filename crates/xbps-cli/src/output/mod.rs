//! Terminal output utilities: unified styling, progress bars, and tables,
//! with `NO_COLOR` and TTY-detection support.

pub mod progress;
pub mod table;

use console::style;
use std::io::{stderr, stdout, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
static UNICODE_ENABLED: AtomicBool = AtomicBool::new(true);

static IS_TTY: std::sync::LazyLock<bool> =
    std::sync::LazyLock::new(|| stdout().is_terminal() && stderr().is_terminal());

static NO_COLOR: std::sync::LazyLock<bool> =
    std::sync::LazyLock::new(|| std::env::var("NO_COLOR").is_ok());

/// Initialize output settings from the environment and CLI flags.
pub fn init(force_ansi: Option<bool>, quiet: bool) {
    let colors = force_ansi.unwrap_or(*IS_TTY && !*NO_COLOR);
    COLOR_ENABLED.store(colors, Ordering::Relaxed);

    let unicode = std::env::var("LANG")
        .or_else(|_| std::env::var("LC_ALL"))
        .map(|l| l.to_uppercase().contains("UTF"))
        .unwrap_or(cfg!(not(windows)));
    UNICODE_ENABLED.store(unicode && !quiet, Ordering::Relaxed);
}

#[must_use]
pub fn colors_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

#[must_use]
pub fn unicode_enabled() -> bool {
    UNICODE_ENABLED.load(Ordering::Relaxed)
}

fn icon(unicode: &'static str, ascii: &'static str) -> &'static str {
    if unicode_enabled() {
        unicode
    } else {
        ascii
    }
}

pub fn success(text: &str) {
    let i = icon("\u{2713}", "OK");
    if colors_enabled() {
        println!("{} {text}", style(i).green());
    } else {
        println!("{i} {text}");
    }
}

pub fn warning(text: &str) {
    let i = icon("\u{26a0}", "!");
    if colors_enabled() {
        eprintln!("{}", style(format!("{i} {text}")).yellow());
    } else {
        eprintln!("{i} {text}");
    }
}

pub fn error(text: &str) {
    let i = icon("\u{2717}", "x");
    if colors_enabled() {
        eprintln!("{}", style(format!("{i} {text}")).red());
    } else {
        eprintln!("{i} {text}");
    }
}

pub fn info(text: &str) {
    let i = icon("\u{2139}", "i");
    if colors_enabled() {
        println!("{} {text}", style(i).blue());
    } else {
        println!("{i} {text}");
    }
}

/// Print a package name with optional version, indented for list output.
pub fn package(name: &str, version: Option<&str>) {
    if colors_enabled() {
        match version {
            Some(v) => println!("  {} {}", style(name).green(), style(v).yellow()),
            None => println!("  {}", style(name).green()),
        }
    } else {
        match version {
            Some(v) => println!("  {name} {v}"),
            None => println!("  {name}"),
        }
    }
}

#[must_use]
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        format!("{:.0}us", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

/// Ask a yes/no question on stdin, defaulting to `default` on a bare Enter.
/// Non-interactive sessions (no TTY) take the default without prompting.
#[must_use]
pub fn confirm(prompt: &str, default: bool) -> bool {
    if !*IS_TTY {
        return default;
    }
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{prompt} {hint} ");
    let _ = std::io::Write::flush(&mut stdout());
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return default;
    }
    match line.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert!(format_duration(std::time::Duration::from_micros(500)).contains("us"));
        assert!(format_duration(std::time::Duration::from_millis(500)).contains("ms"));
        assert!(format_duration(std::time::Duration::from_secs(5)).contains('s'));
        assert!(format_duration(std::time::Duration::from_secs(120)).contains('m'));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert!(format_bytes(2048).contains("KB"));
        assert!(format_bytes(2 * 1024 * 1024).contains("MB"));
    }
}
