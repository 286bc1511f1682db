/// User interface and status output utilities
///
/// This module handles:
/// - Thread-safe console output (batch workers print concurrently)
/// - Colored terminal text
/// - Status, warning and error message formatting
/// - Column padding that respects wide characters

use lazy_static::lazy_static;
use std::io::Write;
use std::sync::Mutex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

lazy_static! {
    static ref LOCK: Mutex<()> = Mutex::new(());
}

/// Execute a function with exclusive access to console output
/// Prevents interleaved output from multiple threads
fn status_lock<F>(f: F)
where
    F: FnOnce(),
{
    let _guard = LOCK.lock();
    f();
}

/// Print the "docstack: " prefix for status messages
fn print_status_header() {
    print!("docstack: ");
}

/// Print colored text to terminal, with fallback to plain text
fn print_color(s: &str, fg: term::color::Color) {
    if !really_print_color(s, fg) {
        print!("{}", s);
    }

    fn really_print_color(s: &str, fg: term::color::Color) -> bool {
        if let Some(ref mut t) = term::stdout() {
            if t.fg(fg).is_err() {
                return false;
            }
            let _ = t.attr(term::Attr::Bold);
            if write!(t, "{}", s).is_err() {
                return false;
            }
            let _ = t.reset();
            return true;
        }

        false
    }
}

/// Print a status message with "docstack: " prefix (thread-safe)
pub fn status(s: &str) {
    status_lock(|| {
        print_status_header();
        println!("{}", s);
    });
}

/// Print a success line with a green check mark (thread-safe)
pub fn success(s: &str) {
    status_lock(|| {
        print_status_header();
        print_color("✓", term::color::BRIGHT_GREEN);
        println!(" {}", s);
    });
}

/// Print a warning with a yellow "warning" prefix (thread-safe)
pub fn warn(s: &str) {
    status_lock(|| {
        print_status_header();
        print_color("warning", term::color::BRIGHT_YELLOW);
        println!(": {}", s);
    });
}

/// Print an error message with colored "error" prefix
pub fn print_error(msg: &str) {
    status_lock(|| {
        println!();
        print_color("error", term::color::BRIGHT_RED);
        println!(": {}", msg);
        println!();
    });
}

/// Pad (or truncate with "...") to an exact display width
pub fn pad(s: &str, width: usize) -> String {
    let display_w = UnicodeWidthStr::width(s);
    if display_w <= width {
        return format!("{}{}", s, " ".repeat(width - display_w));
    }

    let target_width = width.saturating_sub(3);
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let c_width = UnicodeWidthChar::width(c).unwrap_or(1);
        if current_width + c_width > target_width {
            break;
        }
        result.push(c);
        current_width += c_width;
    }
    if width >= 3 {
        result.push_str("...");
        current_width += 3;
    }
    result.push_str(&" ".repeat(width.saturating_sub(current_width)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_accounts_for_wide_chars() {
        assert_eq!(pad("abc", 5), "abc  ");
        assert_eq!(pad("日本", 5), "日本 ");
        assert_eq!(pad("abcdefgh", 6), "abc...");
    }
}
