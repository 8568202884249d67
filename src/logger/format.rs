//! Log formatting and output with ANSI colors and text wrapping
//!
//! Handles:
//! - Colorized console output with tag and level columns
//! - Word wrapping for long register dumps
//! - Dual output (console + file)
//! - Broken pipe handling for piped commands

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 140;

/// Format and output a log message
pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str, to_file: bool) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let base_line = format!(
        "{} [{}] [{}] ",
        time.dimmed(),
        format_tag(tag),
        format_level(level)
    );
    // time + two bracketed columns + separators
    let prefix_width = time.len() + TAG_WIDTH + LEVEL_WIDTH + 7;
    let available = MAX_LINE_LENGTH.saturating_sub(prefix_width).max(40);

    let chunks = wrap_text(message, available);
    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_plain = tag.to_plain_string();

    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            print_stdout_safe(&format!("{}{}", base_line, chunk));
        } else {
            print_stdout_safe(&format!("{}{}", " ".repeat(prefix_width), chunk));
        }

        if to_file {
            write_to_file(&format!(
                "{} [{}] [{}] {}",
                timestamp,
                tag_plain,
                level.as_str(),
                chunk
            ));
        }
    }
}

/// Format a tag with its color
fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Source => label.bright_blue().bold(),
        LogTag::Decoder => label.bright_cyan().bold(),
        LogTag::Classifier => label.bright_magenta().bold(),
        LogTag::Window => label.cyan().bold(),
        LogTag::Hub => label.bright_green().bold(),
        LogTag::Webserver => label.green().bold(),
        LogTag::Storage => label.blue().bold(),
        LogTag::Test => label.bright_blue().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

/// Format log level with its color
fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug | LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

/// Wrap text at word boundaries, respecting existing newlines
///
/// Words longer than `max_width` are kept whole on their own line.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + 1;
            if current.is_empty() {
                current = word.to_string();
            } else if needed <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_line_untouched() {
        assert_eq!(wrap_text("[230.1,229.8,231.0]", 40), vec!["[230.1,229.8,231.0]"]);
    }

    #[test]
    fn test_wrap_splits_on_words() {
        let wrapped = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(wrapped, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_wrap_keeps_newlines() {
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
    }
}
