//! Number and date patterns for text fields
//!
//! Patterns follow the `DecimalFormat`/`SimpleDateFormat` notation report
//! templates are written with: `#,##0.00`, `0.###`, `yyyy-MM-dd HH:mm`.

use crate::value::Value;
use chrono::{NaiveDateTime, Timelike};

/// Format a value with an optional pattern
///
/// Patterns apply to numbers and date-times; other values and blank patterns
/// use the plain display form.
pub fn format_value(value: &Value, pattern: Option<&str>) -> String {
    let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) else {
        return value.to_string();
    };

    if let Some(n) = value.as_f64() {
        return render_float(pattern, n);
    }
    if let Some(ts) = value.as_timestamp() {
        return format_date(pattern, &ts);
    }
    value.to_string()
}

/// Render a float with a numeric pattern
///
/// Supports grouping (`#,##0`), minimum/maximum fraction digits (`0.00#`),
/// literal prefixes and suffixes (`$#,##0.00`, `0.0 kg`) and percent.
///
/// # Arguments
/// * `pattern` - Format pattern; only the positive subpattern is used
/// * `n` - Number to format
pub fn render_float(pattern: &str, n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let pattern = pattern.split(';').next().unwrap_or(pattern);
    let spec = NumberPattern::parse(pattern);

    let value = if spec.percent { n * 100.0 } else { n };
    let rounded = format!("{:.*}", spec.max_fraction, value.abs());
    let (int_digits, frac_digits) = rounded.split_once('.').unwrap_or((&rounded, ""));

    // Drop optional trailing zeros
    let mut frac = frac_digits.to_string();
    while frac.len() > spec.min_fraction && frac.ends_with('0') {
        frac.pop();
    }

    let mut int_part = int_digits.trim_start_matches('0').to_string();
    while int_part.len() < spec.min_integer {
        int_part.insert(0, '0');
    }
    if int_part.is_empty() && frac.is_empty() {
        int_part.push('0');
    }

    let int_str = if spec.grouping {
        format_with_thousands(&int_part, ",")
    } else {
        int_part
    };

    let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if frac.is_empty() {
        format!("{sign}{}{int_str}{}", spec.prefix, spec.suffix)
    } else {
        format!("{sign}{}{int_str}.{frac}{}", spec.prefix, spec.suffix)
    }
}

#[derive(Debug, Default, PartialEq)]
struct NumberPattern {
    prefix: String,
    suffix: String,
    grouping: bool,
    min_integer: usize,
    min_fraction: usize,
    max_fraction: usize,
    percent: bool,
}

impl NumberPattern {
    fn parse(pattern: &str) -> Self {
        let is_core = |c: char| matches!(c, '#' | '0' | ',' | '.');
        let start = pattern.find(is_core);
        let end = pattern.rfind(is_core);

        let (prefix, core, suffix) = match (start, end) {
            (Some(start), Some(end)) => (&pattern[..start], &pattern[start..=end], &pattern[end + 1..]),
            _ => (pattern, "", ""),
        };

        let (int_pattern, frac_pattern) = core.split_once('.').unwrap_or((core, ""));

        Self {
            prefix: unquote(prefix),
            suffix: unquote(suffix),
            grouping: int_pattern.contains(','),
            min_integer: int_pattern.chars().filter(|c| *c == '0').count(),
            min_fraction: frac_pattern.chars().filter(|c| *c == '0').count(),
            max_fraction: frac_pattern
                .chars()
                .filter(|c| *c == '0' || *c == '#')
                .count(),
            percent: prefix.contains('%') || suffix.contains('%'),
        }
    }
}

fn unquote(literal: &str) -> String {
    literal.replace("''", "\u{0}").replace('\'', "").replace('\u{0}', "'")
}

/// Format a digit string with thousand separators
fn format_with_thousands(digits: &str, sep: &str) -> String {
    let mut result = String::new();

    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert_str(0, sep);
        }
        result.insert(0, c);
    }

    result
}

/// Format a date-time with a `SimpleDateFormat`-style pattern
///
/// Letters outside the supported set are copied verbatim; text in single
/// quotes is literal.
pub fn format_date(pattern: &str, ts: &NaiveDateTime) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote, otherwise a quoted literal
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '\'' {
                out.push(chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        out.push_str(&date_token(c, run, ts));
        i += run;
    }

    out
}

fn date_token(letter: char, run: usize, ts: &NaiveDateTime) -> String {
    let spec = match (letter, run) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('a', _) => "%p",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        ('S', _) => {
            let digits = run.min(9);
            let fraction = ts.nanosecond() % 1_000_000_000 / 10u32.pow(9 - digits as u32);
            return format!("{fraction:0digits$}");
        }
        _ => return std::iter::repeat(letter).take(run).collect(),
    };
    ts.format(spec).to_string()
}
