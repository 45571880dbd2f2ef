//! Date token normalization.
//!
//! Raw date tokens are parsed into calendar dates and re-rendered with a
//! token pattern such as `YYYYMMDD`, so every symbol's fields share one
//! sortable key format regardless of the source file's date style.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tyosis_core::{Error, Result};

/// Date-only formats accepted in strict mode.
const ISO_LIKE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Date-time formats accepted in strict mode; the time part is dropped.
const ISO_LIKE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Output pattern built from `YYYY`/`YY`, `MMMM`/`MMM`/`MM`/`M` and `DD`/`D`
/// tokens. Text inside `[...]` and any other character is copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    strftime: String,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::config("date format must not be empty"));
        }

        const TOKENS: &[(&str, &str)] = &[
            ("YYYY", "%Y"),
            ("YY", "%y"),
            ("MMMM", "%B"),
            ("MMM", "%b"),
            ("MM", "%m"),
            ("M", "%-m"),
            ("DD", "%d"),
            ("D", "%-d"),
        ];

        let mut strftime = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;
        'outer: while let Some(c) = rest.chars().next() {
            if c == '[' {
                let Some(end) = rest.find(']') else {
                    return Err(Error::config(format!("unterminated '[' in date format '{pattern}'")));
                };
                push_literal(&mut strftime, &rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
            for (token, spec) in TOKENS {
                if let Some(tail) = rest.strip_prefix(token) {
                    strftime.push_str(spec);
                    rest = tail;
                    continue 'outer;
                }
            }
            push_literal(&mut strftime, &rest[..c.len_utf8()]);
            rest = &rest[c.len_utf8()..];
        }

        Ok(Self { strftime })
    }

    /// Render a date with this pattern.
    pub fn render(&self, date: NaiveDate) -> String {
        date.format(&self.strftime).to_string()
    }
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

/// Parse a token with the ISO-like formats.
pub fn parse_iso_like(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if let Some(date) = ISO_LIKE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.date_naive());
    }
    ISO_LIKE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
        .map(|dt| dt.date())
}

/// Turns raw date tokens into field keys.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    convert: bool,
    strict: bool,
    pattern: DatePattern,
}

impl DateNormalizer {
    pub fn new(convert: bool, strict: bool, pattern: DatePattern) -> Self {
        Self {
            convert,
            strict,
            pattern,
        }
    }

    /// Normalize a token, or `None` if it cannot be parsed.
    ///
    /// Without conversion the token is returned unchanged. In lenient mode an
    /// 8-digit token is taken as already normalized and `DD/MM/YYYY` is tried
    /// before the ISO-like formats.
    pub fn normalize(&self, token: &str) -> Option<String> {
        if !self.convert {
            return Some(token.to_string());
        }

        let trimmed = token.trim();
        if !self.strict {
            if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Some(trimmed.to_string());
            }
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
                return Some(self.pattern.render(date));
            }
        }

        parse_iso_like(trimmed).map(|date| self.pattern.render(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalizer(strict: bool, pattern: &str) -> DateNormalizer {
        DateNormalizer::new(true, strict, DatePattern::parse(pattern).unwrap())
    }

    #[test]
    fn test_pattern_default() {
        let pattern = DatePattern::parse("YYYYMMDD").unwrap();
        assert_eq!(pattern.render(ymd(2020, 1, 2)), "20200102");
    }

    #[test]
    fn test_pattern_tokens() {
        let date = ymd(2021, 3, 7);
        assert_eq!(DatePattern::parse("YYYY-MM-DD").unwrap().render(date), "2021-03-07");
        assert_eq!(DatePattern::parse("D/M/YY").unwrap().render(date), "7/3/21");
        assert_eq!(DatePattern::parse("DD MMM YYYY").unwrap().render(date), "07 Mar 2021");
        assert_eq!(DatePattern::parse("MMMM D").unwrap().render(date), "March 7");
    }

    #[test]
    fn test_pattern_literals() {
        let date = ymd(2021, 3, 7);
        assert_eq!(DatePattern::parse("[day] DD%").unwrap().render(date), "day 07%");
        assert!(DatePattern::parse("[oops").is_err());
        assert!(DatePattern::parse("").is_err());
    }

    #[test]
    fn test_no_conversion_is_identity() {
        let normalizer = DateNormalizer::new(false, true, DatePattern::parse("YYYYMMDD").unwrap());
        assert_eq!(normalizer.normalize("not-a-date").as_deref(), Some("not-a-date"));
        assert_eq!(normalizer.normalize(" 2020-01-02").as_deref(), Some(" 2020-01-02"));
    }

    #[test]
    fn test_strict_iso_like_inputs() {
        let n = normalizer(true, "YYYYMMDD");
        assert_eq!(n.normalize("2020-01-02").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("2020/01/02").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("2020-01-02T15:30:00").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("2020-01-02T15:30:00Z").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("2 Jan 2020").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("Jan 2, 2020").as_deref(), Some("20200102"));
    }

    #[test]
    fn test_strict_rejects() {
        let n = normalizer(true, "YYYYMMDD");
        assert_eq!(n.normalize("not-a-date"), None);
        assert_eq!(n.normalize("2020-13-01"), None);
        assert_eq!(n.normalize("20200102"), None);
        assert_eq!(n.normalize("02/01/2020"), None);
    }

    #[test]
    fn test_lenient_passthrough_and_day_first() {
        let n = normalizer(false, "YYYY-MM-DD");
        assert_eq!(n.normalize("20200102").as_deref(), Some("20200102"));
        assert_eq!(n.normalize("02/01/2020").as_deref(), Some("2020-01-02"));
        assert_eq!(n.normalize("2020-01-02").as_deref(), Some("2020-01-02"));
        assert_eq!(n.normalize("2020010").as_deref(), None);
        assert_eq!(n.normalize("not-a-date"), None);
    }
}
