//! Date-format templates for destination filenames.
//!
//! Templates use a strftime-like syntax restricted to an allow-list of
//! placeholders: `%Y`, `%m`, `%d`, `%H`, `%M`, `%S`, `%f` and `%%`.

use crate::error::ConfigError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Characters that are not allowed in a filename on common filesystems
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Template used when the configuration does not name one
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d at %H-%M-%S (%f)";

const ALLOWED_PLACEHOLDERS: &str = "%Y, %m, %d, %H, %M, %S, %f";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    SubSecond,
}

/// A validated filename template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl DateTemplate {
    /// Parse and validate a template.
    ///
    /// Fails on unknown placeholders, on templates without any date/time
    /// placeholder, and on templates whose rendered output would contain a
    /// character that is illegal in filenames.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let placeholder = match chars.next() {
                Some('%') => {
                    literal.push('%');
                    continue;
                }
                Some('Y') => Token::Year,
                Some('m') => Token::Month,
                Some('d') => Token::Day,
                Some('H') => Token::Hour,
                Some('M') => Token::Minute,
                Some('S') => Token::Second,
                Some('f') => Token::SubSecond,
                Some(other) => {
                    return Err(invalid(format!(
                        "unsupported placeholder %{} (allowed: {})",
                        other, ALLOWED_PLACEHOLDERS
                    )))
                }
                None => return Err(invalid("template ends with a lone '%'".to_string())),
            };

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(placeholder);
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        if tokens.iter().all(|t| matches!(t, Token::Literal(_))) {
            return Err(invalid(format!(
                "must contain at least one date/time placeholder ({})",
                ALLOWED_PLACEHOLDERS
            )));
        }

        let parsed = Self {
            source: template.to_string(),
            tokens,
        };

        let sample = NaiveDate::from_ymd_opt(2024, 12, 31)
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .ok_or_else(|| invalid("could not build a sample date".to_string()))?;
        let rendered = parsed.render(&sample, "ABC");
        if let Some(bad) = rendered
            .chars()
            .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
        {
            return Err(invalid(format!(
                "produces the character {:?}, which is not allowed in filenames",
                bad
            )));
        }

        Ok(parsed)
    }

    /// The template text as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template renders a sub-second component
    pub fn has_subseconds(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::SubSecond))
    }

    /// Render the template for a date.
    ///
    /// `%f` renders milliseconds (3 digits). When the date carries no
    /// sub-second value at all, `zero_subsecond_token` is used instead so
    /// bursts of same-second photos don't all end in `000`.
    pub fn render(&self, date: &NaiveDateTime, zero_subsecond_token: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Year => out.push_str(&format!("{:04}", date.year())),
                Token::Month => out.push_str(&format!("{:02}", date.month())),
                Token::Day => out.push_str(&format!("{:02}", date.day())),
                Token::Hour => out.push_str(&format!("{:02}", date.hour())),
                Token::Minute => out.push_str(&format!("{:02}", date.minute())),
                Token::Second => out.push_str(&format!("{:02}", date.second())),
                Token::SubSecond => {
                    let micros = (date.nanosecond() % 1_000_000_000) / 1_000;
                    if micros == 0 {
                        out.push_str(zero_subsecond_token);
                    } else {
                        out.push_str(&format!("{:03}", micros / 1_000));
                    }
                }
            }
        }
        out
    }
}

impl Default for DateTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_DATE_FORMAT.to_string(),
            tokens: vec![
                Token::Year,
                Token::Literal("-".to_string()),
                Token::Month,
                Token::Literal("-".to_string()),
                Token::Day,
                Token::Literal(" at ".to_string()),
                Token::Hour,
                Token::Literal("-".to_string()),
                Token::Minute,
                Token::Literal("-".to_string()),
                Token::Second,
                Token::Literal(" (".to_string()),
                Token::SubSecond,
                Token::Literal(")".to_string()),
            ],
        }
    }
}
