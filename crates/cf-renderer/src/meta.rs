//! Code block metadata parsing.
//!
//! The metadata string is the text after the language on a code fence:
//!
//! ````markdown
//! ```js title="app.js" {2,4-6} mark=/todo/ wrap
//! ````
//!
//! It is split into [`MetaToken`]s: bare flags, quoted strings, bare range
//! lists and `key=value` pairs whose value is a string, a range list or a
//! regular expression.

use std::ops::RangeInclusive;

use crate::error::ValidationError;

/// Value of a `key=value` metadata option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaValue {
    /// Plain or quoted string: `key=value`, `key="value"`, `key='value'`.
    Text(String),
    /// Range list in braces, without the braces: `key={1,3-5}`.
    Ranges(String),
    /// Regular expression source, without slashes: `key=/pattern/`.
    Regex(String),
}

/// A single metadata token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaToken {
    /// Bare word (`wrap`).
    Flag(String),
    /// Bare quoted string (`"Example"`).
    Text(String),
    /// Bare range list (`{1,3-5}`), without the braces.
    Ranges(String),
    /// `key=value` option.
    KeyValue {
        /// Option name.
        key: String,
        /// Option value.
        value: MetaValue,
    },
}

/// Parsed code block metadata.
///
/// When a key occurs more than once, single-value accessors return the last
/// occurrence and [`get_strings`](Self::get_strings) returns all of them.
///
/// # Example
///
/// ```
/// use cf_renderer::MetaOptions;
///
/// let meta = MetaOptions::parse(r#"title="My app" {2} mark=/fo+/ wrap"#).unwrap();
/// assert_eq!(meta.get_string("title"), Some("My app"));
/// assert_eq!(meta.get_regex("mark"), Some("fo+"));
/// assert_eq!(meta.get_boolean("wrap"), Some(true));
/// assert_eq!(meta.plain_ranges(), vec![2..=2]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaOptions {
    raw: String,
    tokens: Vec<MetaToken>,
}

impl MetaOptions {
    /// Parse a metadata string.
    ///
    /// Backslash escapes the next character inside quoted strings and regexes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnterminatedToken`] if a quoted string,
    /// range list or regex is not closed.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let mut tokens = Vec::new();
        let mut remaining = input;

        loop {
            remaining = remaining.trim_start();
            let Some(first) = remaining.chars().next() else {
                break;
            };
            let position = input.len() - remaining.len();

            match first {
                '"' | '\'' => {
                    let (text, rest) = read_quoted(remaining, position)?;
                    tokens.push(MetaToken::Text(text));
                    remaining = rest;
                }
                '{' => {
                    let (ranges, rest) = read_braces(remaining, position)?;
                    tokens.push(MetaToken::Ranges(ranges.to_owned()));
                    remaining = rest;
                }
                _ => {
                    let end = remaining
                        .find(|c: char| c.is_whitespace() || c == '=')
                        .unwrap_or(remaining.len());
                    let key = &remaining[..end];
                    let after = &remaining[end..];

                    if key.is_empty() {
                        // Stray `=`: keep the whole word as a flag
                        let end = remaining
                            .find(char::is_whitespace)
                            .unwrap_or(remaining.len());
                        let word = &remaining[..end];
                        check_bare_word(word, position)?;
                        tokens.push(MetaToken::Flag(word.to_owned()));
                        remaining = &remaining[end..];
                    } else if let Some(value_str) = after.strip_prefix('=') {
                        check_bare_word(key, position)?;
                        let (value, rest) = read_value(value_str, position + end + 1)?;
                        tokens.push(MetaToken::KeyValue {
                            key: key.to_owned(),
                            value,
                        });
                        remaining = rest;
                    } else {
                        check_bare_word(key, position)?;
                        tokens.push(MetaToken::Flag(key.to_owned()));
                        remaining = after;
                    }
                }
            }
        }

        Ok(Self {
            raw: input.to_owned(),
            tokens,
        })
    }

    /// Original metadata string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All tokens in source order.
    #[must_use]
    pub fn tokens(&self) -> &[MetaToken] {
        &self.tokens
    }

    /// Whether the metadata has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn values<'a, 'k>(
        &'a self,
        key: &'k str,
    ) -> impl DoubleEndedIterator<Item = &'a MetaValue> + use<'a, 'k> {
        self.tokens.iter().filter_map(move |token| match token {
            MetaToken::KeyValue { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// Last string value of `key`.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values(key).rev().find_map(|value| match value {
            MetaValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// All string values of `key` in source order.
    #[must_use]
    pub fn get_strings(&self, key: &str) -> Vec<&str> {
        self.values(key)
            .filter_map(|value| match value {
                MetaValue::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Boolean option.
    ///
    /// A bare `key` flag is `true`; `key=true` and `key=false` are parsed.
    /// Other values yield `None`.
    #[must_use]
    pub fn get_boolean(&self, key: &str) -> Option<bool> {
        self.tokens.iter().rev().find_map(|token| match token {
            MetaToken::Flag(flag) if flag == key => Some(true),
            MetaToken::KeyValue {
                key: k,
                value: MetaValue::Text(s),
            } if k == key => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Integer option (`key=3`).
    #[must_use]
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get_string(key)?.trim().parse().ok()
    }

    /// Line ranges of `key={1,3-5}`, as written (1-based, inclusive).
    ///
    /// Entries that are not numbers or `a-b` pairs, and entries starting at
    /// zero, are skipped.
    #[must_use]
    pub fn get_ranges(&self, key: &str) -> Vec<RangeInclusive<usize>> {
        self.values(key)
            .filter_map(|value| match value {
                MetaValue::Ranges(s) => Some(parse_ranges(s)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Regular expression source of the last `key=/pattern/`.
    #[must_use]
    pub fn get_regex(&self, key: &str) -> Option<&str> {
        self.values(key).rev().find_map(|value| match value {
            MetaValue::Regex(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Bare quoted strings in source order.
    #[must_use]
    pub fn plain_texts(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                MetaToken::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Line ranges of all bare `{...}` lists.
    #[must_use]
    pub fn plain_ranges(&self) -> Vec<RangeInclusive<usize>> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                MetaToken::Ranges(s) => Some(parse_ranges(s)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Whether a bare flag is present.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.tokens
            .iter()
            .any(|token| matches!(token, MetaToken::Flag(f) if f == flag))
    }
}

/// Read a quoted string starting at the opening quote.
fn read_quoted(s: &str, position: usize) -> Result<(String, &str), ValidationError> {
    let mut chars = s.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ValidationError::UnterminatedToken {
            delimiter: '"',
            position,
        });
    };

    let mut text = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    text.push(escaped);
                }
            }
            c if c == quote => return Ok((text, &s[i + c.len_utf8()..])),
            c => text.push(c),
        }
    }

    Err(ValidationError::UnterminatedToken {
        delimiter: quote,
        position,
    })
}

/// Read a `{...}` list starting at the opening brace.
fn read_braces(s: &str, position: usize) -> Result<(&str, &str), ValidationError> {
    let end = s.find('}').ok_or(ValidationError::UnterminatedToken {
        delimiter: '{',
        position,
    })?;
    Ok((&s[1..end], &s[end + 1..]))
}

/// Read a `/pattern/` regex starting at the opening slash.
///
/// `\/` becomes `/`; other escapes are kept for the regex engine.
fn read_regex(s: &str, position: usize) -> Result<(String, &str), ValidationError> {
    let mut chars = s.char_indices().skip(1);
    let mut pattern = String::new();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '/')) => pattern.push('/'),
                Some((_, escaped)) => {
                    pattern.push('\\');
                    pattern.push(escaped);
                }
                None => pattern.push('\\'),
            },
            '/' => return Ok((pattern, &s[i + 1..])),
            c => pattern.push(c),
        }
    }

    Err(ValidationError::UnterminatedToken {
        delimiter: '/',
        position,
    })
}

fn read_value(s: &str, position: usize) -> Result<(MetaValue, &str), ValidationError> {
    match s.chars().next() {
        Some('"' | '\'') => {
            let (text, rest) = read_quoted(s, position)?;
            Ok((MetaValue::Text(text), rest))
        }
        Some('{') => {
            let (ranges, rest) = read_braces(s, position)?;
            Ok((MetaValue::Ranges(ranges.to_owned()), rest))
        }
        Some('/') => {
            let (pattern, rest) = read_regex(s, position)?;
            Ok((MetaValue::Regex(pattern), rest))
        }
        _ => {
            let end = s.find(char::is_whitespace).unwrap_or(s.len());
            check_bare_word(&s[..end], position)?;
            Ok((MetaValue::Text(s[..end].to_owned()), &s[end..]))
        }
    }
}

/// Reject a bare word that opens a quote it never closes (`wrap"`).
///
/// A `'` between two alphanumeric characters is an apostrophe (`it's`).
fn check_bare_word(word: &str, position: usize) -> Result<(), ValidationError> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    for quote in ['"', '\''] {
        let stray: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|&(n, &(_, c))| {
                c == quote
                    && !(quote == '\''
                        && n > 0
                        && chars[n - 1].1.is_alphanumeric()
                        && chars.get(n + 1).is_some_and(|&(_, next)| next.is_alphanumeric()))
            })
            .map(|(_, &(i, _))| i)
            .collect();
        if stray.len() % 2 == 1 {
            return Err(ValidationError::UnterminatedToken {
                delimiter: quote,
                position: position + stray[stray.len() - 1],
            });
        }
    }
    Ok(())
}

/// Parse `1, 3-5` into inclusive 1-based ranges.
///
/// Zero, reversed and non-numeric entries are dropped.
fn parse_ranges(s: &str) -> Vec<RangeInclusive<usize>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => (start.trim().parse().ok()?, end.trim().parse().ok()?),
                None => {
                    let n = part.parse().ok()?;
                    (n, n)
                }
            };
            (start > 0 && start <= end).then_some(start..=end)
        })
        .collect()
}
