use super::Email;
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum DomainPatternError {
    #[error("email domain pattern is empty")]
    Empty,
    #[error("email domain pattern does not compile: {0}")]
    Compile(#[from] regex::Error),
}

/// Allow-list of email domains described by one glob pattern.
///
/// Supported syntax: `*` (any run of characters), `?` (one character),
/// `[abc]` / `[a-z]` / `[!abc]` classes and `\` escapes. Braces, `!` negation
/// of the whole pattern, `**` and extglob groups have no special meaning.
///
/// Matching is case-sensitive. Emails are lowercased before matching, so a
/// pattern containing upper-case letters never matches them.
#[derive(Debug, Clone)]
pub struct EmailDomainValidator {
    pattern: String,
    matcher: Regex,
}

impl EmailDomainValidator {
    pub fn new(pattern: &str) -> Result<Self, DomainPatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(DomainPatternError::Empty);
        }
        let matcher = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// `true` when `raw` is a well-formed address whose domain matches.
    pub fn is_allowed(&self, raw: &str) -> bool {
        Email::parse(raw).is_some_and(|email| self.allows(&email))
    }

    pub fn allows(&self, email: &Email) -> bool {
        self.matcher.is_match(email.domain())
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '\\' => {
                match chars.get(i + 1) {
                    Some(next) => {
                        push_literal(&mut out, *next);
                        i += 1;
                    }
                    None => push_literal(&mut out, '\\'),
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end;
                }
                None => push_literal(&mut out, '['),
            },
            other => push_literal(&mut out, other),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `open`, if any.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if matches!(chars.get(j), Some('!') | Some('^')) {
        j += 1;
    }
    // a leading `]` is a member, not the terminator
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn push_class(out: &mut String, body: &[char]) {
    let (negated, body) = match body.first() {
        Some('!') | Some('^') => (true, &body[1..]),
        _ => (false, body),
    };

    out.push('[');
    if negated {
        out.push('^');
    }
    for (k, c) in body.iter().enumerate() {
        let is_range = *c == '-'
            && k > 0
            && k + 1 < body.len()
            && body[k - 1] != '-'
            && body[k + 1] != '-';
        match c {
            '-' if is_range => out.push('-'),
            '\\' | '[' | ']' | '^' | '&' | '~' | '-' => {
                out.push('\\');
                out.push(*c);
            }
            _ => out.push(*c),
        }
    }
    out.push(']');
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}
