//! Path template compiler.
//!
//! A template such as `/users/:id/posts/:post` is split into literal text and
//! delimiter-bounded argument names, then compiled into an anchored regex:
//! every argument becomes a `([^/]+)` capture and literals are escaped.

use crate::server::NamedArgs;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Priority weight per literal byte of a template.
pub const MULTIPLIER_EXACT_PATTERN: usize = 10;

/// Priority weight per named argument of a template.
pub const MULTIPLIER_NAMED_ARGS: usize = 2;

pub const DEFAULT_START: &str = ":";
pub const DEFAULT_END: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Literal(String),
    Arg(&'a str),
}

#[derive(Debug)]
enum Compiled {
    Exact(String),
    Template {
        regex: Regex,
        keys: Vec<Arc<str>>,
        literal_len: usize,
    },
}

/// A compiled path template, shared by every clone of its matcher.
#[derive(Debug)]
pub struct CompiledPattern {
    compiled: Compiled,
}

impl CompiledPattern {
    /// Compile `pattern` with the given delimiters.
    ///
    /// Returns `None` when the pattern or a delimiter is empty, or when the
    /// resulting regex does not compile.
    #[must_use]
    pub fn compile(pattern: &str, start: &str, end: &str) -> Option<Self> {
        if pattern.is_empty() || start.is_empty() || end.is_empty() {
            return None;
        }

        let pieces = split_pieces(pattern, start, end);
        let key_count = pieces
            .iter()
            .filter(|p| matches!(p, Piece::Arg(_)))
            .count();
        if key_count == 0 {
            return Some(Self {
                compiled: Compiled::Exact(pattern.to_string()),
            });
        }

        let mut source = String::with_capacity(pattern.len() + key_count * 8 + 2);
        source.push('^');
        let mut keys = Vec::with_capacity(key_count);
        let mut literal_len = 0;
        for piece in &pieces {
            match piece {
                Piece::Literal(text) => {
                    literal_len += text.len();
                    source.push_str(&regex::escape(text));
                }
                Piece::Arg(name) => {
                    keys.push(Arc::from(*name));
                    source.push_str("([^/]+)");
                }
            }
        }
        source.push('$');

        match Regex::new(&source) {
            Ok(regex) => Some(Self {
                compiled: Compiled::Template {
                    regex,
                    keys,
                    literal_len,
                },
            }),
            Err(err) => {
                debug!(pattern = %pattern, error = %err, "Pattern failed to compile");
                None
            }
        }
    }

    /// True when the template has no named arguments and compares verbatim.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self.compiled, Compiled::Exact(_))
    }

    /// Argument names in order of appearance, duplicates kept.
    #[must_use]
    pub fn keys(&self) -> &[Arc<str>] {
        match &self.compiled {
            Compiled::Exact(_) => &[],
            Compiled::Template { keys, .. } => keys,
        }
    }

    /// Specificity used when no explicit priority was given.
    #[must_use]
    pub fn default_priority(&self) -> f64 {
        let score = match &self.compiled {
            Compiled::Exact(pattern) => pattern.len() * MULTIPLIER_EXACT_PATTERN,
            Compiled::Template {
                keys, literal_len, ..
            } => literal_len * MULTIPLIER_EXACT_PATTERN + keys.len() * MULTIPLIER_NAMED_ARGS,
        };
        score as f64
    }

    /// Match `path`, appending captured values to `args` on success.
    ///
    /// Nothing is written when the path does not fit the template.
    pub fn parse(&self, path: &str, args: &mut NamedArgs) -> bool {
        match &self.compiled {
            Compiled::Exact(pattern) => path == pattern,
            Compiled::Template { regex, keys, .. } => {
                let Some(caps) = regex.captures(path) else {
                    return false;
                };
                for (i, key) in keys.iter().enumerate() {
                    if let Some(value) = caps.get(i + 1) {
                        args.add(Arc::clone(key), value.as_str().to_string());
                    }
                }
                true
            }
        }
    }
}

/// Walk the template, separating literal text from argument names.
///
/// A name starts after `start` and runs to the next `end` or to the end of the
/// template. A `/` end delimiter stays part of the literal text since it also
/// separates path segments; any other end delimiter is consumed. A start
/// delimiter with an empty name is kept as literal text.
fn split_pieces<'a>(pattern: &'a str, start: &str, end: &str) -> Vec<Piece<'a>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(start) {
            let (name, remainder) = match after.find(end) {
                Some(idx) if end == DEFAULT_END => (&after[..idx], &after[idx..]),
                Some(idx) => (&after[..idx], &after[idx + end.len()..]),
                None => (after, ""),
            };
            if name.is_empty() {
                literal.push_str(start);
                rest = after;
                continue;
            }
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Arg(name));
            rest = remainder;
            continue;
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            literal.push(c);
        }
        rest = chars.as_str();
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str, start: &str, end: &str, path: &str) -> Option<Vec<(String, String)>> {
        let compiled = CompiledPattern::compile(pattern, start, end)?;
        let mut args = NamedArgs::new();
        if !compiled.parse(path, &mut args) {
            return None;
        }
        Some(
            args.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn abc() -> Vec<(String, String)> {
        vec![
            ("a".to_string(), "x".to_string()),
            ("b".to_string(), "yyy".to_string()),
            ("c".to_string(), "z".to_string()),
        ]
    }

    #[test]
    fn test_split_colon_start() {
        assert_eq!(
            split_pieces("/:a/:b", ":", "/"),
            vec![
                Piece::Literal("/".to_string()),
                Piece::Arg("a"),
                Piece::Literal("/".to_string()),
                Piece::Arg("b"),
            ]
        );
    }

    #[test]
    fn test_split_empty_name_is_literal() {
        assert_eq!(
            split_pieces("/a:/b", ":", "/"),
            vec![Piece::Literal("/a:/b".to_string())]
        );
    }

    #[test]
    fn test_three_delimiter_styles_agree() {
        assert_eq!(parse("/:a/:b/:c", ":", "/", "/x/yyy/z"), Some(abc()));
        assert_eq!(parse("/:a:/:b:/:c:", ":", ":", "/x/yyy/z"), Some(abc()));
        assert_eq!(parse("/{{a}}/{{b}}/{{c}}", "{{", "}}", "/x/yyy/z"), Some(abc()));
    }

    #[test]
    fn test_missing_segment_is_no_match() {
        assert_eq!(parse("/:a/:b/:c", ":", "/", "/x/yyy"), None);
        assert_eq!(parse("/:a/:b/:c", ":", "/", "/x/yyy/"), None);
    }

    #[test]
    fn test_exact_pattern() {
        let compiled = CompiledPattern::compile("/health", ":", "/").unwrap();
        assert!(compiled.is_exact());
        assert_eq!(compiled.default_priority(), 70.0);
        let mut args = NamedArgs::new();
        assert!(compiled.parse("/health", &mut args));
        assert!(!compiled.parse("/health/", &mut args));
        assert!(args.is_empty());
    }

    #[test]
    fn test_template_priority() {
        // literal "/users/" is 7 bytes, one argument
        let compiled = CompiledPattern::compile("/users/:id", ":", "/").unwrap();
        assert_eq!(compiled.default_priority(), 72.0);
        assert_eq!(compiled.keys().len(), 1);
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(
            parse("/v1.0/:id", ":", "/", "/v1.0/7"),
            Some(vec![("id".to_string(), "7".to_string())])
        );
        assert_eq!(parse("/v1.0/:id", ":", "/", "/v1x0/7"), None);
    }

    #[test]
    fn test_empty_inputs_do_not_compile() {
        assert!(CompiledPattern::compile("", ":", "/").is_none());
        assert!(CompiledPattern::compile("/x", "", "/").is_none());
    }
}
