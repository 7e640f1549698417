use super::pattern::{CompiledPattern, DEFAULT_END, DEFAULT_START};
use crate::server::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Method tokens accepted by [`MuxMatcher::methods`], besides the `*` wildcard.
pub const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

pub const METHOD_WILDCARD: &str = "*";

/// Decides whether a registered handler applies to a request.
///
/// Construction never fails. [`MuxMatcher::test`] validates the configuration
/// and settles the priority; a matcher whose `test` returns false is never
/// registered. Serialized form is externally tagged, e.g.
/// `{"and":{"priority":0.0,"muxes":[{"methods":{...}},{"pattern":{...}}]}}`,
/// which is also the shape route table files use.
///
/// Two matchers are duplicates when they compare equal: same variant, same
/// priority and the same normalized parameters (compiled state is ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxMatcher {
    Mock(MockMatcher),
    Methods(MethodsMatcher),
    Pattern(PatternMatcher),
    And(AndMatcher),
    Or(OrMatcher),
}

/// Fixed-result matcher for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockMatcher {
    #[serde(default)]
    priority: f64,
    test: bool,
    #[serde(rename = "match")]
    matches: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodsMatcher {
    #[serde(default)]
    priority: f64,
    methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatcher {
    #[serde(default)]
    priority: f64,
    pattern: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    #[serde(skip)]
    compiled: Option<Arc<CompiledPattern>>,
}

impl PartialEq for PatternMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
            && self.pattern == other.pattern
            && self.start == other.start
            && self.end == other.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndMatcher {
    #[serde(default)]
    priority: f64,
    muxes: Vec<MuxMatcher>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrMatcher {
    #[serde(default)]
    priority: f64,
    muxes: Vec<MuxMatcher>,
}

impl MuxMatcher {
    #[must_use]
    pub fn mock(priority: f64, test: bool, matches: bool) -> Self {
        Self::Mock(MockMatcher {
            priority,
            test,
            matches,
        })
    }

    /// Match any of `methods`; `*` matches every method.
    ///
    /// The list is sorted and deduplicated here so equal sets compare equal.
    pub fn methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut methods: Vec<String> = methods.into_iter().map(Into::into).collect();
        normalize_methods(&mut methods);
        Self::Methods(MethodsMatcher {
            priority: 0.0,
            methods,
        })
    }

    /// Path template with the default `:` / `/` delimiters, e.g. `/users/:id`.
    #[must_use]
    pub fn pattern(pattern: &str) -> Self {
        Self::pattern_with(0.0, pattern, DEFAULT_START, DEFAULT_END)
    }

    /// Path template with explicit priority and delimiters.
    ///
    /// Empty delimiters fall back to `:` and `/`; a zero priority is computed
    /// from the template by [`MuxMatcher::test`].
    #[must_use]
    pub fn pattern_with(priority: f64, pattern: &str, start: &str, end: &str) -> Self {
        Self::Pattern(PatternMatcher {
            priority,
            pattern: pattern.to_string(),
            start: or_default(start, DEFAULT_START),
            end: or_default(end, DEFAULT_END),
            compiled: None,
        })
    }

    /// All children must match. A zero priority becomes the sum of the
    /// children's priorities.
    #[must_use]
    pub fn and(priority: f64, muxes: Vec<MuxMatcher>) -> Self {
        Self::And(AndMatcher {
            priority,
            muxes: unique(muxes),
        })
    }

    /// Any child may match; every child is consulted. A zero priority becomes
    /// the mean of the children's priorities.
    #[must_use]
    pub fn or(priority: f64, muxes: Vec<MuxMatcher>) -> Self {
        Self::Or(OrMatcher {
            priority,
            muxes: unique(muxes),
        })
    }

    /// Validate the configuration and settle the priority.
    ///
    /// Called once before registration; calling it again is harmless.
    pub fn test(&mut self) -> bool {
        match self {
            Self::Mock(m) => m.test,
            Self::Methods(m) => m.test(),
            Self::Pattern(m) => m.test(),
            Self::And(m) => m.test(),
            Self::Or(m) => m.test(),
        }
    }

    /// Evaluation order key, higher first. Meaningful after [`MuxMatcher::test`].
    #[must_use]
    pub fn priority(&self) -> f64 {
        match self {
            Self::Mock(m) => m.priority,
            Self::Methods(m) => m.priority,
            Self::Pattern(m) => m.priority,
            Self::And(m) => m.priority,
            Self::Or(m) => m.priority,
        }
    }

    /// Evaluate against `r`. Pattern matchers append extracted named
    /// arguments to the request scope.
    pub fn matches(&self, r: &mut Request) -> bool {
        match self {
            Self::Mock(m) => m.matches,
            Self::Methods(m) => m
                .methods
                .iter()
                .any(|method| method == METHOD_WILDCARD || method == r.method().as_str()),
            Self::Pattern(m) => {
                let Some(compiled) = &m.compiled else {
                    return false;
                };
                let (path, args) = r.path_and_args_mut();
                compiled.parse(path, args)
            }
            Self::And(m) => !m.muxes.is_empty() && m.muxes.iter().all(|child| child.matches(r)),
            Self::Or(m) => {
                let mut matched = false;
                for child in &m.muxes {
                    if child.matches(r) {
                        matched = true;
                    }
                }
                matched
            }
        }
    }
}

impl MethodsMatcher {
    fn test(&mut self) -> bool {
        normalize_methods(&mut self.methods);
        if self.methods.is_empty() {
            return false;
        }
        let mut wildcard = false;
        for method in &self.methods {
            if method == METHOD_WILDCARD {
                wildcard = true;
            } else if !STANDARD_METHODS.contains(&method.as_str()) {
                return false;
            }
        }
        self.priority = if wildcard {
            0.0
        } else {
            (10 - self.methods.len().min(9)) as f64
        };
        true
    }
}

impl PatternMatcher {
    fn test(&mut self) -> bool {
        if self.pattern.is_empty() {
            return false;
        }
        if self.start.is_empty() {
            self.start = DEFAULT_START.to_string();
        }
        if self.end.is_empty() {
            self.end = DEFAULT_END.to_string();
        }

        let Some(compiled) = CompiledPattern::compile(&self.pattern, &self.start, &self.end) else {
            self.compiled = None;
            return false;
        };
        if compiled.is_exact() {
            self.start.clear();
            self.end.clear();
            self.priority = compiled.default_priority();
        } else if self.priority == 0.0 {
            self.priority = compiled.default_priority();
        }
        self.compiled = Some(Arc::new(compiled));
        true
    }
}

impl AndMatcher {
    fn test(&mut self) -> bool {
        if self.muxes.is_empty() {
            return false;
        }
        let mut passed = true;
        for child in &mut self.muxes {
            passed &= child.test();
        }
        self.muxes = unique(std::mem::take(&mut self.muxes));
        if self.priority == 0.0 {
            self.priority = self.muxes.iter().map(MuxMatcher::priority).sum();
        }
        passed
    }
}

impl OrMatcher {
    fn test(&mut self) -> bool {
        self.muxes.retain_mut(MuxMatcher::test);
        self.muxes = unique(std::mem::take(&mut self.muxes));
        if self.muxes.is_empty() {
            return false;
        }
        if self.priority == 0.0 {
            let total: f64 = self.muxes.iter().map(MuxMatcher::priority).sum();
            self.priority = total / self.muxes.len() as f64;
        }
        true
    }
}

fn normalize_methods(methods: &mut Vec<String>) {
    methods.sort();
    methods.dedup();
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Keep the first of every group of equal matchers.
fn unique(muxes: Vec<MuxMatcher>) -> Vec<MuxMatcher> {
    let mut out: Vec<MuxMatcher> = Vec::with_capacity(muxes.len());
    for mux in muxes {
        if !out.contains(&mux) {
            out.push(mux);
        }
    }
    out
}

fn write_children(f: &mut fmt::Formatter<'_>, muxes: &[MuxMatcher]) -> fmt::Result {
    for (i, mux) in muxes.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{mux}")?;
    }
    Ok(())
}

impl fmt::Display for MuxMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock(m) => write!(
                f,
                "Mock:{{Priority:{:.2}, Test:{}, Match:{}}}",
                m.priority, m.test, m.matches
            ),
            Self::Methods(m) => write!(
                f,
                "Methods:{{Priority:{:.2}, Methods:[{}]}}",
                m.priority,
                m.methods.join(" ")
            ),
            Self::Pattern(m) if m.start.is_empty() && m.end.is_empty() => write!(
                f,
                "Pattern:{{Priority:{:.2}, Pattern:{}}}",
                m.priority, m.pattern
            ),
            Self::Pattern(m) => write!(
                f,
                "Pattern:{{Priority:{:.2}, Pattern:{}, Start:{}, End:{}}}",
                m.priority, m.pattern, m.start, m.end
            ),
            Self::And(m) => {
                write!(f, "And:{{Priority:{:.2}, Mux:[", m.priority)?;
                write_children(f, &m.muxes)?;
                f.write_str("]}")
            }
            Self::Or(m) => {
                write!(f, "Or:{{Priority:{:.2}, Mux:[", m.priority)?;
                write_children(f, &m.muxes)?;
                f.write_str("]}")
            }
        }
    }
}
