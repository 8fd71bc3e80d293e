//! Ignore rules applied to watch events.
//!
//! Events are filtered on the watcher thread, before they are queued for the
//! hub, so noise from build artifacts and editor scratch files never costs a
//! broadcast.
//!
//! # Rule syntax
//!
//! | Pattern      | Rule                              | Matches                      |
//! |--------------|-----------------------------------|------------------------------|
//! | `node_modules` | [`IgnoreRule::Substring`]       | any path containing it       |
//! | `*.pyc`      | [`IgnoreRule::Suffix`]            | any path ending in `.pyc`    |
//!
//! Matching is case-insensitive: rules are lower-cased when they are built
//! and the path is lower-cased once per check.
//!
//! # Examples
//!
//! ```
//! use fc_watcher::{IgnoreRules, PathFilter};
//! use camino::Utf8Path;
//!
//! let rules = IgnoreRules::default().with_patterns(["*.log"]);
//!
//! assert!(rules.should_ignore(Utf8Path::new("/srv/app/.git/HEAD")));
//! assert!(rules.should_ignore(Utf8Path::new("/srv/app/lib/mod.PYC")));
//! assert!(rules.should_ignore(Utf8Path::new("/srv/app/debug.log")));
//! assert!(!rules.should_ignore(Utf8Path::new("/srv/app/results.jsonl")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

/// Patterns ignored by every [`IgnoreRules::default`] set.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    "node_modules",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".ds_store",
    "*.pyc",
    "*.pyo",
    "*.swp",
    "*.swx",
    "*.tmp",
    "*~",
];

/// Decides whether a changed path is dropped before it reaches the hub.
///
/// Implementations are called from the watcher's notification thread, so
/// they must be [`Send`] + [`Sync`] and must not block.
///
/// # Examples
///
/// ```
/// use fc_watcher::PathFilter;
/// use camino::Utf8Path;
///
/// struct OnlyJsonl;
///
/// impl PathFilter for OnlyJsonl {
///     fn should_ignore(&self, path: &Utf8Path) -> bool {
///         path.extension() != Some("jsonl")
///     }
/// }
///
/// assert!(OnlyJsonl.should_ignore(Utf8Path::new("notes.txt")));
/// ```
pub trait PathFilter: Send + Sync + 'static {
    /// Returns `true` if events for `path` must be suppressed.
    fn should_ignore(&self, path: &Utf8Path) -> bool;
}

/// A single ignore rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IgnoreRule {
    /// Matches any path containing the literal.
    Substring(String),

    /// Matches any path ending with the suffix. Written `*suffix`.
    Suffix(String),
}

impl IgnoreRule {
    /// Parses a pattern into a rule.
    ///
    /// Returns `None` for an empty pattern. A lone `*` becomes a suffix rule
    /// with an empty suffix, which matches every path.
    ///
    /// # Examples
    ///
    /// ```
    /// use fc_watcher::IgnoreRule;
    ///
    /// assert_eq!(IgnoreRule::parse("*.PYC"), Some(IgnoreRule::Suffix(".pyc".into())));
    /// assert_eq!(IgnoreRule::parse("Build"), Some(IgnoreRule::Substring("build".into())));
    /// assert_eq!(IgnoreRule::parse(""), None);
    /// ```
    #[must_use]
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }

        let lowered = pattern.to_lowercase();
        Some(match lowered.strip_prefix('*') {
            Some(suffix) => Self::Suffix(suffix.to_owned()),
            None => Self::Substring(lowered),
        })
    }

    /// Tests the rule against an already lower-cased path.
    #[inline]
    #[must_use]
    pub fn matches(&self, lowered_path: &str) -> bool {
        match self {
            Self::Substring(literal) => lowered_path.contains(literal.as_str()),
            Self::Suffix(suffix) => lowered_path.ends_with(suffix.as_str()),
        }
    }
}

impl std::fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Substring(literal) => f.write_str(literal),
            Self::Suffix(suffix) => write!(f, "*{suffix}"),
        }
    }
}

/// An immutable set of [`IgnoreRule`]s.
///
/// A path is ignored if any rule matches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    rules: SmallVec<[IgnoreRule; 16]>,
}

impl IgnoreRules {
    /// Builds a rule set from the given patterns only, without the defaults.
    ///
    /// Empty patterns are skipped.
    #[must_use]
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rules: parse_all(patterns).collect(),
        }
    }

    /// Extends the set with additional patterns.
    ///
    /// Patterns already present are not added twice.
    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in parse_all(patterns) {
            if !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
        self
    }

    /// Returns the rules in the order they are checked.
    #[must_use]
    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set has no rules and ignores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_all<I, S>(patterns: I) -> impl Iterator<Item = IgnoreRule>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| IgnoreRule::parse(pattern.as_ref()))
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::from_patterns(DEFAULT_IGNORE_PATTERNS)
    }
}

impl PathFilter for IgnoreRules {
    fn should_ignore(&self, path: &Utf8Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let lowered = path.as_str().to_lowercase();
        self.rules.iter().any(|rule| rule.matches(&lowered))
    }
}

impl<F: PathFilter + ?Sized> PathFilter for Box<F> {
    fn should_ignore(&self, path: &Utf8Path) -> bool {
        (**self).should_ignore(path)
    }
}

impl<F: PathFilter + ?Sized> PathFilter for std::sync::Arc<F> {
    fn should_ignore(&self, path: &Utf8Path) -> bool {
        (**self).should_ignore(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(rules: &IgnoreRules, path: &str) -> bool {
        rules.should_ignore(Utf8Path::new(path))
    }

    #[test]
    fn test_default_rules() {
        let rules = IgnoreRules::default();
        assert_eq!(rules.len(), DEFAULT_IGNORE_PATTERNS.len());

        assert!(ignored(&rules, "/repo/.git/objects/ab/cdef"));
        assert!(ignored(&rules, "/repo/pkg/__pycache__/mod.cpython-312.pyc"));
        assert!(ignored(&rules, "/repo/web/node_modules/react/index.js"));
        assert!(ignored(&rules, "/repo/.DS_Store"));
        assert!(ignored(&rules, "/repo/notes.txt~"));
        assert!(ignored(&rules, "/repo/.main.rs.swp"));

        assert!(!ignored(&rules, "/repo/logs/run.jsonl"));
        assert!(!ignored(&rules, "/repo/src/main.rs"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let rules = IgnoreRules::from_patterns(["Build", "*.LOG"]);

        assert!(ignored(&rules, "/srv/BUILD/out.bin"));
        assert!(ignored(&rules, "/srv/build/out.bin"));
        assert!(ignored(&rules, "/srv/app.log"));
        assert!(ignored(&rules, "/srv/APP.Log"));
    }

    #[test]
    fn test_suffix_only_matches_at_end() {
        let rules = IgnoreRules::from_patterns(["*.tmp"]);

        assert!(ignored(&rules, "/a/b/c.tmp"));
        assert!(!ignored(&rules, "/a/b.tmp/c.txt"));
    }

    #[test]
    fn test_substring_matches_anywhere() {
        let rules = IgnoreRules::from_patterns([".git"]);

        assert!(ignored(&rules, "/a/.git/HEAD"));
        assert!(ignored(&rules, "/a/.gitignore"));
        assert!(ignored(&rules, "/a/b/.github/workflows/ci.yml"));
    }

    #[test]
    fn test_empty_rule_set_ignores_nothing() {
        let rules = IgnoreRules::from_patterns(Vec::<String>::new());

        assert!(rules.is_empty());
        assert!(!ignored(&rules, "/a/.git/HEAD"));
    }

    #[test]
    fn test_with_patterns_skips_duplicates_and_empty() {
        let rules = IgnoreRules::default().with_patterns(["*.pyc", "", "dist"]);

        assert_eq!(rules.len(), DEFAULT_IGNORE_PATTERNS.len() + 1);
        assert!(ignored(&rules, "/repo/dist/bundle.js"));
    }

    #[test]
    fn test_rule_display_round_trips_pattern() {
        let suffix = IgnoreRule::parse("*.pyc").unwrap();
        let literal = IgnoreRule::parse("node_modules").unwrap();

        assert_eq!(suffix.to_string(), "*.pyc");
        assert_eq!(literal.to_string(), "node_modules");
    }

    #[test]
    fn test_filter_is_deterministic() {
        let rules = IgnoreRules::default();
        let path = Utf8Path::new("/repo/Module.PYO");

        let first = rules.should_ignore(path);
        for _ in 0..10 {
            assert_eq!(rules.should_ignore(path), first);
        }
        assert!(first);
    }

    #[test]
    fn test_boxed_and_shared_filters() {
        let boxed: Box<dyn PathFilter> = Box::new(IgnoreRules::default());
        let shared = std::sync::Arc::new(IgnoreRules::default());

        assert!(boxed.should_ignore(Utf8Path::new("x/.svn/entries")));
        assert!(shared.should_ignore(Utf8Path::new("x/.svn/entries")));
        assert!(!shared.should_ignore(Utf8Path::new("x/entries")));
    }
}
