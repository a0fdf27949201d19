//! Minimal glob matching for repository-relative paths.
//!
//! Supports `**`, `*`, `?` and a leading `!` for excludes. Patterns are
//! anchored at both ends and operate on forward-slash paths; backslashes in
//! candidate paths are normalized before matching.

/// One element of a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// A character matched verbatim.
    Literal(char),
    /// `?`: exactly one character that is not a separator.
    AnyChar,
    /// `*`: zero or more characters within one segment.
    AnyWithinSegment,
    /// `**/`: zero or more whole path segments.
    AnySegments,
    /// `**` not followed by `/`: any remaining characters.
    AnyRemaining,
}

/// A single compiled glob pattern.
///
/// Compilation is pure and infallible: characters that are not glob
/// metacharacters match themselves, so there is no escaping syntax and no
/// invalid pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compile a single pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        let text = pattern.into();
        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check whether `path` matches this pattern in full.
    pub fn matches(&self, path: &str) -> bool {
        let normalized: Vec<char> = path.replace('\\', "/").chars().collect();
        matches_at(&self.tokens, &normalized)
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    tokens.push(Token::AnySegments);
                } else {
                    tokens.push(Token::AnyRemaining);
                }
            }
            '*' => tokens.push(Token::AnyWithinSegment),
            '?' => tokens.push(Token::AnyChar),
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }
    tokens
}

fn matches_at(tokens: &[Token], path: &[char]) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return path.is_empty();
    };
    match first {
        Token::Literal(c) => path.first() == Some(c) && matches_at(rest, &path[1..]),
        Token::AnyChar => matches!(path.first(), Some(c) if *c != '/') && matches_at(rest, &path[1..]),
        Token::AnyWithinSegment => {
            if matches_at(rest, path) {
                return true;
            }
            let mut i = 0;
            while i < path.len() && path[i] != '/' {
                i += 1;
                if matches_at(rest, &path[i..]) {
                    return true;
                }
            }
            false
        }
        Token::AnyRemaining => (0..=path.len()).any(|i| matches_at(rest, &path[i..])),
        Token::AnySegments => {
            if matches_at(rest, path) {
                return true;
            }
            path.iter()
                .enumerate()
                .any(|(i, c)| *c == '/' && matches_at(rest, &path[i + 1..]))
        }
    }
}

/// An ordered set of include and exclude patterns.
///
/// A path matches the set iff at least one include pattern matches and no
/// exclude pattern matches. Pattern order within either list never affects
/// the outcome.
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobSet {
    /// Compile a list of patterns; a leading `!` marks an exclude, empty
    /// strings are skipped.
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = GlobSet::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                continue;
            }
            if let Some(negated) = pattern.strip_prefix('!') {
                set.exclude.push(Pattern::new(negated));
            } else {
                set.include.push(Pattern::new(pattern));
            }
        }
        set
    }

    /// True when the set contains no include patterns, so nothing can match.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Check whether `path` matches the set.
    pub fn is_match(&self, path: &str) -> bool {
        self.include.iter().any(|p| p.matches(path)) && !self.exclude.iter().any(|p| p.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn star_stays_within_one_segment() {
        let p = Pattern::new("src/*.rs");
        assert!(p.matches("src/lib.rs"));
        assert!(!p.matches("src/repo/inner.rs"));
    }

    #[test]
    fn question_mark_matches_one_non_separator() {
        let p = Pattern::new("a?c");
        assert!(p.matches("abc"));
        assert!(!p.matches("ac"));
        assert!(!p.matches("a/c"));
    }

    #[test]
    fn double_star_slash_matches_zero_or_more_segments() {
        let p = Pattern::new("**/*.rs");
        assert!(p.matches("lib.rs"));
        assert!(p.matches("src/lib.rs"));
        assert!(p.matches("src/repo/inner.rs"));
        assert!(!p.matches("src/lib.rs.bak"));
    }

    #[test]
    fn trailing_double_star_requires_the_separator() {
        let p = Pattern::new("src/**");
        assert!(p.matches("src/a"));
        assert!(p.matches("src/a/b/c.rs"));
        assert!(!p.matches("src"));
        assert!(!p.matches("srcs/a"));
    }

    #[test]
    fn dots_and_regex_metacharacters_are_literal() {
        let p = Pattern::new("docs/a.b(c)+[d]");
        assert!(p.matches("docs/a.b(c)+[d]"));
        assert!(!p.matches("docs/aXb(c)+[d]"));
    }

    #[test]
    fn backslashes_in_candidates_are_normalized() {
        let p = Pattern::new("src/**");
        assert!(p.matches("src\\nested\\file.rs"));
    }

    #[test]
    fn set_composes_includes_and_excludes() {
        let set = GlobSet::compile(["src/**", "!src/vendored/**"]);
        assert!(set.is_match("src/lib.rs"));
        assert!(!set.is_match("src/vendored/zlib.rs"));
        assert!(!set.is_match("docs/readme.md"));
    }

    #[test]
    fn match_is_invariant_to_pattern_order() {
        let paths = ["src/a.rs", "src/gen/b.rs", "docs/c.md", "gen/d.rs"];
        let forward = GlobSet::compile(["src/**", "docs/**", "!**/gen/**", "!docs/internal/**"]);
        let backward = GlobSet::compile(["!docs/internal/**", "docs/**", "!**/gen/**", "src/**"]);
        for path in paths {
            assert_eq!(forward.is_match(path), backward.is_match(path), "path {path}");
        }
    }

    #[test]
    fn exclude_without_include_never_matches() {
        let set = GlobSet::compile(["!src/**"]);
        assert!(!set.is_match("src/lib.rs"));
        assert!(!set.is_match("docs/readme.md"));
    }

    #[test]
    fn empty_patterns_are_skipped() {
        let set = GlobSet::compile(["", "src/**"]);
        assert!(set.is_match("src/lib.rs"));
    }
}
