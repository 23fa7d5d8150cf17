//! Version algebra: pkgver parsing, Dewey-style comparison, and pattern
//! matching against a package pattern (relational, glob, or bare name).

use std::cmp::Ordering;
use std::fmt;

/// A parsed `name-version[_revision]` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pkgver {
    name: String,
    version: String,
    revision: Option<u32>,
}

impl Pkgver {
    /// Parse `name-version[_revision]`.
    ///
    /// The split point is the last `-` that is immediately followed by a
    /// digit; everything before it is the name, everything after is the
    /// version. If the version's suffix after the last `_` is all-digit,
    /// that suffix is the revision.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let dash = s
            .char_indices()
            .rev()
            .find(|&(i, c)| c == '-' && s[i + 1..].chars().next().is_some_and(|d| d.is_ascii_digit()))
            .map(|(i, _)| i)
            .ok_or_else(|| crate::Error::malformed_pkgver(s))?;

        let name = s[..dash].to_string();
        let rest = &s[dash + 1..];
        if name.is_empty() || rest.is_empty() {
            return Err(crate::Error::malformed_pkgver(s));
        }

        let (version, revision) = match rest.rfind('_') {
            Some(u) if rest[u + 1..].chars().all(|c| c.is_ascii_digit()) && !rest[u + 1..].is_empty() => {
                (rest[..u].to_string(), rest[u + 1..].parse::<u32>().ok())
            }
            _ => (rest.to_string(), None),
        };

        Ok(Self {
            name,
            version,
            revision,
        })
    }

    /// Package name component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version component (without revision).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Revision component, if present.
    #[must_use]
    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Canonical `name-version_revision` rendering.
    #[must_use]
    pub fn render(&self) -> String {
        match self.revision {
            Some(r) => format!("{}-{}_{}", self.name, self.version, r),
            None => format!("{}-{}", self.name, self.version),
        }
    }
}

impl fmt::Display for Pkgver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A single Dewey token: a run of digits or a run of non-digits.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Num(u64),
    Str(String),
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = version.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut num = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    num.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Num(num.parse().unwrap_or(0)));
        } else {
            let mut run = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    break;
                }
                run.push(d);
                chars.next();
            }
            tokens.push(Token::Str(run));
        }
    }
    tokens
}

fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Num(x), Token::Num(y)) => x.cmp(y),
        (Token::Num(_), Token::Str(_)) => Ordering::Greater,
        (Token::Str(_), Token::Num(_)) => Ordering::Less,
        (Token::Str(x), Token::Str(y)) => x.cmp(y),
    }
}

/// Compare two bare version strings (no revision) using Dewey ordering:
/// numeric tokens outrank non-numeric ones position-wise, and a shorter
/// token sequence is treated as padded with trailing zero/empty tokens.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);
    let len = ta.len().max(tb.len());
    for i in 0..len {
        let ta_tok = ta.get(i);
        let tb_tok = tb.get(i);
        let ord = match (ta_tok, tb_tok) {
            (Some(x), Some(y)) => compare_tokens(x, y),
            (Some(Token::Num(x)), None) => x.cmp(&0),
            (Some(Token::Str(x)), None) => {
                if x.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (None, Some(Token::Num(y))) => 0u64.cmp(y),
            (None, Some(Token::Str(y))) => {
                if y.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Compare two pkgvers: base version first, revision as a lower-precedence
/// tiebreak.
#[must_use]
pub fn compare_pkgver(a: &Pkgver, b: &Pkgver) -> Ordering {
    match compare_versions(a.version(), b.version()) {
        Ordering::Equal => a.revision().unwrap_or(0).cmp(&b.revision().unwrap_or(0)),
        other => other,
    }
}

/// Result of matching a pkgver against a dependency pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Pattern is well-formed and matches.
    Matches,
    /// Pattern is well-formed and does not match.
    DoesNotMatch,
    /// Pattern could not be parsed.
    Malformed,
}

/// A relational operator in a dependency pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

/// A dependency atom: a package name plus an optional constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepAtom {
    /// Bare name, matches any version.
    Name(String),
    /// Shell-glob pattern matched against the full pkgver.
    Glob(String),
    /// Relational constraint: `name OP version`.
    Relational {
        name: String,
        op_raw: String,
        version: String,
    },
}

impl DepAtom {
    /// Parse a dependency pattern string into its disjoint form.
    #[must_use]
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        for op in [">=", "<=", "==", ">", "<"] {
            if let Some(idx) = pattern.find(op) {
                let name = pattern[..idx].to_string();
                let version = pattern[idx + op.len()..].to_string();
                if name.is_empty() || version.is_empty() {
                    return None;
                }
                return Some(Self::Relational {
                    name,
                    op_raw: op.to_string(),
                    version,
                });
            }
        }
        if pattern.contains('*') || pattern.contains('?') {
            return Some(Self::Glob(pattern.to_string()));
        }
        Some(Self::Name(pattern.to_string()))
    }

    /// Render this atom back into the pattern string `parse` accepts.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Name(n) | Self::Glob(n) => n.clone(),
            Self::Relational { name, op_raw, version } => format!("{name}{op_raw}{version}"),
        }
    }

    /// The package name this atom constrains (for relational/name forms).
    /// Glob forms return `None` since the name cannot be isolated from the
    /// pattern without matching.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(n) | Self::Relational { name: n, .. } => Some(n),
            Self::Glob(_) => None,
        }
    }

    /// Match this atom against a candidate pkgver.
    #[must_use]
    pub fn matches(&self, candidate: &Pkgver) -> MatchResult {
        match self {
            Self::Name(n) => {
                if candidate.name() == n {
                    MatchResult::Matches
                } else {
                    MatchResult::DoesNotMatch
                }
            }
            Self::Glob(pattern) => {
                if glob_match(pattern, &candidate.render()) {
                    MatchResult::Matches
                } else {
                    MatchResult::DoesNotMatch
                }
            }
            Self::Relational {
                name,
                op_raw,
                version,
            } => {
                if candidate.name() != name {
                    return MatchResult::DoesNotMatch;
                }
                let op = match op_raw.as_str() {
                    ">=" => RelOp::Ge,
                    "<=" => RelOp::Le,
                    ">" => RelOp::Gt,
                    "<" => RelOp::Lt,
                    "==" => RelOp::Eq,
                    _ => return MatchResult::Malformed,
                };
                let Ok(rhs) = Pkgver::parse(&format!("{name}-{version}")) else {
                    return MatchResult::Malformed;
                };
                let ord = compare_pkgver(candidate, &rhs);
                let hit = match op {
                    RelOp::Ge => ord != Ordering::Less,
                    RelOp::Le => ord != Ordering::Greater,
                    RelOp::Gt => ord == Ordering::Greater,
                    RelOp::Lt => ord == Ordering::Less,
                    RelOp::Eq => ord == Ordering::Equal,
                };
                if hit {
                    MatchResult::Matches
                } else {
                    MatchResult::DoesNotMatch
                }
            }
        }
    }
}

/// Match a pattern string directly against a pkgver string, returning the
/// tri-value result described in the version-algebra contract.
#[must_use]
pub fn match_pattern(pkgver: &str, pattern: &str) -> MatchResult {
    let Ok(candidate) = Pkgver::parse(pkgver) else {
        return MatchResult::Malformed;
    };
    match DepAtom::parse(pattern) {
        Some(atom) => atom.matches(&candidate),
        None => MatchResult::Malformed,
    }
}

/// Minimal shell-glob matcher supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let mut memo = vec![vec![None; t.len() + 1]; p.len() + 1];
    glob_match_rec(&p, &t, 0, 0, &mut memo)
}

fn glob_match_rec(p: &[char], t: &[char], pi: usize, ti: usize, memo: &mut [Vec<Option<bool>>]) -> bool {
    if let Some(cached) = memo[pi][ti] {
        return cached;
    }
    let result = if pi == p.len() {
        ti == t.len()
    } else if p[pi] == '*' {
        (ti..=t.len()).any(|k| glob_match_rec(p, t, pi + 1, k, memo))
    } else if ti < t.len() && (p[pi] == '?' || p[pi] == t[ti]) {
        glob_match_rec(p, t, pi + 1, ti + 1, memo)
    } else {
        false
    };
    memo[pi][ti] = Some(result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("foo-1.0", "foo", "1.0", None)]
    #[test_case("foo-1.0_2", "foo", "1.0", Some(2))]
    #[test_case("libfoo-2.3-1.0_1", "libfoo-2.3", "1.0", Some(1))]
    fn parses_pkgver(input: &str, name: &str, version: &str, revision: Option<u32>) {
        let p = Pkgver::parse(input).unwrap();
        assert_eq!(p.name(), name);
        assert_eq!(p.version(), version);
        assert_eq!(p.revision(), revision);
    }

    #[test]
    fn rejects_missing_version() {
        assert!(Pkgver::parse("foo").is_err());
        assert!(Pkgver::parse("-1.0").is_err());
    }

    #[test_case("1.0", "1.0.0", Ordering::Less)]
    #[test_case("1.0", "1.0", Ordering::Equal)]
    #[test_case("2.0", "1.9", Ordering::Greater)]
    #[test_case("1.0a", "1.0", Ordering::Less)]
    #[test_case("1.0", "1.0rc1", Ordering::Greater)]
    fn dewey_compare(a: &str, b: &str, expected: Ordering) {
        assert_eq!(compare_versions(a, b), expected);
    }

    #[test]
    fn revision_is_lower_precedence_than_version() {
        let a = Pkgver::parse("foo-1.0_5").unwrap();
        let b = Pkgver::parse("foo-1.1_0").unwrap();
        assert_eq!(compare_pkgver(&a, &b), Ordering::Less);
    }

    #[test]
    fn revision_breaks_ties() {
        let a = Pkgver::parse("foo-1.0_1").unwrap();
        let b = Pkgver::parse("foo-1.0_2").unwrap();
        assert_eq!(compare_pkgver(&a, &b), Ordering::Less);
    }

    #[test_case("foo-2.0", "foo>=1.0", MatchResult::Matches)]
    #[test_case("foo-2.0", "foo<1.0", MatchResult::DoesNotMatch)]
    #[test_case("foo-2.0", "foo==2.0", MatchResult::Matches)]
    #[test_case("foo-2.0", "foo", MatchResult::Matches)]
    #[test_case("bar-2.0", "foo", MatchResult::DoesNotMatch)]
    #[test_case("foo-2.0", "f*-2.*", MatchResult::Matches)]
    #[test_case("not a pkgver", "foo", MatchResult::Malformed)]
    #[test_case("foo-2.0", "foo>~1.0", MatchResult::Malformed)]
    fn pattern_matching(pkgver: &str, pattern: &str, expected: MatchResult) {
        assert_eq!(match_pattern(pkgver, pattern), expected);
    }

    #[test_case("foo", "foo")]
    #[test_case("foo>=1.0", "foo>=1.0")]
    #[test_case("f*-2.*", "f*-2.*")]
    fn dep_atom_render_round_trips(pattern: &str, expected: &str) {
        assert_eq!(DepAtom::parse(pattern).unwrap().render(), expected);
    }

    proptest! {
        #[test]
        fn compare_is_reflexive(s in "[a-z]{1,5}[0-9]{1,3}") {
            prop_assert_eq!(compare_versions(&s, &s), Ordering::Equal);
        }

        #[test]
        fn compare_is_antisymmetric(a in "[0-9]{1,3}\\.[0-9]{1,3}", b in "[0-9]{1,3}\\.[0-9]{1,3}") {
            let fwd = compare_versions(&a, &b);
            let bwd = compare_versions(&b, &a);
            prop_assert_eq!(fwd.reverse(), bwd);
        }

        #[test]
        fn parse_never_panics(s in ".*") {
            let _ = Pkgver::parse(&s);
        }

        #[test]
        fn render_is_parse_inverse(name in "[a-z]{1,8}", version in "[0-9]\\.[0-9]", rev in 0u32..50) {
            let rendered = format!("{name}-{version}_{rev}");
            let parsed = Pkgver::parse(&rendered).unwrap();
            prop_assert_eq!(parsed.render(), rendered);
        }
    }
}
