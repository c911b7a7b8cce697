//! Glob-pattern compilation and conservative overlap detection.
//!
//! `overlap` must never return `false` for two globs that share a matching
//! path — false positives are fine (they just trigger an extra conflict
//! check), false negatives would let two agents stomp on the same file.

use once_cell::sync::OnceCell;
use regex::Regex;

/// A compiled glob pattern, split into path segments for overlap testing.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    raw: String,
    segments: Vec<String>,
    regex: OnceCell<Regex>,
}

impl PatternMatcher {
    pub fn compile(pattern: &str) -> Self {
        let normalized = normalize(pattern);
        let segments = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Self {
            raw: normalized,
            segments,
            regex: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    fn regex(&self) -> &Regex {
        self.regex.get_or_init(|| {
            let pat = glob_to_regex(&self.raw);
            Regex::new(&pat).expect("glob-derived regex must compile")
        })
    }

    /// Whether a concrete path (no wildcards) matches this glob.
    pub fn matches_literal(&self, path: &str) -> bool {
        self.regex().is_match(&normalize(path))
    }
}

/// Strip a trailing `/` and collapse repeated `/` runs.
fn normalize(pattern: &str) -> String {
    let collapsed = {
        let mut out = String::with_capacity(pattern.len());
        let mut prev_slash = false;
        for c in pattern.chars() {
            if c == '/' {
                if prev_slash {
                    continue;
                }
                prev_slash = true;
            } else {
                prev_slash = false;
            }
            out.push(c);
        }
        out
    };
    collapsed
        .strip_suffix('/')
        .map(|s| s.to_string())
        .unwrap_or(collapsed)
}

/// Translate one normalized glob into an anchored regex.
///
/// `?` -> one non-separator char, `*` -> zero or more non-separator chars,
/// `**` -> zero or more path segments (including the separators).
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    out.push_str(".*");
                    i += 2;
                    // A `**` that's followed by `/` may also match zero segments.
                    if i < chars.len() && chars[i] == '/' {
                        i += 1;
                    }
                } else {
                    out.push_str("[^/]*");
                    i += 1;
                }
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                if regex_special(c) {
                    out.push('\\');
                }
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

fn regex_special(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '(' | ')' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\'
    )
}

/// Whether two glob patterns can match at least one common path.
///
/// Symmetric and reflexive by construction (the recursion treats both
/// sides identically).
pub fn overlap(p1: &str, p2: &str) -> bool {
    let m1 = PatternMatcher::compile(p1);
    let m2 = PatternMatcher::compile(p2);
    segments_overlap(&m1.segments, &m2.segments)
}

fn segments_overlap(a: &[String], b: &[String]) -> bool {
    // Base cases.
    if a.is_empty() && b.is_empty() {
        return true;
    }
    if a.is_empty() {
        return b.iter().all(|s| s == "**");
    }
    if b.is_empty() {
        return a.iter().all(|s| s == "**");
    }

    let (h1, t1) = (&a[0], &a[1..]);
    let (h2, t2) = (&b[0], &b[1..]);

    if h1 == "**" {
        // `**` may consume zero or more segments from the other side.
        return segments_overlap(t1, b)
            || segments_overlap(a, t2)
            || segments_overlap(t1, t2);
    }
    if h2 == "**" {
        return segments_overlap(a, t2) || segments_overlap(t1, b) || segments_overlap(t1, t2);
    }

    if segment_compatible(h1, h2) {
        segments_overlap(t1, t2)
    } else {
        false
    }
}

/// Whether two single path segments (no `**`) could match a common segment.
fn segment_compatible(a: &str, b: &str) -> bool {
    let a_wild = segment_has_wildcard(a);
    let b_wild = segment_has_wildcard(b);

    if !a_wild && !b_wild {
        return a == b;
    }
    if a_wild && !b_wild {
        return PatternMatcher::compile(a).matches_literal(b);
    }
    if !a_wild && b_wild {
        return PatternMatcher::compile(b).matches_literal(a);
    }
    // Both wildcarded: conservatively require compatible literal
    // prefix/suffix around the wildcard runs.
    let (pa, sa) = literal_prefix_suffix(a);
    let (pb, sb) = literal_prefix_suffix(b);
    prefix_compatible(&pa, &pb) && suffix_compatible(&sa, &sb)
}

fn segment_has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

fn literal_prefix_suffix(s: &str) -> (String, String) {
    let prefix: String = s.chars().take_while(|c| *c != '*' && *c != '?').collect();
    let suffix: String = s
        .chars()
        .rev()
        .take_while(|c| *c != '*' && *c != '?')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (prefix, suffix)
}

fn prefix_compatible(a: &str, b: &str) -> bool {
    let n = a.len().min(b.len());
    a.as_bytes()[..n] == b.as_bytes()[..n]
}

fn suffix_compatible(a: &str, b: &str) -> bool {
    let n = a.len().min(b.len());
    a.as_bytes()[a.len() - n..] == b.as_bytes()[b.len() - n..]
}
