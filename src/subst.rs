use regex::bytes::Captures;

use crate::engine::MacroExpander;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fold {
    None,
    Lower,
    Upper,
}

impl Fold {
    fn apply(self, b: u8) -> u8 {
        match self {
            Fold::None => b,
            Fold::Lower => b.to_ascii_lowercase(),
            Fold::Upper => b.to_ascii_uppercase(),
        }
    }
}

/// Expand `pattern`'s backslash-escape grammar, appending the result to
/// `out`. `captures` supplies the `\0`..`\9` byte ranges (taken from a match
/// against `source`); `None` means an inverse rule's all-absent capture set,
/// so every backreference substitutes nothing.
pub(crate) fn expand_pattern(
    pattern: &[u8],
    source: &[u8],
    captures: Option<&Captures<'_>>,
    macros: &mut dyn MacroExpander,
    out: &mut Vec<u8>,
) {
    let mut fold = Fold::None;
    let mut i = 0;
    while i < pattern.len() {
        let b = pattern[i];
        if b != b'\\' {
            out.push(fold.apply(b));
            i += 1;
            continue;
        }
        match pattern.get(i + 1).copied() {
            // A trailing lone backslash is a literal backslash; never read
            // past the end of the pattern.
            None => {
                out.push(b'\\');
                i += 1;
            }
            Some(esc) if esc.is_ascii_digit() => {
                let n = (esc - b'0') as usize;
                if let Some(m) = captures.and_then(|c| c.get(n)) {
                    out.extend(source[m.start()..m.end()].iter().map(|&b| fold.apply(b)));
                }
                i += 2;
            }
            Some(b'L') => {
                fold = Fold::Lower;
                i += 2;
            }
            Some(b'U') => {
                fold = Fold::Upper;
                i += 2;
            }
            Some(b'E') => {
                fold = Fold::None;
                i += 2;
            }
            Some(other) => {
                match macros.expand(other) {
                    Some(expansion) => out.extend(expansion.iter().map(|&b| fold.apply(b))),
                    None => out.push(fold.apply(other)),
                }
                i += 2;
            }
        }
    }
}

/// Result of substituting a rule's pattern against one regex match.
pub(crate) struct Rewritten {
    pub(crate) output: Vec<u8>,
    /// Byte offset in `output` immediately after the substituted region —
    /// where a SEDG continuation must resume to guarantee forward progress.
    pub(crate) ggoffset: usize,
}

/// Frame one substitution: the unmatched prefix of `haystack`, the expanded
/// `pattern`, then the unmatched suffix. `captures` must come from matching
/// `haystack` itself (by [`regex::bytes::Regex::captures`] or
/// [`regex::bytes::Regex::captures_at`]) so its byte ranges are absolute
/// offsets into `haystack`.
pub(crate) fn rewrite_once(
    pattern: &[u8],
    haystack: &[u8],
    captures: &Captures<'_>,
    macros: &mut dyn MacroExpander,
) -> Rewritten {
    let whole = captures
        .get(0)
        .expect("capture group 0 is always present on a successful match");
    let mut output = Vec::with_capacity(haystack.len());
    output.extend_from_slice(&haystack[..whole.start()]);
    expand_pattern(pattern, haystack, Some(captures), macros, &mut output);
    let ggoffset = output.len();
    output.extend_from_slice(&haystack[whole.end()..]);
    Rewritten { output, ggoffset }
}
