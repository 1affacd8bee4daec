use regex::bytes::{Regex, RegexBuilder};

use crate::error::ParseError;

/// Step budget consumed by a single [`crate::RuleList::rewrite`] call unless
/// overridden with [`crate::RuleList::deadman_max_steps`].
pub(crate) const DEFAULT_DEADMAN_MAX_STEPS: u64 = 4096;

/// A physical rule-file line is truncated at this many bytes, matching the
/// `fgets(buf, MAXLINE, f)` quirk of the format this crate's rule files
/// originated from.
pub(crate) const MAX_LINE_LEN: usize = 16384;

/// Per-rule flag set, one bool per single-character flag in the rule-file
/// grammar. See [`crate::RuleList::parse`] for the flag alphabet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleFlags {
    /// `r` — replace the input with the substitution of `pattern` on match.
    pub rewrite: bool,
    /// `g` — repeat the rule, anchored at string start, while it matches.
    pub global: bool,
    /// `gg` — sed-style partial global: scan forward non-overlapping.
    pub sedg: bool,
    /// `e` — stop rule-list evaluation after this rule matches.
    pub exit: bool,
    /// `E` — gate the match (or rewrite) behind the external validator.
    pub hasfile: bool,
    /// `s` — restart evaluation from the head of the rule list.
    pub restart: bool,
    /// `a` — abort the rewrite with an error.
    pub abort: bool,
    /// `i` — compile the regex case-insensitively.
    pub case_insensitive: bool,
    /// `~` — execute the body when the regex does *not* match.
    pub inverse: bool,
    /// `4` — only apply to IPv4 clients.
    pub ipv4: bool,
    /// `6` — only apply to IPv6 clients.
    pub ipv6: bool,
    /// `G` — only apply to read (get) requests.
    pub rrq: bool,
    /// `P` — only apply to write (put) requests.
    pub wrq: bool,
}

impl RuleFlags {
    fn parse(raw: &[u8], line: usize) -> Result<Self, ParseError> {
        let mut flags = RuleFlags::default();
        for &b in raw {
            match b {
                b'r' => flags.rewrite = true,
                b'g' => {
                    if flags.global {
                        flags.sedg = true;
                    } else {
                        flags.global = true;
                    }
                }
                b'e' => flags.exit = true,
                b'E' => flags.hasfile = true,
                b's' => flags.restart = true,
                b'a' => flags.abort = true,
                b'i' => flags.case_insensitive = true,
                b'~' => flags.inverse = true,
                b'4' => flags.ipv4 = true,
                b'6' => flags.ipv6 = true,
                b'G' => flags.rrq = true,
                b'P' => flags.wrq = true,
                _ => return Err(ParseError::UnknownFlag { line }),
            }
        }

        if flags.rewrite {
            if flags.inverse {
                return Err(ParseError::RewriteCannotInvert { line });
            }
            if flags.global && flags.hasfile && !flags.sedg {
                return Err(ParseError::HasFileWithPlainGlobal { line });
            }
        } else {
            // Meaningless without a rewrite to repeat.
            flags.global = false;
            flags.sedg = false;
        }

        Ok(flags)
    }
}

/// A single compiled rewrite rule.
///
/// Immutable once constructed; the only way to obtain one is through
/// [`crate::RuleList::parse`] (or its siblings), which enforces the flag
/// validation described there.
#[derive(Debug)]
pub struct Rule {
    pub(crate) index: usize,
    pub(crate) flags: RuleFlags,
    pub(crate) regex: Regex,
    pub(crate) pattern: Vec<u8>,
}

impl Rule {
    pub(crate) fn parse(
        index: usize,
        flags_tok: &[u8],
        regex_tok: &[u8],
        pattern_tok: &[u8],
        line: usize,
    ) -> Result<Self, ParseError> {
        let flags = RuleFlags::parse(flags_tok, line)?;
        let regex_src =
            std::str::from_utf8(regex_tok).map_err(|_| ParseError::NonUtf8Regex { line })?;
        let regex = RegexBuilder::new(regex_src)
            .case_insensitive(flags.case_insensitive)
            .build()
            .map_err(|source| ParseError::InvalidRegex { line, source })?;
        Ok(Self {
            index,
            flags,
            regex,
            pattern: pattern_tok.to_vec(),
        })
    }

    /// Stable, parse-order index. Diagnostic only; never used to address
    /// rules within the engine.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The flags this rule was parsed with.
    pub fn flags(&self) -> &RuleFlags {
        &self.flags
    }

    /// The raw, un-decoded substitution pattern this rule was parsed with.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(s: &str) -> RuleFlags {
        RuleFlags::parse(s.as_bytes(), 1).expect("flags should parse")
    }

    #[test]
    fn single_g_sets_global_only() {
        let f = flags("rg");
        assert!(f.global);
        assert!(!f.sedg);
    }

    #[test]
    fn double_g_sets_sedg_and_global() {
        let f = flags("rgg");
        assert!(f.global);
        assert!(f.sedg);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = RuleFlags::parse(b"rz", 7).unwrap_err();
        assert!(matches!(err, ParseError::UnknownFlag { line: 7 }));
    }

    #[test]
    fn rewrite_and_inverse_conflict() {
        let err = RuleFlags::parse(b"r~", 2).unwrap_err();
        assert!(matches!(err, ParseError::RewriteCannotInvert { line: 2 }));
    }

    #[test]
    fn plain_global_with_hasfile_conflict() {
        let err = RuleFlags::parse(b"rgE", 3).unwrap_err();
        assert!(matches!(err, ParseError::HasFileWithPlainGlobal { line: 3 }));
    }

    #[test]
    fn sedg_with_hasfile_is_allowed() {
        let f = flags("rggE");
        assert!(f.sedg);
        assert!(f.hasfile);
    }

    #[test]
    fn global_cleared_without_rewrite() {
        let f = flags("g");
        assert!(!f.global);
        assert!(!f.rewrite);
    }
}
