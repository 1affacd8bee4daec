use crate::error::RewriteError;
use crate::parser::RuleList;
use crate::rule::{Rule, RuleFlags};
use crate::subst::{expand_pattern, rewrite_once};

/// Transfer direction of the request being remapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// A read (get) request.
    Read,
    /// A write (put) request.
    Write,
}

/// Client address family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

/// Expands a single backslash-escape character outside the fixed `\0`..`\9`
/// / `\L` / `\U` / `\E` set (see [`crate::subst::expand_pattern`]).
///
/// Implemented for any `FnMut(u8) -> Option<Vec<u8>>` closure, so callers
/// rarely need to name this trait directly.
pub trait MacroExpander {
    /// Expand macro character `c`. Returning `None` falls back to emitting
    /// `c` literally.
    fn expand(&mut self, c: u8) -> Option<Vec<u8>>;
}

impl<F: FnMut(u8) -> Option<Vec<u8>>> MacroExpander for F {
    fn expand(&mut self, c: u8) -> Option<Vec<u8>> {
        self(c)
    }
}

/// Reports whether a candidate filename resolves to a servable file under
/// the current mode. An `Err` carries a diagnostic reason and is treated as
/// "rule did not match", never as a rewrite failure.
///
/// Implemented for any `FnMut(&[u8], Mode) -> Result<(), String>` closure.
pub trait Validator {
    fn validate(&mut self, candidate: &[u8], mode: Mode) -> Result<(), String>;
}

impl<F: FnMut(&[u8], Mode) -> Result<(), String>> Validator for F {
    fn validate(&mut self, candidate: &[u8], mode: Mode) -> Result<(), String> {
        self(candidate, mode)
    }
}

#[derive(Clone, Copy, Debug)]
struct BadFlags {
    rrq: bool,
    wrq: bool,
    ipv4: bool,
    ipv6: bool,
}

impl BadFlags {
    fn for_invocation(mode: Mode, family: Family) -> Self {
        Self {
            rrq: !matches!(mode, Mode::Read),
            wrq: !matches!(mode, Mode::Write),
            ipv4: !matches!(family, Family::V4),
            ipv6: !matches!(family, Family::V6),
        }
    }

    fn excludes(&self, flags: &RuleFlags) -> bool {
        (self.rrq && flags.rrq)
            || (self.wrq && flags.wrq)
            || (self.ipv4 && flags.ipv4)
            || (self.ipv6 && flags.ipv6)
    }
}

enum RuleOutcome {
    NotMatched {
        current: Vec<u8>,
        rejected: Option<String>,
    },
    Matched {
        current: Vec<u8>,
    },
    Abort(Option<String>),
    Deadman(Vec<u8>),
}

impl Rule {
    /// Run this rule's per-rule body loop against `current`, consuming from
    /// the shared `steps` budget on every regex-execution attempt.
    fn apply(
        &self,
        mut current: Vec<u8>,
        steps: &mut u64,
        macros: &mut dyn MacroExpander,
        validator: &mut dyn Validator,
        mode: Mode,
    ) -> RuleOutcome {
        let mut matched_once = false;
        let mut rejected = None;
        let mut first_attempt = true;

        loop {
            if *steps == 0 {
                return RuleOutcome::Deadman(current);
            }
            *steps -= 1;

            let mut raw = self.regex.captures(&current);
            if !first_attempt {
                // Plain global only ever repeats anchored at string start;
                // a match further in does not count as a continuation.
                raw = raw.filter(|c| c.get(0).is_some_and(|m| m.start() == 0));
            }
            first_attempt = false;

            let is_match = raw.is_some() != self.flags.inverse;
            if !is_match {
                break;
            }
            matched_once = true;
            let captures = if self.flags.inverse { None } else { raw };

            if self.flags.abort {
                let message = if self.pattern.is_empty() {
                    None
                } else {
                    let mut out = Vec::new();
                    expand_pattern(&self.pattern, &current, captures.as_ref(), macros, &mut out);
                    Some(String::from_utf8_lossy(&out).into_owned())
                };
                return RuleOutcome::Abort(message);
            }

            if self.flags.rewrite {
                let Some(captures) = captures else {
                    // Parser rejects rewrite+inverse combinations, so this
                    // never actually triggers; treat defensively as no-match.
                    matched_once = false;
                    break;
                };
                let rewritten = rewrite_once(&self.pattern, &current, &captures, macros);
                let mut new_current = rewritten.output;
                let mut ggoffset = rewritten.ggoffset;

                if self.flags.sedg {
                    while ggoffset < new_current.len() {
                        if *steps == 0 {
                            return RuleOutcome::Deadman(new_current);
                        }
                        *steps -= 1;
                        let Some(next_captures) = self.regex.captures_at(&new_current, ggoffset)
                        else {
                            break;
                        };
                        let next = rewrite_once(&self.pattern, &new_current, &next_captures, macros);
                        new_current = next.output;
                        ggoffset = next.ggoffset;
                    }
                }

                if self.flags.hasfile {
                    if let Err(reason) = validator.validate(&new_current, mode) {
                        matched_once = false;
                        rejected = Some(reason);
                        break;
                    }
                }
                current = new_current;
            } else if self.flags.hasfile {
                if let Err(reason) = validator.validate(&current, mode) {
                    matched_once = false;
                    rejected = Some(reason);
                    break;
                }
            }

            if !(self.flags.global && !self.flags.sedg) {
                break;
            }
        }

        if matched_once {
            RuleOutcome::Matched { current }
        } else {
            RuleOutcome::NotMatched { current, rejected }
        }
    }
}

impl RuleList {
    /// Run the rule list against `input`, producing the rewritten filename,
    /// an abort (with an optional substituted message), or a deadman
    /// failure if the step budget is exhausted.
    pub fn rewrite(
        &self,
        input: &[u8],
        mode: Mode,
        family: Family,
        macros: &mut dyn MacroExpander,
        validator: &mut dyn Validator,
    ) -> Result<Vec<u8>, RewriteError> {
        let bad = BadFlags::for_invocation(mode, family);
        let mut current = input.to_vec();
        let mut steps = self.deadman_max_steps;

        tracing::debug!(input = %String::from_utf8_lossy(&current), "remap: input");

        let mut index = 0usize;
        while index < self.rules.len() {
            let rule = &self.rules[index];
            if bad.excludes(&rule.flags) {
                index += 1;
                continue;
            }

            match rule.apply(current, &mut steps, macros, validator, mode) {
                RuleOutcome::Deadman(last) => {
                    tracing::error!(
                        rule = rule.index,
                        last = %String::from_utf8_lossy(&last),
                        "remap: deadman expired",
                    );
                    return Err(RewriteError::Deadman);
                }
                RuleOutcome::Abort(message) => {
                    tracing::debug!(rule = rule.index, "remap: abort");
                    return Err(RewriteError::Abort(message));
                }
                RuleOutcome::NotMatched { current: c, rejected } => {
                    if let Some(reason) = rejected {
                        tracing::debug!(
                            rule = rule.index,
                            reason = %reason,
                            candidate = %String::from_utf8_lossy(&c),
                            "remap: ignored rewrite",
                        );
                    }
                    current = c;
                    index += 1;
                }
                RuleOutcome::Matched { current: c } => {
                    current = c;
                    if rule.flags.exit || rule.flags.hasfile {
                        tracing::debug!(rule = rule.index, "remap: exit");
                        return Ok(current);
                    }
                    if rule.flags.restart {
                        tracing::debug!(rule = rule.index, "remap: restart");
                        index = 0;
                    } else {
                        tracing::debug!(rule = rule.index, "remap: rewrite");
                        index += 1;
                    }
                }
            }
        }

        tracing::debug!("remap: done");
        Ok(current)
    }
}
