//! Regex-driven filename rewrite engine for a trivial file-transfer server.
//!
//! Given an ordered rule list parsed from a rule file, [`RuleList::rewrite`]
//! transforms a client-supplied filename, consulting two external
//! collaborators (a macro expander and a filename validator) along the way.
//! The transfer state machine, socket layer, and CLI that would normally
//! surround this engine are not part of this crate.
//!
//! # Example
//!
//! ```
//! use remap::{Family, Mode, RuleList};
//!
//! let rules = RuleList::parse_str(r"rE ^incoming/(.*)$ /srv/tftp/\1").unwrap();
//! let mut macros = |_: u8| -> Option<Vec<u8>> { None };
//! let mut validator = |_: &[u8], _: Mode| -> Result<(), String> { Ok(()) };
//! let out = rules
//!     .rewrite(b"incoming/boot.img", Mode::Read, Family::V4, &mut macros, &mut validator)
//!     .unwrap();
//! assert_eq!(out, b"/srv/tftp/boot.img");
//! ```

mod engine;
mod error;
mod parser;
mod rule;
mod subst;

pub use engine::{Family, MacroExpander, Mode, Validator};
pub use error::{LoadError, ParseError, RewriteError};
pub use parser::RuleList;
pub use rule::{Rule, RuleFlags};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_rewrite_and_validate() {
        let rules = RuleList::parse_str(r"rE ^incoming/(.*)$ /srv/tftp/\1").unwrap();

        let mut macros = |_: u8| -> Option<Vec<u8>> { None };
        let mut validator = |candidate: &[u8], _: Mode| -> Result<(), String> {
            if candidate == b"/srv/tftp/boot.img" {
                Ok(())
            } else {
                Err("no such file".to_string())
            }
        };

        let out = rules
            .rewrite(
                b"incoming/boot.img",
                Mode::Read,
                Family::V4,
                &mut macros,
                &mut validator,
            )
            .unwrap();
        assert_eq!(out, b"/srv/tftp/boot.img");
    }

    #[test]
    fn unknown_flag_reports_line_number() {
        let err = RuleList::parse_str("rz foo bar\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownFlag { line: 1 }));
    }
}
