use thiserror::Error;

/// Errors raised while parsing a rule file into a [`crate::RuleList`].
///
/// Every variant carries the 1-based line number of the offending rule.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized rule flag")]
    UnknownFlag { line: usize },

    #[error("line {line}: rule flag `r` cannot be combined with `~`")]
    RewriteCannotInvert { line: usize },

    #[error("line {line}: rule flag `E` requires `gg`, not a plain `g`")]
    HasFileWithPlainGlobal { line: usize },

    #[error("line {line}: rule is missing a regular expression")]
    MissingRegex { line: usize },

    #[error("line {line}: regular expression is not valid UTF-8")]
    NonUtf8Regex { line: usize },

    #[error("line {line}: invalid regular expression")]
    InvalidRegex {
        line: usize,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while loading a rule file from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read rule file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rule file")]
    Parse(#[from] ParseError),
}

/// Errors raised while rewriting a filename.
///
/// A rejection from the caller's [`crate::Validator`] is deliberately
/// not represented here: it is treated as an ordinary non-match, not a
/// failure of the rewrite itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("{}", .0.as_deref().unwrap_or("no specific error"))]
    Abort(Option<String>),

    #[error("Remap table failure")]
    Deadman,
}
