//! Configuration-string repair for the duplicate link-function failure.
//!
//! A model saved with `--link` remembers its link function. Loading it with
//! `-i` while also passing `--link` makes the native engine refuse to
//! initialize with [`DOUBLE_LINK_ERROR_MSG`]. Stripping the first link
//! directive from the arguments and retrying lets callers reuse one
//! configuration template whether or not the model already encodes a link.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// The exact native message that triggers a repair. Nothing else is matched.
pub const DOUBLE_LINK_ERROR_MSG: &str = "option '--link' cannot be specified more than once";

const LINK_DIRECTIVE_PATTERN: &str = r"--link\s+(identity|logistic|glf1)";

static LINK_DIRECTIVE: OnceLock<Regex> = OnceLock::new();

fn link_directive() -> &'static Regex {
    LINK_DIRECTIVE
        .get_or_init(|| Regex::new(LINK_DIRECTIVE_PATTERN).expect("link directive pattern is valid"))
}

/// Whether a native initialize failure is the one recoverable link conflict.
pub fn is_link_conflict(message: &str) -> bool {
    message == DOUBLE_LINK_ERROR_MSG
}

/// Replace the first `--link <identity|logistic|glf1>` with a single space.
///
/// The space keeps the neighbouring tokens apart. Input without a link
/// directive comes back unchanged (and unallocated).
pub fn strip_link_directive(args: &str) -> Cow<'_, str> {
    link_directive().replace(args, " ")
}
