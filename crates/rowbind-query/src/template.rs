//! Positional substitution of call arguments into a query template.
//!
//! Substitution is purely textual: every `?` in the template is a
//! placeholder, arguments are inserted in order, and inserted text is never
//! scanned again. There is no quoting or escaping.

use crate::error::{MapperError, MapperResult};
use std::fmt::Display;

pub const PLACEHOLDER: char = '?';

/// Number of placeholders in a template
pub fn placeholder_count(template: &str) -> usize {
    template.matches(PLACEHOLDER).count()
}

/// Replace each placeholder, leftmost first, with the next argument.
///
/// Surplus arguments are ignored. Too few arguments is an error and nothing
/// is substituted.
pub fn substitute<S: AsRef<str>>(template: &str, args: &[S]) -> MapperResult<String> {
    let expected = placeholder_count(template);
    if args.len() < expected {
        return Err(MapperError::ArgumentCountMismatch {
            expected,
            actual: args.len(),
        });
    }

    let mut statement = String::with_capacity(
        template.len() + args.iter().take(expected).map(|a| a.as_ref().len()).sum::<usize>(),
    );
    let mut pieces = template.split(PLACEHOLDER);

    if let Some(head) = pieces.next() {
        statement.push_str(head);
    }
    for (piece, arg) in pieces.zip(args) {
        statement.push_str(arg.as_ref());
        statement.push_str(piece);
    }

    Ok(statement)
}

/// String form of a call argument as it is written into the statement
pub fn render_argument<T: Display + ?Sized>(value: &T) -> String {
    value.to_string()
}
