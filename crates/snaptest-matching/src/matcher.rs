//! Matcher trait and assertion entry point

use crate::description::Description;
use snaptest_values::{LiveValue, TypeRegistry};
use std::fmt;
use std::sync::Arc;

/// Predicate over live values that can explain itself
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Check `item`, resolving field ancestry and assignability in `types`
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool;

    /// Describe what a matching value looks like
    fn describe_to(&self, description: &mut Description);

    /// Describe why `item` does not match
    fn describe_mismatch(
        &self,
        item: &LiveValue,
        _types: &TypeRegistry,
        description: &mut Description,
    ) {
        description.text("was ").value(item);
    }
}

/// Shared matcher handle
pub type BoxMatcher = Arc<dyn Matcher>;

/// Failed assertion with both sides described
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected: {expected}\n     but: {actual}")]
pub struct AssertionError {
    /// Description of the matcher
    pub expected: String,
    /// Description of the mismatch
    pub actual: String,
}

/// Check `item` against `matcher`
///
/// # Errors
/// Returns [`AssertionError`] describing both sides on mismatch.
pub fn assert_that(
    item: &LiveValue,
    matcher: &dyn Matcher,
    types: &TypeRegistry,
) -> Result<(), AssertionError> {
    if matcher.matches(item, types) {
        return Ok(());
    }
    let mut expected = Description::new();
    matcher.describe_to(&mut expected);
    let mut actual = Description::new();
    matcher.describe_mismatch(item, types, &mut actual);
    tracing::debug!(expected = expected.as_str(), actual = actual.as_str(), "assertion failed");
    Err(AssertionError {
        expected: expected.into_string(),
        actual: actual.into_string(),
    })
}

/// Error value of a call that must fail
///
/// # Errors
/// Returns [`AssertionError`] if `call` completes normally.
pub fn expect_throws<T: fmt::Debug>(
    call: impl FnOnce() -> Result<T, LiveValue>,
) -> Result<LiveValue, AssertionError> {
    match call() {
        Err(thrown) => Ok(thrown),
        Ok(value) => Err(AssertionError {
            expected: "a thrown error".to_string(),
            actual: format!("returned {value:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::equal_to;

    #[test]
    fn failed_assertion_describes_both_sides() {
        let types = TypeRegistry::with_builtins();
        let err = assert_that(&LiveValue::Int(2), equal_to(LiveValue::Int(3)).as_ref(), &types)
            .unwrap_err();
        assert_eq!(err.expected, "3");
        assert_eq!(err.actual, "was 2");
    }

    #[test]
    fn expect_throws_needs_an_error() {
        let thrown = expect_throws(|| Err::<(), _>(LiveValue::str("boom")));
        assert!(thrown.is_ok_and(|value| value.same(&LiveValue::str("boom"))));
        assert!(expect_throws(|| Ok::<_, LiveValue>(1)).is_err());
    }
}
