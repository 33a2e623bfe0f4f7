//! snaptest matching
//!
//! Structural comparison of captured and live values.
//!
//! # Core Concepts
//!
//! - [`DeepEquality`]: breadth-first, cycle-safe comparison over any two
//!   [`Structure`] views
//! - [`Matcher`]: self-describing predicate used by generated assertions
//! - [`GenericMatcher`]: reflective field matcher, strict or upcast
//! - [`matchers`]: collection, array and literal matchers
//!
//! # Example
//!
//! ```rust
//! use snaptest_matching::{live_equals, matchers::equal_to, Matcher};
//! use snaptest_values::{LiveValue, TypeRegistry};
//!
//! let types = TypeRegistry::with_builtins();
//! assert!(live_equals(&types, &LiveValue::str("a"), &LiveValue::str("a")));
//! assert!(equal_to(LiveValue::Int(3)).matches(&LiveValue::Int(3), &types));
//! ```

pub mod description;
pub mod equality;
pub mod generic;
pub mod matcher;
pub mod matchers;
pub mod structure;

pub use description::{Description, DESCRIPTION_FAILED};
pub use equality::{graph_equals, graph_matches_live, live_equals, DeepEquality, Worklist};
pub use generic::{generic_matcher, Expected, GenericMatcher, GenericMatcherBuilder};
pub use matcher::{assert_that, expect_throws, AssertionError, BoxMatcher, Matcher};
pub use structure::{GraphStructure, Inspected, LiveStructure, Structure};

/// Version of the matching crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use snaptest_test_utils::{fixture_types, ring, NODE};
    use snaptest_values::TypeRef;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn generic_matcher_over_cycle() {
        let types = fixture_types();
        let head = ring(&[1, 2]);
        let second = head.field("next").unwrap_or(snaptest_values::LiveValue::Null);
        let matcher = generic_matcher()
            .field("value", 1)
            .field("next", second)
            .matching(TypeRef::class(NODE));
        assert!(assert_that(&head.into(), matcher.as_ref(), &types).is_ok());
    }
}
