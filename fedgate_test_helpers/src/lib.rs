//! Helpers shared by the test suites of the workspace crates.

pub mod tracing;

/// Asserts that the string representation of `$actual` contains `$expected`, printing both on
/// failure.
#[macro_export]
macro_rules! assert_contains {
    ($actual: expr, $expected: expr) => {
        let actual_value: String = $actual.to_string();
        let expected_value: String = $expected.to_string();
        assert!(
            actual_value.contains(&expected_value),
            "Can not find expected in actual.\n\nExpected:\n{}\n\nActual:\n{}",
            expected_value,
            actual_value
        );
    };
}

/// Opposite of [`assert_contains!`].
#[macro_export]
macro_rules! assert_not_contains {
    ($actual: expr, $unexpected: expr) => {
        let actual_value: String = $actual.to_string();
        let unexpected_value: String = $unexpected.to_string();
        assert!(
            !actual_value.contains(&unexpected_value),
            "Found unexpected in actual.\n\nUnexpected:\n{}\n\nActual:\n{}",
            unexpected_value,
            actual_value
        );
    };
}
