//! Functions for correctness checks similar to the *design by contract* philosophy.
//!
//! A condition is a predicate which must hold true just prior to the execution of
//! some section of code for correct behavior. An [`anyhow::Result`] is returned
//! with a descriptive message when the condition check fails.

/// A message prefix usable alongside `expect` or other assertion-related calls.
pub const FAILED: &str = "Condition failed";

/// Checks the `predicate` is true.
///
/// # Errors
///
/// Returns an error if the validation check fails.
#[inline(always)]
pub fn check_predicate_true(predicate: bool, fail_msg: &str) -> anyhow::Result<()> {
    if !predicate {
        anyhow::bail!("{fail_msg}")
    }
    Ok(())
}

/// Checks the string `s` is not empty.
///
/// # Errors
///
/// Returns an error if `s` is empty.
#[inline(always)]
pub fn check_nonempty_string<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    if s.as_ref().is_empty() {
        anyhow::bail!("invalid string for '{param}', was empty");
    }
    Ok(())
}

/// Checks the `usize` value is in range `[l, r]` (inclusive).
///
/// # Errors
///
/// Returns an error if the validation check fails.
#[inline(always)]
pub fn check_in_range_inclusive_usize(
    value: usize,
    l: usize,
    r: usize,
    param: &str,
) -> anyhow::Result<()> {
    if value < l || value > r {
        anyhow::bail!("invalid usize for '{param}' not in range [{l}, {r}], was {value}")
    }
    Ok(())
}

/// Checks the `f64` value is in range `[l, r]` (inclusive).
///
/// # Errors
///
/// Returns an error if the validation check fails.
#[inline(always)]
pub fn check_in_range_inclusive_f64(value: f64, l: f64, r: f64, param: &str) -> anyhow::Result<()> {
    if value.is_nan() || value.is_infinite() {
        anyhow::bail!("invalid f64 for '{param}', was {value}")
    }
    if value < l || value > r {
        anyhow::bail!("invalid f64 for '{param}' not in range [{l}, {r}], was {value}")
    }
    Ok(())
}

/// Checks the `u64` value is positive (> 0).
///
/// # Errors
///
/// Returns an error if the validation check fails.
#[inline(always)]
pub fn check_positive_u64(value: u64, param: &str) -> anyhow::Result<()> {
    if value == 0 {
        anyhow::bail!("invalid u64 for '{param}' not positive, was {value}")
    }
    Ok(())
}

/// Checks `s` consists of exactly `len` uppercase ASCII alphabetic characters.
///
/// # Errors
///
/// Returns an error if the validation check fails.
#[inline(always)]
pub fn check_uppercase_alpha_len<T: AsRef<str>>(s: T, len: usize, param: &str) -> anyhow::Result<()> {
    let s = s.as_ref();
    if s.len() != len || !s.chars().all(|c| c.is_ascii_uppercase()) {
        anyhow::bail!("invalid string for '{param}', expected {len} uppercase ASCII letters, was '{s}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(false, false)]
    #[case(true, true)]
    fn test_check_predicate_true(#[case] predicate: bool, #[case] expected: bool) {
        let result = check_predicate_true(predicate, "the predicate was false").is_ok();
        assert_eq!(result, expected);
    }

    #[rstest]
    #[case("a", true)]
    #[case("", false)]
    fn test_check_nonempty_string(#[case] s: &str, #[case] expected: bool) {
        assert_eq!(check_nonempty_string(s, "value").is_ok(), expected);
    }

    #[rstest]
    #[case(0, 0, 1, true)]
    #[case(2, 0, 1, false)]
    fn test_check_in_range_inclusive_usize(
        #[case] value: usize,
        #[case] l: usize,
        #[case] r: usize,
        #[case] expected: bool,
    ) {
        assert_eq!(check_in_range_inclusive_usize(value, l, r, "value").is_ok(), expected);
    }

    #[rstest]
    #[case(0.0, 0.0, 1.0, true)]
    #[case(f64::NAN, 0.0, 1.0, false)]
    #[case(1.5, 0.0, 1.0, false)]
    fn test_check_in_range_inclusive_f64(#[case] value: f64, #[case] l: f64, #[case] r: f64, #[case] expected: bool) {
        assert_eq!(check_in_range_inclusive_f64(value, l, r, "value").is_ok(), expected);
    }

    #[rstest]
    #[case("USD", 3, true)]
    #[case("usd", 3, false)]
    #[case("US", 3, false)]
    fn test_check_uppercase_alpha_len(#[case] s: &str, #[case] len: usize, #[case] expected: bool) {
        assert_eq!(check_uppercase_alpha_len(s, len, "currency").is_ok(), expected);
    }
}
