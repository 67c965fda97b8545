// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Functions for correctness checks similar to the *design by contract* philosophy.
//!
//! An [`anyhow::Result`] is returned with a descriptive message when the
//! condition check fails. Callers either propagate it with `?` or, where the
//! input is known to be valid, `.expect(FAILED)`.

/// A message prefix that can be used with calls to `expect` or other assertion-related functions.
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

/// Checks the string `s` is not empty and contains at least one non-whitespace character.
///
/// # Errors
///
/// Returns an error if `s` is empty or consists only of whitespace.
#[inline(always)]
pub fn check_valid_string<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    let s = s.as_ref();
    if s.is_empty() {
        anyhow::bail!("invalid string for '{param}', was empty");
    }
    if s.chars().all(char::is_whitespace) {
        anyhow::bail!("invalid string for '{param}', was all whitespace");
    }
    Ok(())
}

/// Checks the string `s` is a single token: valid and free of any whitespace.
///
/// Wire protocol arguments are space delimited, so an embedded space or
/// newline would change the meaning of the rendered command.
///
/// # Errors
///
/// Returns an error if `s` is not a valid string or contains whitespace.
#[inline(always)]
pub fn check_valid_token<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    let s = s.as_ref();
    check_valid_string(s, param)?;
    if s.chars().any(char::is_whitespace) {
        anyhow::bail!("invalid token for '{param}', contained whitespace, was '{s}'");
    }
    Ok(())
}

/// Checks the string `s` contains no line breaks.
///
/// # Errors
///
/// Returns an error if `s` contains a `\r` or `\n` character.
#[inline(always)]
pub fn check_single_line<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    if s.as_ref().contains(['\r', '\n']) {
        anyhow::bail!("invalid string for '{param}', contained a line break");
    }
    Ok(())
}

/// Checks the `f64` value is in range [`l`, `r`] (inclusive).
///
/// # Errors
///
/// Returns an error if the value is not finite or is out of range.
#[inline(always)]
pub fn check_in_range_inclusive_f64(value: f64, l: f64, r: f64, param: &str) -> anyhow::Result<()> {
    if !value.is_finite() {
        anyhow::bail!("invalid f64 for '{param}', was not finite, was {value}")
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
/// Returns an error if the value is zero.
#[inline(always)]
pub fn check_positive_u64(value: u64, param: &str) -> anyhow::Result<()> {
    if value == 0 {
        anyhow::bail!("invalid u64 for '{param}' not positive, was {value}")
    }
    Ok(())
}

/// Checks the slice is not empty.
///
/// # Errors
///
/// Returns an error if `slice` is empty.
#[inline(always)]
pub fn check_slice_not_empty<T>(slice: &[T], param: &str) -> anyhow::Result<()> {
    if slice.is_empty() {
        anyhow::bail!("the '{param}' slice `&[{}]` was empty", std::any::type_name::<T>())
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
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
    #[case("", false)]
    #[case(" ", false)]
    #[case("\t\n", false)]
    #[case("a", true)]
    #[case(" ClueCon ", true)]
    fn test_check_valid_string(#[case] s: &str, #[case] expected: bool) {
        assert_eq!(check_valid_string(s, "value").is_ok(), expected);
    }

    #[rstest]
    #[case("", false)]
    #[case("a b", false)]
    #[case("uuid\n", false)]
    #[case("192.168.1.1", true)]
    #[case("d3418bd1-cfa4-42a9-8a8e-a04a770c808d", true)]
    fn test_check_valid_token(#[case] s: &str, #[case] expected: bool) {
        assert_eq!(check_valid_token(s, "value").is_ok(), expected);
    }

    #[rstest]
    #[case("hello world", true)]
    #[case("hello\nworld", false)]
    #[case("hello\r", false)]
    fn test_check_single_line(#[case] s: &str, #[case] expected: bool) {
        assert_eq!(check_single_line(s, "value").is_ok(), expected);
    }

    #[rstest]
    #[case(0.0, 0.0, 0.0, true)]
    #[case(-4.0, -4.0, 4.0, true)]
    #[case(4.0, -4.0, 4.0, true)]
    #[case(4.1, -4.0, 4.0, false)]
    #[case(f64::NAN, -4.0, 4.0, false)]
    #[case(f64::INFINITY, -4.0, 4.0, false)]
    fn test_check_in_range_inclusive_f64(
        #[case] value: f64,
        #[case] l: f64,
        #[case] r: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(
            check_in_range_inclusive_f64(value, l, r, "value").is_ok(),
            expected
        );
    }

    #[rstest]
    fn test_check_positive_u64() {
        assert!(check_positive_u64(1, "value").is_ok());
        assert!(check_positive_u64(0, "value").is_err());
    }

    #[rstest]
    fn test_check_slice_not_empty() {
        assert!(check_slice_not_empty(&[1], "value").is_ok());
        let err = check_slice_not_empty::<u8>(&[], "events").unwrap_err();
        assert!(err.to_string().contains("'events'"));
    }
}
