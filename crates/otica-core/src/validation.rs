//! # Validation Module
//!
//! Input validation for client registration, cart operations and lookups.
//!
//! ## CPF Check Digits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  529.982.247-25                                                         │
//! │                                                                         │
//! │  1. strip non-digits        → 52998224725 (exactly 11, not all equal)  │
//! │  2. digits 1-9  × 10..2     → sum 295 → (295×10) mod 11 = 2  ✓ d10     │
//! │  3. digits 1-10 × 11..2     → sum 347 → (347×10) mod 11 = 5  ✓ d11     │
//! │                                                                         │
//! │  A result of 10 counts as 0.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use otica_core::validation::{format_cpf, validate_cpf};
//!
//! let digits = validate_cpf("529.982.247-25").unwrap();
//! assert_eq!(digits, "52998224725");
//! assert_eq!(format_cpf(&digits), "529.982.247-25");
//! ```

use crate::error::ValidationError;
use crate::types::Discount;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// CPF
// =============================================================================

/// Strips everything but ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Computes one CPF check digit over `digits`, weights `len+1` down to 2.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    let digit = (sum * 10) % 11;
    if digit >= 10 {
        0
    } else {
        digit
    }
}

/// Validates a CPF and returns its 11 digits.
///
/// ## Rules
/// - Formatting characters are ignored
/// - Exactly 11 digits, not all identical
/// - Both check digits must match
///
/// ## Example
/// ```rust
/// use otica_core::validation::validate_cpf;
///
/// assert!(validate_cpf("529.982.247-25").is_ok());
/// assert!(validate_cpf("111.111.111-11").is_err());
/// assert!(validate_cpf("123.456.789-00").is_err());
/// ```
pub fn validate_cpf(input: &str) -> ValidationResult<String> {
    let digits = digits_only(input);

    if digits.is_empty() {
        return Err(ValidationError::required("cpf"));
    }

    if digits.len() != 11 {
        return Err(ValidationError::invalid("cpf", "must have 11 digits"));
    }

    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

    if values.iter().all(|d| *d == values[0]) {
        return Err(ValidationError::invalid("cpf", "digits cannot all be equal"));
    }

    if check_digit(&values[..9]) != values[9] || check_digit(&values[..10]) != values[10] {
        return Err(ValidationError::invalid("cpf", "check digits do not match"));
    }

    Ok(digits)
}

/// Boolean form of [`validate_cpf`].
pub fn is_valid_cpf(input: &str) -> bool {
    validate_cpf(input).is_ok()
}

/// Formats a CPF for display as `NNN.NNN.NNN-NN`.
///
/// Input that does not carry exactly 11 digits is returned unchanged.
pub fn format_cpf(input: &str) -> String {
    let d = digits_only(input);
    if d.len() != 11 {
        return input.to_string();
    }
    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

// =============================================================================
// Client Fields
// =============================================================================

/// Validates a client name and returns it trimmed.
pub fn validate_client_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("nome"));
    }

    if name.chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "nome".to_string(),
            min: 3,
        });
    }

    if name.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: "nome".to_string(),
            max: 120,
        });
    }

    Ok(name.to_string())
}

/// Validates a Brazilian phone number and returns its digits.
///
/// ## Rules
/// - Area code included: 10 digits (landline) or 11 (mobile)
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let digits = digits_only(phone);

    if digits.is_empty() {
        return Err(ValidationError::required("telefone"));
    }

    if digits.len() < 10 || digits.len() > 11 {
        return Err(ValidationError::invalid(
            "telefone",
            "must have 10 or 11 digits including area code",
        ));
    }

    Ok(digits)
}

/// Validates an optional email. Blank input is treated as absent.
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || email.contains(char::is_whitespace) {
        return Err(ValidationError::invalid("email", "must be a valid address"));
    }

    Ok(Some(email.to_lowercase()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantidade".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantidade".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount as entered at the counter.
///
/// Percentages above 100% are rejected; value discounts must not be negative.
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    match discount {
        Discount::Nenhum => Ok(()),
        Discount::Value { amount } if amount.is_negative() => {
            Err(ValidationError::OutOfRange {
                field: "desconto".to_string(),
                min: 0,
                max: i64::MAX,
            })
        }
        Discount::Value { .. } => Ok(()),
        Discount::Percentage { bps } if *bps > 10_000 => Err(ValidationError::OutOfRange {
            field: "desconto".to_string(),
            min: 0,
            max: 10_000,
        }),
        Discount::Percentage { .. } => Ok(()),
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Validates a search query and returns it trimmed.
///
/// Empty is allowed (callers return nothing for it).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use proptest::prelude::*;

    #[test]
    fn test_validate_cpf_reference_values() {
        assert_eq!(validate_cpf("529.982.247-25").unwrap(), "52998224725");
        assert!(validate_cpf("52998224725").is_ok());

        assert!(validate_cpf("111.111.111-11").is_err());
        assert!(validate_cpf("123.456.789-00").is_err());
        assert!(validate_cpf("529.982.247-2").is_err());
        assert!(matches!(
            validate_cpf(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_check_digit_weights() {
        // first digit weighs 10, last weighs 2
        assert_eq!(check_digit(&[1, 0, 0, 0, 0, 0, 0, 0, 0]), 1); // 100 mod 11
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 1]), 9); // 20 mod 11
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 1, 0]), 8); // 30 mod 11
    }

    #[test]
    fn test_check_digit_ten_becomes_zero() {
        // 6 × 2 = 12 → 120 mod 11 = 10
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 6]), 0);
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 6]), 0);
    }

    #[test]
    fn test_format_cpf() {
        assert_eq!(format_cpf("52998224725"), "529.982.247-25");
        assert_eq!(format_cpf("529.982.247-25"), "529.982.247-25");
        assert_eq!(format_cpf("123"), "123");
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("(11) 98765-4321").unwrap(), "11987654321");
        assert_eq!(validate_phone("11 3333-4444").unwrap(), "1133334444");
        assert!(validate_phone("98765-4321").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(None).unwrap(), None);
        assert_eq!(validate_email(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_email(Some("Maria@Otica.com.br")).unwrap(),
            Some("maria@otica.com.br".to_string())
        );
        assert!(validate_email(Some("maria")).is_err());
        assert!(validate_email(Some("maria@otica")).is_err());
        assert!(validate_email(Some("a@b@c.com")).is_err());
    }

    #[test]
    fn test_validate_client_name() {
        assert_eq!(validate_client_name("  Ana Souza ").unwrap(), "Ana Souza");
        assert!(validate_client_name("").is_err());
        assert!(validate_client_name("Al").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(&Discount::Percentage { bps: 10_000 }).is_ok());
        assert!(validate_discount(&Discount::Percentage { bps: 10_001 }).is_err());
        assert!(validate_discount(&Discount::Value {
            amount: Money::from_cents(-1)
        })
        .is_err());
        // larger than any subtotal is still accepted
        assert!(validate_discount(&Discount::Value {
            amount: Money::from_cents(99_999_999)
        })
        .is_ok());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  ray ").unwrap(), "ray");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }

    fn cpf_from_base(base: &[u32]) -> String {
        let mut digits = base.to_vec();
        digits.push(check_digit(&digits));
        digits.push(check_digit(&digits));
        digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
    }

    proptest! {
        #[test]
        fn prop_generated_cpf_is_valid(base in proptest::collection::vec(0u32..10, 9)) {
            prop_assume!(base.iter().any(|d| *d != base[0]));
            let cpf = cpf_from_base(&base);
            prop_assert!(is_valid_cpf(&cpf));
            prop_assert!(is_valid_cpf(&format_cpf(&cpf)));
        }

        #[test]
        fn prop_wrong_last_digit_is_rejected(
            base in proptest::collection::vec(0u32..10, 9),
            bump in 1u32..10,
        ) {
            prop_assume!(base.iter().any(|d| *d != base[0]));
            let cpf = cpf_from_base(&base);
            let last = cpf.chars().last().and_then(|c| c.to_digit(10)).unwrap();
            let tampered = format!("{}{}", &cpf[..10], (last + bump) % 10);
            prop_assert!(!is_valid_cpf(&tampered));
        }

        #[test]
        fn prop_identical_digits_always_rejected(d in 0u32..10) {
            let cpf: String = std::iter::repeat(char::from_digit(d, 10).unwrap()).take(11).collect();
            prop_assert!(!is_valid_cpf(&cpf));
        }

        #[test]
        fn prop_wrong_length_rejected(digits in "[0-9]{0,10}") {
            prop_assert!(!is_valid_cpf(&digits));
        }
    }
}
