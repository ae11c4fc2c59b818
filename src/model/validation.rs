use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/**
 * Youngest age at which a person can be employed.
 */
pub const MINIMUM_EMPLOYEE_AGE: i32 = 16;

/**
 * Age under which an employee is recorded with a warning.
 */
pub const ADULT_AGE: i32 = 18;

/**
 * Conversion table for characters in odd positions (1-based) of a fiscal code.
 * Digits use the first ten entries.
 */
const FISCAL_CODE_ODD_VALUES: [u32; 26] = [1, 0, 5, 7, 9, 13, 15, 17, 19, 21, 2, 4, 18, 20, 11, 3, 6, 8, 12, 14, 16, 10, 22, 25, 24, 23];

static FISCAL_CODE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PLATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static OLD_PLATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static IBAN_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static ITALIAN_POSTAL_CODE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static MATRICOLA_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/**
 * Matches a value against a lazily compiled pattern. A pattern that fails to compile matches nothing.
 */
fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref().is_some_and(|regex| regex.is_match(value))
}

/**
 * Validates an Italian fiscal code, including its control character.
 * Empty input is accepted, required checks are done separately.
 *
 * # Arguments
 * `fiscal_code`: The fiscal code to validate, case-insensitive.
 *
 * # Returns
 * True if the fiscal code is valid or empty.
 */
pub fn is_valid_fiscal_code(fiscal_code: &str) -> bool {
    let fiscal_code = fiscal_code.trim().to_uppercase();
    if fiscal_code.is_empty() {
        return true;
    }
    if fiscal_code.len() != 16 || !matches(&FISCAL_CODE_PATTERN, r"^[A-Z]{6}[0-9]{2}[A-Z][0-9]{2}[A-Z][0-9]{3}[A-Z]$", &fiscal_code) {
        return false;
    }
    let characters: Vec<char> = fiscal_code.chars().collect();
    fiscal_code_control_character(&characters[..15]) == Some(characters[15])
}

/**
 * Computes the control character of the first fifteen characters of a fiscal code.
 */
fn fiscal_code_control_character(characters: &[char]) -> Option<char> {
    let mut sum = 0u32;
    for (index, character) in characters.iter().enumerate() {
        let value = if character.is_ascii_digit() { u32::from(*character) - u32::from('0') } else { u32::from(*character) - u32::from('A') };
        let value = usize::try_from(value).ok()?;
        sum += if index % 2 == 0 { *FISCAL_CODE_ODD_VALUES.get(value)? } else { u32::try_from(value).ok()? };
    }
    char::from_u32(u32::from('A') + sum % 26)
}

/**
 * Normalizes a plate: trimmed, uppercased and without whitespace.
 */
pub fn normalize_plate(plate: &str) -> String {
    plate.chars().filter(|character| !character.is_whitespace()).collect::<String>().to_uppercase()
}

/**
 * Validates an Italian vehicle plate, current (AB123CD) or old (AB123456) format.
 *
 * # Arguments
 * `plate`: The plate to validate.
 *
 * # Returns
 * True if the normalized plate matches one of the formats.
 */
pub fn is_valid_plate(plate: &str) -> bool {
    let plate = normalize_plate(plate);
    if plate.is_empty() {
        return false;
    }
    matches(&PLATE_PATTERN, r"^[A-Z]{2}[0-9]{3}[A-Z]{2}$", &plate) || matches(&OLD_PLATE_PATTERN, r"^[A-Z]{2}[0-9]{6}$", &plate)
}

/**
 * Validates an email address.
 */
pub fn is_valid_email(email: &str) -> bool {
    matches(&EMAIL_PATTERN, r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$", email.trim())
}

/**
 * Validates a phone number. Blank numbers are accepted.
 */
pub fn is_valid_phone(phone: &str) -> bool {
    phone.is_empty() || matches(&PHONE_PATTERN, r"^[\s+\-()0-9]{8,20}$", phone)
}

/**
 * Validates an Italian IBAN. Blank values are accepted.
 */
pub fn is_valid_iban(iban: &str) -> bool {
    iban.is_empty() || matches(&IBAN_PATTERN, r"^IT[0-9]{2}[A-Z][0-9]{10}[0-9A-Z]{12}$", iban)
}

/**
 * Validates a postal code. Italian addresses, and addresses without a country, need five digits.
 *
 * # Arguments
 * `country_code`: ISO country code of the address.
 * `postal_code`: The postal code.
 */
pub fn is_valid_postal_code(country_code: Option<&str>, postal_code: &str) -> bool {
    let postal_code = postal_code.trim();
    if postal_code.is_empty() {
        return true;
    }
    match country_code.map(str::trim) {
        None | Some("") => matches(&ITALIAN_POSTAL_CODE_PATTERN, r"^[0-9]{5}$", postal_code),
        Some(code) if code.eq_ignore_ascii_case("IT") => matches(&ITALIAN_POSTAL_CODE_PATTERN, r"^[0-9]{5}$", postal_code),
        Some(_) => true,
    }
}

/**
 * Validates a matricola: uppercase letters, digits, underscores and dashes.
 */
pub fn is_valid_matricola(matricola: &str) -> bool {
    matches(&MATRICOLA_PATTERN, r"^[A-Z0-9_-]+$", matricola)
}

/**
 * Completed years between a birth date and a reference date.
 */
pub fn age_at(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/**
 * Blank strings become None, others are trimmed.
 */
pub fn trim_to_none(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_fiscal_code() {
        assert!(is_valid_fiscal_code("RSSMRA85M01H501Q"));
        assert!(is_valid_fiscal_code("MRTMTT91D08F205J"));
    }

    #[test]
    fn test_valid_fiscal_code_lowercase() {
        assert!(is_valid_fiscal_code("rssmra85m01h501q"));
        assert!(is_valid_fiscal_code(" RSSMRA85M01H501Q "));
    }

    #[test]
    fn test_empty_fiscal_code_is_left_to_required_check() {
        assert!(is_valid_fiscal_code(""));
    }

    #[test]
    fn test_invalid_fiscal_code() {
        assert!(!is_valid_fiscal_code("ABCDEF12G34H567"));
        assert!(!is_valid_fiscal_code("12345678901234567"));
        assert!(!is_valid_fiscal_code("ABCDEFGHIJKLMNOP"));
    }

    #[test]
    fn test_fiscal_code_wrong_control_character() {
        assert!(!is_valid_fiscal_code("RSSMRA85M01H501A"));
    }

    #[test]
    fn test_valid_plates() {
        for plate in ["AB123CD", "XY999ZZ", "AA000AA", "ab123cd", " AB123CD ", "AB 123 CD", "AB123456"] {
            assert!(is_valid_plate(plate), "{plate} should be valid");
        }
    }

    #[test]
    fn test_invalid_plates() {
        for plate in ["ABC123", "12345AB", "ABCDEFG", "AB1234567", "", "   "] {
            assert!(!is_valid_plate(plate), "{plate} should be invalid");
        }
    }

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate(" ab 123 cd "), "AB123CD");
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("mario.rossi@example.it"));
        assert!(!is_valid_email("mario.rossi@"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_phone_and_iban() {
        assert!(is_valid_phone(""));
        assert!(is_valid_phone("+39 06 1234567"));
        assert!(!is_valid_phone("12345"));
        assert!(is_valid_iban(""));
        assert!(is_valid_iban("IT60X0542811101000000123456"));
        assert!(!is_valid_iban("DE89370400440532013000"));
    }

    #[test]
    fn test_postal_code() {
        assert!(is_valid_postal_code(Some("IT"), "00184"));
        assert!(is_valid_postal_code(None, "20121"));
        assert!(!is_valid_postal_code(Some("it"), "2012"));
        assert!(!is_valid_postal_code(None, "2012A"));
        assert!(is_valid_postal_code(Some("FR"), "75001 CEDEX"));
        assert!(is_valid_postal_code(Some("IT"), ""));
    }

    #[test]
    fn test_matricola() {
        assert!(is_valid_matricola("A123"));
        assert!(is_valid_matricola("MAT_01-B"));
        assert!(!is_valid_matricola("A 123"));
        assert!(!is_valid_matricola("a123"));
        assert!(!is_valid_matricola("M/123"));
        assert!(!is_valid_matricola(""));
    }

    #[test]
    fn test_age_at() {
        let birth_date = NaiveDate::from_ymd_opt(2008, 6, 15).unwrap();
        assert_eq!(age_at(birth_date, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 15);
        assert_eq!(age_at(birth_date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 16);
    }

    #[test]
    fn test_trim_to_none() {
        assert_eq!(trim_to_none(Some("  ".to_string())), None);
        assert_eq!(trim_to_none(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(trim_to_none(None), None);
    }
}
