//! Phone canonicalization for Brazilian WhatsApp numbers
//!
//! Numbers without a country code are assumed to be Brazilian. A 10 or 11 digit
//! number is always treated as local (DDD + number), even if it happens to be a
//! complete number from another country.

use crate::core::error_handling::PhoneFormatError;

/// Default country code prepended to local numbers
pub const BRAZIL_COUNTRY_CODE: &str = "55";

const MIN_DIGITS: usize = 10;
const MAX_DIGITS: usize = 15;

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Canonicalize a raw phone into `+<country code><number>`.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneFormatError> {
    let trimmed = raw.trim();
    let digits = digits_of(trimmed);

    if digits.len() < MIN_DIGITS {
        return Err(PhoneFormatError::TooShort(raw.to_string()));
    }
    if digits.len() > MAX_DIGITS {
        return Err(PhoneFormatError::TooLong(raw.to_string()));
    }

    // DDD + 8 or 9 digit number
    if digits.len() == 10 || digits.len() == 11 {
        return Ok(format!("+{}{}", BRAZIL_COUNTRY_CODE, digits));
    }

    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with(BRAZIL_COUNTRY_CODE) {
        return Ok(format!("+{}", digits));
    }

    if trimmed.starts_with('+') {
        let with_plus = format!("+{}", digits);
        if with_plus.len() >= 11 {
            return Ok(with_plus);
        }
    }

    if digits.len() >= MIN_DIGITS {
        return Ok(format!("+{}{}", BRAZIL_COUNTRY_CODE, digits));
    }

    Err(PhoneFormatError::UnrecognizedFormat(raw.to_string()))
}

/// Render a phone for display as `+55 (DD) NNNNN-NNNN`.
///
/// Returns an empty string when the input has no digits and `+55 <digits>` when
/// there are too few digits to split out an area code.
pub fn format_whatsapp_display(phone: &str) -> String {
    let digits = digits_of(phone);
    if digits.is_empty() {
        return String::new();
    }

    let rest = digits.strip_prefix(BRAZIL_COUNTRY_CODE).unwrap_or(&digits);
    if rest.len() < 10 {
        return format!("+{} {}", BRAZIL_COUNTRY_CODE, digits);
    }

    let (ddd, number) = rest.split_at(2);
    let split = match number.len() {
        9 => 5,
        8 => 4,
        n if n > 5 => 5,
        n => n.div_ceil(2),
    };
    let (head, tail) = number.split_at(split);
    format!("+{} ({}) {}-{}", BRAZIL_COUNTRY_CODE, ddd, head, tail)
}
