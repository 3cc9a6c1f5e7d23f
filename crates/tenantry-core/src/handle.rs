//! Handle normalization
//!
//! A handle is the identifier-safe form of a human-readable name or code:
//! lowercase ASCII letters and digits joined by single `-` separators. Remote
//! group, channel and user names, tenant subdomains and database namespace
//! names are all derived from handles.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum handle length in characters.
pub const MAX_HANDLE_LENGTH: usize = 50;

const SEPARATOR: char = '-';

/// Normalize arbitrary text into a handle.
///
/// Lowercases, strips diacritics, collapses every run of non-alphanumeric
/// characters into one separator, trims separators at both ends and caps the
/// length at [`MAX_HANDLE_LENGTH`]. May return an empty string when the input
/// contains no letters or digits.
pub fn normalize_handle(input: &str) -> String {
    let mut handle = String::with_capacity(input.len().min(MAX_HANDLE_LENGTH));
    let mut pending_separator = false;

    for c in input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(fold_letter)
    {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !handle.is_empty() {
                handle.push(SEPARATOR);
            }
            pending_separator = false;
            handle.push(c);
        } else {
            pending_separator = true;
        }

        if handle.len() >= MAX_HANDLE_LENGTH {
            break;
        }
    }

    handle.truncate(MAX_HANDLE_LENGTH);
    while handle.ends_with(SEPARATOR) {
        handle.pop();
    }
    handle
}

/// Letters that carry no combining mark after decomposition.
fn fold_letter(c: char) -> char {
    match c {
        'đ' => 'd',
        'ø' => 'o',
        'ł' => 'l',
        'ß' => 's',
        other => other,
    }
}

/// Whether `input` is already a valid handle (and therefore a valid subdomain).
pub fn is_handle(input: &str) -> bool {
    !input.is_empty() && normalize_handle(input) == input
}

/// Database namespace (schema) name for a tenant subdomain.
///
/// Handles never contain `_`, so replacing the separator keeps the mapping
/// injective while producing a plain Postgres identifier.
pub fn namespace_for_subdomain(subdomain: &str) -> String {
    format!("schema_{}", subdomain.replace(SEPARATOR, "_"))
}
