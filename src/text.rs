//! Text pre-processing for case- and diacritic-insensitive matching
//!
//! Both sides of a text match run through the same fixed pipeline:
//! diacritic folding first, then case folding. The order matters: folding a
//! combining mark away can change what the subsequent case mapping sees, so
//! `case(fold(s))` is the defined result, never `fold(case(s))`.

use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

use crate::models::EvaluationOptions;

/// Combining Diacritical Marks block.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Apply the configured transformations to `input`.
///
/// Returns the input unchanged (and unallocated) when no transformation is
/// enabled.
pub fn preprocess<'a>(input: &'a str, options: &EvaluationOptions) -> Cow<'a, str> {
    if !options.fold_diacritics && !options.ignore_case {
        return Cow::Borrowed(input);
    }

    let mut text = Cow::Borrowed(input);
    if options.fold_diacritics {
        text = Cow::Owned(fold_diacritics(&text));
    }
    if options.ignore_case {
        text = Cow::Owned(lowercase(&text, options.locale.as_deref()));
    }
    text
}

/// Decompose canonically and drop combining diacritical marks, so that
/// `"Café"` folds to `"Cafe"`.
pub fn fold_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !COMBINING_MARKS.contains(c)).collect()
}

/// Lowercase `input`, honouring locale-specific mappings when a locale tag
/// is supplied.
///
/// Only the dotted/dotless-I languages (Turkish and Azerbaijani) deviate
/// from the locale-independent mapping: `I` lowercases to `ı` and `İ` to a
/// plain `i`. Every other locale falls back to [`str::to_lowercase`].
pub fn lowercase(input: &str, locale: Option<&str>) -> String {
    if locale.is_some_and(uses_dotted_i) {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                'I' => out.push('ı'),
                'İ' => out.push('i'),
                _ => out.extend(c.to_lowercase()),
            }
        }
        out
    } else {
        input.to_lowercase()
    }
}

/// Whether the primary language subtag selects dotted/dotless-I casing.
fn uses_dotted_i(locale: &str) -> bool {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale);
    primary.eq_ignore_ascii_case("tr") || primary.eq_ignore_ascii_case("az")
}
