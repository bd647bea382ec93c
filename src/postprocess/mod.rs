//! Domain post-processing for Malaysian documents.
//!
//! Two steps run over the concatenated recognized text, in order:
//! document-type classification (keyword matching against a fixed priority
//! table) and lexical correction (known OCR misreadings of Malaysian
//! tokens, structured-field reformatting for MyKad numbers and phone
//! numbers, and a final artifact cleanup). Per-detection text is never
//! modified; corrections apply to the concatenated text only.

use crate::core::DocumentType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Keyword table for document classification, checked in priority order.
/// The first category with a matching keyword wins.
const DOCUMENT_KEYWORDS: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::MyKad,
        &["mykad", "kad pengenalan", "kerajaan malaysia", "warganegara"],
    ),
    (DocumentType::Passport, &["passport", "pasport"]),
    (
        DocumentType::License,
        &["lesen memandu", "driving licence", "driving license", "jpj"],
    ),
    (
        DocumentType::Invoice,
        &["invoice", "invois", "tax invoice", "resit", "receipt"],
    ),
    (
        DocumentType::BusinessRegistration,
        &["sijil pendaftaran", "registration certificate", "ssm"],
    ),
];

/// Known OCR misreadings on Malaysian documents and their corrections.
/// Matching is case-insensitive on whole words; replacements are the
/// canonical forms, which makes correction idempotent.
static CORRECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bkerajaah\b", "KERAJAAN"),
        (r"(?i)\bmalaysla\b", "MALAYSIA"),
        (r"(?i)\bmyka[do]\b", "MyKad"),
        (r"(?i)\b8?alamai\b", "ALAMAT"),
        (r"(?i)\b8alamat\b", "ALAMAT"),
        (r"(?i)\biarieh\b", "TARIKH"),
        (r"(?i)\bnana\b", "NAMA"),
        (r"(?i)\bl4hir\b", "LAHIR"),
        (r"(?i)\bpengena1an\b", "PENGENALAN"),
    ]
    .iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("correction pattern"), *replacement))
    .collect()
});

/// MyKad national-ID number: 6-2-4 digit grouping.
static MYKAD_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{6})[ -]?(\d{2})[ -]?(\d{4})\b").expect("mykad pattern"));

/// Malaysian phone number with a leading-zero area code.
static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(0\d{1,2})[ -](\d{7,8})\b").expect("phone pattern"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Classifies the document type from extracted text.
///
/// Matching is case-insensitive substring search; the table is checked in
/// fixed priority order and the first match wins, so ties are impossible.
pub fn classify_document(text: &str) -> DocumentType {
    let lowered = text.to_lowercase();
    for (doc_type, keywords) in DOCUMENT_KEYWORDS {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *doc_type;
        }
    }
    DocumentType::General
}

/// Applies Malaysian-specific lexical corrections and structured-field
/// reformatting to recognized text.
///
/// The pass is idempotent: correcting already-corrected text yields the
/// same text.
pub fn correct_text(text: &str) -> String {
    let mut corrected = text.to_string();
    for (pattern, replacement) in CORRECTIONS.iter() {
        corrected = pattern.replace_all(&corrected, *replacement).into_owned();
    }

    corrected = MYKAD_NUMBER.replace_all(&corrected, "$1-$2-$3").into_owned();
    corrected = PHONE_NUMBER.replace_all(&corrected, "$1-$2").into_owned();

    // Vertical-bar artifacts are almost always a misread capital I.
    corrected = corrected.replace('|', "I");
    WHITESPACE_RUN
        .replace_all(&corrected, " ")
        .trim()
        .to_string()
}
