//! Field-key normalization: lowercasing plus a synonym table collapsing
//! Yahoo's inconsistent fundamentals naming onto one canonical vocabulary.

/// Known synonyms mapped to their canonical key. Checked after lowercasing
/// and snake-casing, so `"totalRevenues"` and `"total_revenues"` both match
/// the `"total_revenues"` entry.
const SYNONYMS: &[(&str, &str)] = &[
    ("total_revenues", "total_revenue"),
    ("totalrevenue", "total_revenue"),
    ("basic_eps", "eps_basic"),
    ("basiceps", "eps_basic"),
    ("diluted_eps", "eps_diluted"),
    ("dilutedeps", "eps_diluted"),
    ("net_income_common_stockholders", "net_income"),
    ("netincome", "net_income"),
    ("total_assets", "total_assets"),
    ("totalassets", "total_assets"),
    ("total_liabilities_net_minority_interest", "total_liabilities"),
    ("totalliab", "total_liabilities"),
    ("cash_and_cash_equivalents", "cash"),
    ("cashandcashequivalents", "cash"),
    ("operating_cash_flow", "cash_from_operations"),
    ("totalcashfromoperatingactivities", "cash_from_operations"),
];

fn snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch == ' ' || ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Normalizes a raw field key from an extractor into the canonical
/// fundamentals vocabulary: trims, snake-cases, then applies known synonyms.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let snaked = snake_case(raw.trim());
    SYNONYMS
        .iter()
        .find(|(candidate, _)| *candidate == snaked)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(snaked)
}
