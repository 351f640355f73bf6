/// Collapses a header cell into its lookup form: invisible characters are
/// stripped and only lowercase ASCII alphanumerics are kept, so `Claim ID`,
/// `claim_id` and `claimId` all become `claimid`.
pub(crate) fn normalize_header(value: &str) -> String {
    value
        .replace(['\u{feff}', '\u{200b}'], "")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Trims a data cell and maps empty values and common null placeholders to
/// `None`.
pub(crate) fn clean_cell(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if is_placeholder(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_placeholder(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "" | "-" | "NULL" | "NONE" | "N/A" | "NA" | "UNDEFINED"
    )
}

#[cfg(test)]
pub(crate) fn normalize_header_for_tests(value: &str) -> String {
    normalize_header(value)
}
