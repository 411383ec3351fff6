use std::borrow::Cow;

/// Cells starting with one of these are evaluated as formulas by spreadsheets.
fn needs_formula_guard(value: &str) -> bool {
    matches!(value.chars().next(), Some('=' | '+' | '-' | '@'))
}

/// Prefixes free-text cells that a spreadsheet would run as a formula.
pub fn guard_formula(value: &str) -> Cow<'_, str> {
    if needs_formula_guard(value) {
        Cow::Owned(format!("'{}", value))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_formula_prefixes_only() {
        assert_eq!(guard_formula("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(guard_formula("@cmd"), "'@cmd");
        assert_eq!(guard_formula("-2+3"), "'-2+3");
        assert_eq!(guard_formula("plain"), "plain");
        assert_eq!(guard_formula(""), "");
    }

    #[test]
    fn number_cell_leaves_missing_values_empty() {
        assert_eq!(number_cell(Some(1.5)), "1.5");
        assert_eq!(number_cell(None), "");
    }
}
