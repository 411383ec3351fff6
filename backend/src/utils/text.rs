use std::borrow::Cow;

use serde_json::Value;

/// Removes control characters that break JSON/CSV consumers of stored text.
///
/// Tabs and line breaks are kept; other C0/C1 controls and the replacement
/// character left behind by lossy decoding are dropped.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r') || !(c.is_control() || *c == '\u{FFFD}'))
        .collect()
}

/// Drops NUL characters, which PostgreSQL refuses in TEXT and JSONB values.
pub fn strip_nul(raw: &str) -> Cow<'_, str> {
    if raw.contains('\0') {
        Cow::Owned(raw.replace('\0', ""))
    } else {
        Cow::Borrowed(raw)
    }
}

/// [`strip_nul`] applied to every string and object key inside `value`.
pub fn strip_nul_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_nul(&s).into_owned()),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nul_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (strip_nul(&key).into_owned(), strip_nul_value(v)))
                .collect(),
        ),
        other => other,
    }
}
