use std::borrow::Cow;

/// Doubles every single quote so the value can sit inside a SQL string literal.
///
/// Not idempotent: escaping an already escaped value doubles its quotes again,
/// so call it exactly once per raw value.
pub fn escape(value: &str) -> Cow<'_, str> {
    if value.contains('\'') {
        Cow::Owned(value.replace('\'', "''"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders `value` as a quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    let escaped = escape(value);
    let mut literal = String::with_capacity(escaped.len() + 2);
    literal.push('\'');
    literal.push_str(&escaped);
    literal.push('\'');
    literal
}
