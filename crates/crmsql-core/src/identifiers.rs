//! Identifier and literal quoting.
//!
//! Generated statements use unquoted physical names (`CRM_KP`, `F4`,
//! `LINK_FI_0`) because every name is produced by the naming rules in the
//! schema crate. These helpers cover the two places where foreign text reaches
//! SQL directly: introspection (`PRAGMA table_info`) and literal link-field
//! values inlined into join predicates.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// ```
/// use crmsql_core::quote_ident;
///
/// assert_eq!(quote_ident("CRM_KP"), "\"CRM_KP\"");
/// assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render text as a single-quoted SQL string literal.
///
/// ```
/// use crmsql_core::sql_literal;
///
/// assert_eq!(sql_literal("KP"), "'KP'");
/// assert_eq!(sql_literal("O'Brien"), "'O''Brien'");
/// ```
#[inline]
pub fn sql_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_empty() {
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_quote_ident_keyword() {
        assert_eq!(quote_ident("select"), "\"select\"");
    }

    #[test]
    fn test_sql_literal_escapes_quotes() {
        assert_eq!(sql_literal("a'b'c"), "'a''b''c'");
        assert_eq!(sql_literal(""), "''");
    }

    #[test]
    fn test_sql_literal_injection_stays_inside() {
        let lit = sql_literal("x'; DROP TABLE CRM_KP; --");
        assert_eq!(lit, "'x''; DROP TABLE CRM_KP; --'");
    }
}
