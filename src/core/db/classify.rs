/// Error Classification Module
///
/// Drivers classify native failures with an ordered table of message rules.
/// The first matching rule wins, so a message mentioning several constraint
/// kinds resolves by table order.

use crate::core::DbalError;

/// The portable kinds a native failure can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ForeignKeyViolation,
    UniqueViolation,
    NotNullViolation,
    Connection,
}

/// One entry of a classification table.
#[derive(Debug, Clone, Copy)]
pub struct MessageRule {
    pub kind: FailureKind,
    /// Any of these substrings selects the rule
    pub needles: &'static [&'static str],
    pub case_insensitive: bool,
}

impl MessageRule {
    pub fn matches(&self, message: &str) -> bool {
        if self.case_insensitive {
            let lowered = message.to_lowercase();
            self.needles.iter().any(|n| lowered.contains(&n.to_lowercase()))
        } else {
            self.needles.iter().any(|n| message.contains(n))
        }
    }
}

/// Returns the kind of the first rule matching `message`.
pub fn match_rules(rules: &[MessageRule], message: &str) -> Option<FailureKind> {
    rules.iter().find(|rule| rule.matches(message)).map(|rule| rule.kind)
}

/// Builds the taxonomy member for a classified (or unclassified) failure.
///
/// Without a kind, a known statement makes it a `Query` error, otherwise a
/// root `Driver` error.
pub fn build_error(kind: Option<FailureKind>, message: &str, code: i32, sql: Option<&str>) -> DbalError {
    let message = message.to_string();
    let statement = || sql.unwrap_or_default().to_string();
    match kind {
        Some(FailureKind::ForeignKeyViolation) => DbalError::ForeignKeyConstraintViolation {
            message,
            code,
            sql: statement(),
        },
        Some(FailureKind::UniqueViolation) => DbalError::UniqueConstraintViolation {
            message,
            code,
            sql: statement(),
        },
        Some(FailureKind::NotNullViolation) => DbalError::NotNullConstraintViolation {
            message,
            code,
            sql: statement(),
        },
        Some(FailureKind::Connection) => DbalError::Connection { message, code },
        None => match sql {
            Some(sql) => DbalError::Query {
                message,
                code,
                sql: sql.to_string(),
            },
            None => DbalError::Driver { message, code },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &[MessageRule] = &[
        MessageRule {
            kind: FailureKind::UniqueViolation,
            needles: &["duplicate"],
            case_insensitive: true,
        },
        MessageRule {
            kind: FailureKind::NotNullViolation,
            needles: &["NULL"],
            case_insensitive: false,
        },
    ];

    #[test]
    fn test_first_match_wins() {
        assert_eq!(match_rules(RULES, "Duplicate entry, column is NULL"), Some(FailureKind::UniqueViolation));
        assert_eq!(match_rules(RULES, "column is NULL"), Some(FailureKind::NotNullViolation));
        assert_eq!(match_rules(RULES, "column is null"), None);
    }

    #[test]
    fn test_build_error_fallbacks() {
        assert!(matches!(build_error(None, "boom", 1, Some("SELECT 1")), DbalError::Query { .. }));
        assert!(matches!(build_error(None, "boom", 1, None), DbalError::Driver { .. }));
        let err = build_error(Some(FailureKind::Connection), "cannot open", 14, Some("SELECT 1"));
        assert!(matches!(err, DbalError::Connection { code: 14, .. }));
    }
}
