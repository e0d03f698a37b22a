//! Leading-verb classification of SQL statements

/// What a finished SQL string does, judged by its first keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT`
    Query,
    /// `INSERT`, `UPDATE` or `DELETE`
    Mutation,
    /// Anything else. Skipped in write lists, rejected by reads.
    Unrecognized,
}

const QUERY_VERBS: &[&str] = &["SELECT"];
const MUTATION_VERBS: &[&str] = &["INSERT", "UPDATE", "DELETE"];

impl StatementKind {
    /// Classify an already-substituted statement.
    ///
    /// The verb must be the first token of the trimmed text and must end at a
    /// non-word character, so `SELECTED` or `deleted_rows` do not count.
    pub fn classify(sql: &str) -> Self {
        let sql = sql.trim_start();
        if QUERY_VERBS.iter().any(|verb| starts_with_verb(sql, verb)) {
            StatementKind::Query
        } else if MUTATION_VERBS.iter().any(|verb| starts_with_verb(sql, verb)) {
            StatementKind::Mutation
        } else {
            StatementKind::Unrecognized
        }
    }

    pub fn is_query(self) -> bool {
        self == StatementKind::Query
    }

    pub fn is_mutation(self) -> bool {
        self == StatementKind::Mutation
    }
}

fn starts_with_verb(sql: &str, verb: &str) -> bool {
    let Some(head) = sql.get(..verb.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(verb) {
        return false;
    }
    sql[verb.len()..]
        .chars()
        .next()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}
