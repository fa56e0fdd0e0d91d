//! Parameterized statement assembly.
//!
//! SQL text can only be appended from `&'static str` fragments; every
//! caller-supplied value goes through a bound parameter.

use rusqlite::types::Value;

#[derive(Debug, Clone, Default)]
pub struct SqlQuery {
    sql: String,
    params: Vec<Value>,
    has_where: bool,
}

impl SqlQuery {
    pub fn new(head: &'static str) -> Self {
        Self {
            sql: head.to_string(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, fragment: &'static str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Adds `clause` to the WHERE list. `clause` holds one `?` per value.
    pub fn and_where<I>(&mut self, clause: &'static str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.sql.push_str(if self.has_where { " AND " } else { " WHERE " });
        self.has_where = true;
        self.sql.push_str(clause);
        self.params.extend(values.into_iter().map(Into::into));
        self
    }

    /// Adds `column IN (?, ?, ...)` with one placeholder per id.
    pub fn and_where_in(&mut self, column: &'static str, ids: &[i64]) -> &mut Self {
        self.sql.push_str(if self.has_where { " AND " } else { " WHERE " });
        self.has_where = true;
        self.sql.push_str(column);
        self.sql.push_str(" IN (");
        for index in 0..ids.len() {
            if index > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push('?');
        }
        self.sql.push(')');
        self.params.extend(ids.iter().map(|id| Value::Integer(*id)));
        self
    }

    pub fn limit(&mut self, limit: Option<u32>) -> &mut Self {
        if let Some(limit) = limit {
            self.sql.push_str(" LIMIT ?");
            self.params.push(Value::Integer(i64::from(limit)));
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// `LIKE` pattern matching `needle` literally anywhere; pair with `ESCAPE '\'`.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_where_and_limit() {
        let mut query = SqlQuery::new("SELECT id FROM events");
        query
            .and_where("ts >= ?", ["2025-01-01T00:00:00Z".to_string()])
            .and_where("ts <= ?", ["2025-02-01T00:00:00Z".to_string()])
            .push(" ORDER BY id DESC")
            .limit(Some(5));
        assert_eq!(
            query.sql(),
            "SELECT id FROM events WHERE ts >= ? AND ts <= ? ORDER BY id DESC LIMIT ?"
        );
        assert_eq!(query.params().len(), 3);
    }

    #[test]
    fn builds_in_list() {
        let mut query = SqlQuery::new("DELETE FROM events");
        query.and_where_in("id", &[3, 1, 2]);
        assert_eq!(query.sql(), "DELETE FROM events WHERE id IN (?, ?, ?)");
        assert_eq!(
            query.params(),
            &[Value::Integer(3), Value::Integer(1), Value::Integer(2)]
        );
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(contains_pattern("api"), "%api%");
    }
}
