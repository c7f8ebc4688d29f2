use chrono::NaiveDateTime;

pub mod article;
pub mod tag;

/// Translate a 1-based page number into `(limit, offset)`.
/// Non-positive page or page size means "no pagination".
pub fn page_window(page: i64, page_size: i64) -> Option<(i64, i64)> {
    if page <= 0 || page_size <= 0 {
        return None;
    }
    Some((page_size, (page - 1) * page_size))
}

pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// WHERE-clause fragments plus their positional parameters.
#[derive(Default)]
pub(crate) struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl Conditions {
    pub fn push<T: rusqlite::types::ToSql + 'static>(&mut self, column: &str, value: T) {
        self.params.push(Box::new(value));
        self.clauses.push(format!("{} = ?{}", column, self.params.len()));
    }

    pub fn raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Append LIMIT/OFFSET placeholders to `sql` when a window is given.
    pub fn paginate(&mut self, sql: &mut String, window: Option<(i64, i64)>) {
        if let Some((limit, offset)) = window {
            self.params.push(Box::new(limit));
            let l = self.params.len();
            self.params.push(Box::new(offset));
            sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", l, l + 1));
        }
    }

    pub fn params(&self) -> Vec<&dyn rusqlite::types::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// SET-clause builder for partial updates; only supplied columns are written.
#[derive(Default)]
pub(crate) struct Changes {
    sets: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl Changes {
    pub fn set<T: rusqlite::types::ToSql + 'static>(&mut self, column: &str, value: T) {
        self.params.push(Box::new(value));
        self.sets.push(format!("{} = ?{}", column, self.params.len()));
    }

    pub fn set_opt<T: rusqlite::types::ToSql + Clone + 'static>(&mut self, column: &str, value: &Option<T>) {
        if let Some(v) = value {
            self.set(column, v.clone());
        }
    }

    /// `UPDATE <table> SET ... WHERE id = ? AND deleted_at IS NULL`
    pub fn into_update(mut self, table: &str, id: i64) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        self.params.push(Box::new(id));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND deleted_at IS NULL",
            table,
            self.sets.join(", "),
            self.params.len()
        );
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_is_one_based() {
        assert_eq!(page_window(1, 10), Some((10, 0)));
        assert_eq!(page_window(3, 10), Some((10, 20)));
        assert_eq!(page_window(0, 10), None);
        assert_eq!(page_window(2, 0), None);
        assert_eq!(page_window(-1, 10), None);
    }

    #[test]
    fn conditions_number_params_in_order() {
        let mut c = Conditions::default();
        c.raw("deleted_at IS NULL");
        c.push("name", "go".to_string());
        c.push("state", 1i64);
        let mut sql = format!("SELECT * FROM tags{}", c.sql());
        c.paginate(&mut sql, Some((10, 0)));
        assert_eq!(
            sql,
            "SELECT * FROM tags WHERE deleted_at IS NULL AND name = ?1 AND state = ?2 LIMIT ?3 OFFSET ?4"
        );
        assert_eq!(c.params().len(), 4);
    }

    #[test]
    fn changes_build_update() {
        let mut ch = Changes::default();
        ch.set("modified_by", "eddy".to_string());
        ch.set_opt::<String>("name", &None);
        ch.set_opt("state", &Some(0i64));
        let (sql, params) = ch.into_update("tags", 7);
        assert_eq!(
            sql,
            "UPDATE tags SET modified_by = ?1, state = ?2 WHERE id = ?3 AND deleted_at IS NULL"
        );
        assert_eq!(params.len(), 3);
    }
}
