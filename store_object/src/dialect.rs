//! SQL dialects
//!
//! Statements are built with `?` placeholders. A [`Dialect`] knows how one
//! database family differs from that baseline: positional placeholder syntax,
//! how to get a generated key back, and the insert-ignore and upsert forms.

use config::Driver;
use std::fmt::Debug;

pub trait Dialect: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Placeholder for the 1-based argument `index`
    fn placeholder(&self, index: usize) -> String;

    /// `count` comma separated placeholders, empty for zero
    fn placeholders(&self, count: usize) -> String {
        (1..=count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Rewrite every `?` left to right into this dialect's placeholder form
    fn convert_placeholders(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Make an insert statement return the generated primary key
    fn insert_returning(&self, sql: &str, _primary_key: &str) -> String {
        sql.to_string()
    }

    fn supports_last_insert_id(&self) -> bool {
        true
    }

    fn insert_ignore(&self, table: &str, fields: &[String], placeholders: &str) -> String;

    /// Insert-or-update statement. The flag is true when the caller must bind
    /// the values of `update_fields` a second time after the insert values.
    fn upsert(
        &self,
        table: &str,
        fields: &[String],
        placeholders: &str,
        primary_key: &str,
        update_fields: &[String],
    ) -> (String, bool);

    /// Literal pagination clause. Reserved for dialects whose syntax
    /// diverges; built selects bind pagination as `limit ? offset ?`.
    fn limit_offset(&self, limit: u64, offset: u64) -> String {
        format!(" LIMIT {} OFFSET {}", limit, offset)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

static MYSQL: MySqlDialect = MySqlDialect;
static POSTGRES: PostgresDialect = PostgresDialect;
static SQLITE: SqliteDialect = SqliteDialect;

/// Dialect singleton for a driver family
pub fn dialect_for(driver: Driver) -> &'static dyn Dialect {
    match driver {
        Driver::MySql => &MYSQL,
        Driver::Postgres => &POSTGRES,
        Driver::Sqlite => &SQLITE,
    }
}

/// Dialect for a driver name; unknown names get MySQL
pub fn dialect_for_name(driver: &str) -> &'static dyn Dialect {
    dialect_for(Driver::from_name(driver))
}

fn insert_head(table: &str, fields: &[String], placeholders: &str) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        fields.join(", "),
        placeholders
    )
}

fn excluded_assignments(update_fields: &[String], excluded: &str) -> String {
    update_fields
        .iter()
        .map(|f| format!("{} = {}.{}", f, excluded, f))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn insert_ignore(&self, table: &str, fields: &[String], placeholders: &str) -> String {
        format!(
            "INSERT IGNORE INTO {} ({}) VALUES ({})",
            table,
            fields.join(", "),
            placeholders
        )
    }

    fn upsert(
        &self,
        table: &str,
        fields: &[String],
        placeholders: &str,
        _primary_key: &str,
        update_fields: &[String],
    ) -> (String, bool) {
        let assignments = update_fields
            .iter()
            .map(|f| format!("{} = ?", f))
            .collect::<Vec<_>>()
            .join(", ");
        (
            format!(
                "{} ON DUPLICATE KEY UPDATE {}",
                insert_head(table, fields, placeholders),
                assignments
            ),
            true,
        )
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn convert_placeholders(&self, sql: &str) -> String {
        let mut converted = String::with_capacity(sql.len() + 8);
        let mut index = 0;
        for ch in sql.chars() {
            if ch == '?' {
                index += 1;
                converted.push_str(&self.placeholder(index));
            } else {
                converted.push(ch);
            }
        }
        converted
    }

    fn insert_returning(&self, sql: &str, primary_key: &str) -> String {
        format!("{} RETURNING {}", sql, primary_key)
    }

    fn supports_last_insert_id(&self) -> bool {
        false
    }

    fn insert_ignore(&self, table: &str, fields: &[String], placeholders: &str) -> String {
        format!(
            "{} ON CONFLICT DO NOTHING",
            insert_head(table, fields, placeholders)
        )
    }

    fn upsert(
        &self,
        table: &str,
        fields: &[String],
        placeholders: &str,
        primary_key: &str,
        update_fields: &[String],
    ) -> (String, bool) {
        (
            format!(
                "{} ON CONFLICT ({}) DO UPDATE SET {}",
                insert_head(table, fields, placeholders),
                primary_key,
                excluded_assignments(update_fields, "EXCLUDED")
            ),
            false,
        )
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn insert_ignore(&self, table: &str, fields: &[String], placeholders: &str) -> String {
        format!(
            "{} ON CONFLICT DO NOTHING",
            insert_head(table, fields, placeholders)
        )
    }

    fn upsert(
        &self,
        table: &str,
        fields: &[String],
        placeholders: &str,
        primary_key: &str,
        update_fields: &[String],
    ) -> (String, bool) {
        (
            format!(
                "{} ON CONFLICT ({}) DO UPDATE SET {}",
                insert_head(table, fields, placeholders),
                primary_key,
                excluded_assignments(update_fields, "excluded")
            ),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::QueryBuilder;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dialect_selection() {
        let cases = [
            ("mysql", "mysql"),
            ("", "mysql"),
            ("mssql", "mysql"),
            ("postgres", "postgres"),
            ("postgresql", "postgres"),
            ("pgx", "postgres"),
            ("sqlite", "sqlite"),
            ("sqlite3", "sqlite"),
        ];
        for (driver, expected) in cases {
            assert_eq!(dialect_for_name(driver).name(), expected, "driver {:?}", driver);
        }
    }

    #[test]
    fn test_placeholders_all_dialects() {
        for dialect in [dialect_for(Driver::MySql), dialect_for(Driver::Sqlite)] {
            assert_eq!(dialect.placeholder(5), "?");
            assert_eq!(dialect.placeholders(0), "");
            assert_eq!(dialect.placeholders(1), "?");
            assert_eq!(dialect.placeholders(3), "?, ?, ?");
        }

        let pg = dialect_for(Driver::Postgres);
        assert_eq!(pg.placeholder(5), "$5");
        assert_eq!(pg.placeholders(0), "");
        assert_eq!(pg.placeholders(1), "$1");
        assert_eq!(pg.placeholders(3), "$1, $2, $3");
    }

    #[test]
    fn test_convert_placeholders() {
        let sql = "SELECT * FROM users WHERE id = ? AND name = ?";
        assert_eq!(MySqlDialect.convert_placeholders(sql), sql);
        assert_eq!(SqliteDialect.convert_placeholders(sql), sql);
        assert_eq!(
            PostgresDialect.convert_placeholders(sql),
            "SELECT * FROM users WHERE id = $1 AND name = $2"
        );
    }

    #[test]
    fn test_pagination_placeholders_follow_dialect() {
        let (sql, _) = QueryBuilder::new()
            .table("users")
            .where_eq("status", 1)
            .pagination(2, 10)
            .build_select();
        assert_eq!(
            PostgresDialect.convert_placeholders(&sql),
            "select * from users where status = $1 limit $2 offset $3"
        );
        assert_eq!(SqliteDialect.convert_placeholders(&sql), sql);
    }

    #[test]
    fn test_limit_offset() {
        for dialect in [
            dialect_for(Driver::MySql),
            dialect_for(Driver::Postgres),
            dialect_for(Driver::Sqlite),
        ] {
            assert_eq!(dialect.limit_offset(10, 20), " LIMIT 10 OFFSET 20");
        }
    }

    #[test]
    fn test_insert_returning_and_last_insert_id() {
        let sql = "INSERT INTO users (name) VALUES ($1)";
        assert_eq!(
            PostgresDialect.insert_returning(sql, "id"),
            "INSERT INTO users (name) VALUES ($1) RETURNING id"
        );
        assert_eq!(MySqlDialect.insert_returning(sql, "id"), sql);
        assert!(MySqlDialect.supports_last_insert_id());
        assert!(SqliteDialect.supports_last_insert_id());
        assert!(!PostgresDialect.supports_last_insert_id());
    }

    #[test]
    fn test_insert_ignore() {
        let cols = fields(&["id", "name"]);
        assert_eq!(
            MySqlDialect.insert_ignore("users", &cols, "?, ?"),
            "INSERT IGNORE INTO users (id, name) VALUES (?, ?)"
        );
        assert_eq!(
            PostgresDialect.insert_ignore("users", &cols, "$1, $2"),
            "INSERT INTO users (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        assert_eq!(
            SqliteDialect.insert_ignore("users", &cols, "?, ?"),
            "INSERT INTO users (id, name) VALUES (?, ?) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_upsert() {
        let cols = fields(&["id", "name", "email"]);
        let updates = fields(&["name", "email"]);

        let (sql, extra) = MySqlDialect.upsert("users", &cols, "?, ?, ?", "id", &updates);
        assert_eq!(
            sql,
            "INSERT INTO users (id, name, email) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE name = ?, email = ?"
        );
        assert!(extra);

        let (sql, extra) = PostgresDialect.upsert("users", &cols, "$1, $2, $3", "id", &updates);
        assert_eq!(
            sql,
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email"
        );
        assert!(!extra);

        let (sql, extra) = SqliteDialect.upsert("users", &cols, "?, ?, ?", "id", &updates);
        assert_eq!(
            sql,
            "INSERT INTO users (id, name, email) VALUES (?, ?, ?) ON CONFLICT (id) DO UPDATE SET name = excluded.name, email = excluded.email"
        );
        assert!(!extra);
    }
}
