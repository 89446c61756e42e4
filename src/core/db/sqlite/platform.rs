/// SQLite Platform
///
/// Schema introspection through `sqlite_master` and the `pragma_*`
/// table-valued functions. Lookups run through the driver, so they are
/// observed and classified like any other statement.

use crate::core::db::driver::Driver;
use crate::core::db::platform::{ColumnInfo, ForeignKeyInfo, Platform, PlatformFeature, TableInfo};
use crate::core::db::row::{Row, Value};
use crate::core::Result;

pub struct SqlitePlatform<'d> {
    driver: &'d dyn Driver,
}

impl<'d> SqlitePlatform<'d> {
    pub fn new(driver: &'d dyn Driver) -> Self {
        SqlitePlatform { driver }
    }

    fn rows(&self, sql: &str) -> Result<Vec<Row>> {
        self.driver.query(sql)?.fetch_all()
    }
}

impl Platform for SqlitePlatform<'_> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn is_supported(&self, feature: PlatformFeature) -> bool {
        match feature {
            PlatformFeature::QueryExplain => true,
        }
    }

    fn tables(&self) -> Result<Vec<TableInfo>> {
        let rows = self.rows(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY name",
        )?;
        Ok(rows
            .iter()
            .map(|row| TableInfo {
                name: text(row, "name"),
                is_view: text(row, "type") == "view",
            })
            .collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info({}) ORDER BY cid",
            self.driver.convert_string_to_sql(table)
        );
        Ok(self
            .rows(&sql)?
            .iter()
            .map(|row| ColumnInfo {
                name: text(row, "name"),
                type_name: text(row, "type"),
                nullable: !flag(row, "notnull"),
                primary_key: flag(row, "pk"),
                default: optional_text(row, "dflt_value"),
            })
            .collect())
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let sql = format!(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list({}) ORDER BY id, seq",
            self.driver.convert_string_to_sql(table)
        );
        Ok(self
            .rows(&sql)?
            .iter()
            .map(|row| ForeignKeyInfo {
                column: text(row, "from"),
                referenced_table: text(row, "table"),
                // NULL when the reference targets the primary key implicitly
                referenced_column: text(row, "to"),
            })
            .collect())
    }

    fn primary_sequence_name(&self, _table: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

fn optional_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn text(row: &Row, column: &str) -> String {
    optional_text(row, column).unwrap_or_default()
}

fn flag(row: &Row, column: &str) -> bool {
    match row.get(column) {
        Some(Value::Int(i)) => *i != 0,
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}
