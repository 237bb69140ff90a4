//! Builds parameterized row queries from a [`RowDescriptor`] computed at call time.

use super::params::{cast_placeholder, to_text_param};
use super::{qualified_table, quoted};
use crate::error::AppError;
use crate::repositories::RowDescriptor;
use serde_json::{Map, Value};

/// Upper bound on rows returned by one listing.
pub const MAX_ROW_LIMIT: u32 = 1000;

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Option<String>) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// WHERE clause for exact-match filters. Filters on columns the table does not have are skipped.
fn where_clause(q: &mut QueryBuf, desc: &RowDescriptor, filters: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (col, val) in filters {
        let Some(column) = desc.column(col) else { continue };
        match to_text_param(val) {
            None => parts.push(format!("{} IS NULL", quoted(col))),
            Some(text) => {
                let n = q.push_param(Some(text));
                parts.push(format!("{} = {}", quoted(col), cast_placeholder(n, &column.data_type)));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn order_list(desc: &RowDescriptor, alias: Option<&str>) -> String {
    desc.primary_key
        .iter()
        .map(|c| match alias {
            Some(a) => format!("{}.{}", a, quoted(c)),
            None => quoted(c),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT rows as JSON objects, one `row` column per result.
///
/// Rows come back in primary-key order. Tables without a primary key are paged in physical
/// (`ctid`) order.
pub fn select_rows(desc: &RowDescriptor, filters: &[(String, Value)], limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&desc.schema, &desc.table);
    let cols = desc
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let where_sql = where_clause(&mut q, desc, filters);
    let (inner_order, outer_order) = if desc.primary_key.is_empty() {
        ("ctid".to_string(), String::new())
    } else {
        (order_list(desc, None), format!(" ORDER BY {}", order_list(desc, Some("sub"))))
    };
    q.sql = format!(
        "SELECT row_to_json(sub.*) AS row FROM (SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}) sub{}",
        cols,
        table,
        where_sql,
        inner_order,
        limit.min(MAX_ROW_LIMIT),
        offset,
        outer_order,
    );
    q
}

/// SELECT COUNT(*) with the same filters as [`select_rows`].
pub fn count_rows(desc: &RowDescriptor, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&desc.schema, &desc.table);
    let where_sql = where_clause(&mut q, desc, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_sql);
    q
}

/// INSERT one row. Columns missing from `row` are left to their database default.
/// Unknown keys are rejected so typos never silently drop data.
pub fn insert_row(desc: &RowDescriptor, row: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let table = qualified_table(&desc.schema, &desc.table);
    if let Some(unknown) = row.keys().find(|k| desc.column(k).is_none()) {
        return Err(AppError::Validation(format!(
            "unknown column '{}' for table {}",
            unknown, desc.table
        )));
    }
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for column in &desc.columns {
        let Some(val) = row.get(&column.name) else { continue };
        let n = q.push_param(to_text_param(val));
        cols.push(quoted(&column.name));
        placeholders.push(cast_placeholder(n, &column.data_type));
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} AS ins DEFAULT VALUES RETURNING row_to_json(ins.*) AS row", table)
    } else {
        format!(
            "INSERT INTO {} AS ins ({}) VALUES ({}) RETURNING row_to_json(ins.*) AS row",
            table,
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::ColumnDescriptor;
    use serde_json::json;

    fn users() -> RowDescriptor {
        RowDescriptor {
            schema: "public".into(),
            table: "users".into(),
            columns: vec![
                ColumnDescriptor { name: "id".into(), data_type: "integer".into() },
                ColumnDescriptor { name: "email".into(), data_type: "character varying(255)".into() },
                ColumnDescriptor { name: "deleted_at".into(), data_type: "timestamp with time zone".into() },
            ],
            primary_key: vec!["id".into()],
        }
    }

    #[test]
    fn select_rows_projects_descriptor_columns_and_casts_filters() {
        let filters = vec![
            ("email".to_string(), json!("a@b.c")),
            ("deleted_at".to_string(), Value::Null),
            ("not_a_column".to_string(), json!(1)),
        ];
        let q = select_rows(&users(), &filters, 20, 40);

        assert_eq!(
            q.sql,
            r#"SELECT row_to_json(sub.*) AS row FROM (SELECT "id", "email", "deleted_at" FROM "public"."users" WHERE "email" = $1::text::character varying(255) AND "deleted_at" IS NULL ORDER BY "id" LIMIT 20 OFFSET 40) sub ORDER BY sub."id""#
        );
        assert_eq!(q.params, vec![Some("a@b.c".to_string())]);
    }

    #[test]
    fn select_rows_caps_limit() {
        let q = select_rows(&users(), &[], 50_000, 0);

        assert!(q.sql.contains(" LIMIT 1000 "));
    }

    #[test]
    fn tables_without_primary_key_page_in_physical_order() {
        let mut desc = users();
        desc.primary_key.clear();
        desc.columns[0] = ColumnDescriptor { name: "payload".into(), data_type: "json".into() };

        let q = select_rows(&desc, &[], 10, 0);

        assert_eq!(
            q.sql,
            r#"SELECT row_to_json(sub.*) AS row FROM (SELECT "payload", "email", "deleted_at" FROM "public"."users" ORDER BY ctid LIMIT 10 OFFSET 0) sub"#
        );
    }

    #[test]
    fn count_rows_applies_the_same_filters() {
        let q = count_rows(&users(), &[("id".into(), json!(7))]);

        assert_eq!(q.sql, r#"SELECT COUNT(*) FROM "public"."users" WHERE "id" = $1::text::integer"#);
    }

    #[test]
    fn insert_row_binds_only_supplied_columns_in_table_order() {
        let row = json!({"email": "x@y.z", "id": 3});
        let q = insert_row(&users(), row.as_object().unwrap()).unwrap();

        assert_eq!(
            q.sql,
            r#"INSERT INTO "public"."users" AS ins ("id", "email") VALUES ($1::text::integer, $2::text::character varying(255)) RETURNING row_to_json(ins.*) AS row"#
        );
        assert_eq!(q.params, vec![Some("3".to_string()), Some("x@y.z".to_string())]);
    }

    #[test]
    fn insert_row_rejects_unknown_columns() {
        let row = json!({"emial": "typo"});

        assert!(matches!(insert_row(&users(), row.as_object().unwrap()), Err(AppError::Validation(_))));
    }
}
