//! DDL statements for tenant tables, columns and indexes.
//! Callers validate names and data types first; this module only quotes and assembles.

use super::{qualified_table, quote_literal, quoted};
use crate::repositories::{ColumnDefinition, IndexDefinition};

fn column_def(c: &ColumnDefinition) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.data_type);
    if !c.nullable && !c.primary {
        def.push_str(" NOT NULL");
    }
    if c.unique && !c.primary {
        def.push_str(" UNIQUE");
    }
    if let Some(ref d) = c.default {
        def.push_str(" DEFAULT ");
        def.push_str(&quote_literal(d));
    }
    def
}

/// CREATE TABLE with a PRIMARY KEY constraint over every column flagged `primary`.
pub fn create_table(schema: &str, table: &str, columns: &[ColumnDefinition]) -> String {
    let mut defs: Vec<String> = columns.iter().map(column_def).collect();
    let pk: Vec<String> = columns.iter().filter(|c| c.primary).map(|c| quoted(&c.name)).collect();
    if !pk.is_empty() {
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }
    format!(
        "CREATE TABLE {} (\n  {}\n)",
        qualified_table(schema, table),
        defs.join(",\n  ")
    )
}

pub fn rename_table(schema: &str, table: &str, new_name: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {}", qualified_table(schema, table), quoted(new_name))
}

pub fn drop_table(schema: &str, table: &str) -> String {
    format!("DROP TABLE {}", qualified_table(schema, table))
}

pub fn add_column(schema: &str, table: &str, column: &ColumnDefinition) -> String {
    let mut sql = format!("ALTER TABLE {} ADD COLUMN {}", qualified_table(schema, table), column_def(column));
    if column.primary {
        sql.push_str(" PRIMARY KEY");
    }
    sql
}

pub fn rename_column(schema: &str, table: &str, column: &str, new_name: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        qualified_table(schema, table),
        quoted(column),
        quoted(new_name)
    )
}

pub fn drop_column(schema: &str, table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", qualified_table(schema, table), quoted(column))
}

pub fn create_index(schema: &str, table: &str, index: &IndexDefinition) -> String {
    let cols: Vec<String> = index.columns.iter().map(|c| quoted(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quoted(&index.name),
        qualified_table(schema, table),
        cols.join(", ")
    )
}

pub fn drop_index(schema: &str, index: &str) -> String {
    format!("DROP INDEX {}", qualified_table(schema, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str) -> ColumnDefinition {
        ColumnDefinition {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary: false,
            unique: false,
            default: None,
        }
    }

    #[test]
    fn create_table_collects_primary_key_columns() {
        let id = ColumnDefinition { primary: true, nullable: false, ..col("id", "uuid") };
        let name = ColumnDefinition { nullable: false, unique: true, ..col("name", "text") };
        let status = ColumnDefinition { default: Some("new".into()), ..col("status", "text") };

        let sql = create_table("public", "items", &[id, name, status]);

        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"items\" (\n  \"id\" uuid,\n  \"name\" text NOT NULL UNIQUE,\n  \"status\" text DEFAULT 'new',\n  PRIMARY KEY (\"id\")\n)"
        );
    }

    #[test]
    fn column_statements_quote_every_identifier() {
        assert_eq!(
            add_column("public", "items", &col("note", "text")),
            r#"ALTER TABLE "public"."items" ADD COLUMN "note" text"#
        );
        assert_eq!(
            rename_column("public", "items", "note", "memo"),
            r#"ALTER TABLE "public"."items" RENAME COLUMN "note" TO "memo""#
        );
        assert_eq!(drop_column("s", "t", "c"), r#"ALTER TABLE "s"."t" DROP COLUMN "c""#);
    }

    #[test]
    fn defaults_are_literals() {
        let c = ColumnDefinition { default: Some("'); drop table x; --".into()), ..col("c", "text") };

        assert_eq!(
            add_column("public", "t", &c),
            r#"ALTER TABLE "public"."t" ADD COLUMN "c" text DEFAULT '''); drop table x; --'"#
        );
    }

    #[test]
    fn index_statements() {
        let idx = IndexDefinition {
            name: "items_name_idx".into(),
            columns: vec!["name".into(), "status".into()],
            unique: true,
        };

        assert_eq!(
            create_index("public", "items", &idx),
            r#"CREATE UNIQUE INDEX "items_name_idx" ON "public"."items" ("name", "status")"#
        );
        assert_eq!(drop_index("public", "items_name_idx"), r#"DROP INDEX "public"."items_name_idx""#);
        assert_eq!(rename_table("public", "a", "b"), r#"ALTER TABLE "public"."a" RENAME TO "b""#);
        assert_eq!(drop_table("public", "a"), r#"DROP TABLE "public"."a""#);
    }
}
