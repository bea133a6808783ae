//! Upsert statements with an explicit conflict policy.
//!
//! Every table this importer touches is written the same way: a multi-row
//! `INSERT ... SELECT * FROM UNNEST(...)` keyed on the table's natural key.
//! The only thing that differs per table is what happens on a key collision,
//! which is captured by [`ConflictPolicy`].

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A target column and the Postgres element type used to cast its UNNEST array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type }
    }
}

/// What to do when an incoming row collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite `columns` with the incoming values and optionally set
    /// `touch` to `NOW()`. Columns not listed keep their stored value.
    Update {
        columns: &'static [&'static str],
        touch: Option<&'static str>,
    },
    /// Keep the existing row untouched.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStatement {
    pub table: &'static str,
    pub columns: &'static [Column],
    pub conflict_key: &'static [&'static str],
    pub policy: ConflictPolicy,
}

impl UpsertStatement {
    pub fn qualified_table(&self, schema: &str) -> String {
        format!("{}.{}", schema, self.table)
    }

    /// Render the statement for `schema`. Parameters are numbered in column
    /// order, one array per column.
    pub fn to_sql(&self, schema: &str) -> String {
        let names = self
            .columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        let arrays = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("${}::{}[]", i + 1, c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");

        let conflict = match self.policy {
            ConflictPolicy::Ignore => "DO NOTHING".to_string(),
            ConflictPolicy::Update { columns, touch } => {
                let mut assignments: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect();
                if let Some(column) = touch {
                    assignments.push(format!("{column} = NOW()"));
                }
                format!("DO UPDATE SET {}", assignments.join(", "))
            }
        };

        format!(
            "INSERT INTO {} ({}) SELECT * FROM UNNEST({}) ON CONFLICT ({}) {}",
            self.qualified_table(schema),
            names,
            arrays,
            self.conflict_key.join(", "),
            conflict
        )
    }
}

/// A row type that can be written in batches through an [`UpsertStatement`].
pub trait BatchRow: Sized {
    const UPSERT: UpsertStatement;

    /// Bind one array per column of [`Self::UPSERT`], in column order.
    fn bind_batch<'q>(query: PgQuery<'q>, rows: &[Self]) -> PgQuery<'q>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGETS: UpsertStatement = UpsertStatement {
        table: "widgets",
        columns: &[
            Column::new("id", "text"),
            Column::new("size", "int4"),
            Column::new("color", "text"),
        ],
        conflict_key: &["id"],
        policy: ConflictPolicy::Update {
            columns: &["size", "color"],
            touch: Some("updated_at"),
        },
    };

    #[test]
    fn update_policy_overwrites_listed_columns() {
        assert_eq!(
            WIDGETS.to_sql("inventory"),
            "INSERT INTO inventory.widgets (id, size, color) \
             SELECT * FROM UNNEST($1::text[], $2::int4[], $3::text[]) \
             ON CONFLICT (id) DO UPDATE SET size = EXCLUDED.size, color = EXCLUDED.color, updated_at = NOW()"
        );
    }

    #[test]
    fn ignore_policy_does_nothing() {
        let statement = UpsertStatement {
            conflict_key: &["id", "color"],
            policy: ConflictPolicy::Ignore,
            ..WIDGETS
        };
        let sql = statement.to_sql("public");
        assert!(sql.ends_with("ON CONFLICT (id, color) DO NOTHING"));
        assert!(!sql.contains("EXCLUDED"));
    }

    #[test]
    fn update_without_touch_column() {
        let statement = UpsertStatement {
            policy: ConflictPolicy::Update {
                columns: &["size"],
                touch: None,
            },
            ..WIDGETS
        };
        assert!(statement
            .to_sql("public")
            .ends_with("DO UPDATE SET size = EXCLUDED.size"));
    }
}
