//! Migration planner: ledger + stored revisions -> executable SQL.
//!
//! Planning is pure; the stores execute the returned statements and record
//! the new revision in the same transaction.

use super::{ColumnDef, ColumnType, DefaultValue, MigrationStep};
use crate::error::{AssetDbError, AssetDbResult};
use std::collections::HashMap;

/// SQL dialect to render for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

/// The statements bringing one table from its stored revision to the
/// ledger's target revision.
///
/// `statements` may be empty while the revisions still differ: a block can
/// render to nothing on a dialect (SQLite column changes), but the stored
/// revision must still advance.
#[derive(Debug)]
pub struct TablePlan {
    pub table: &'static str,
    pub from_revision: u32,
    pub target_revision: u32,
    pub statements: Vec<String>,
}

struct TableSteps {
    name: &'static str,
    /// Revision blocks in declaration order: `(revision, steps)`.
    blocks: Vec<(u32, Vec<MigrationStep>)>,
}

/// Group the ledger into per-table revision blocks.
fn group(ledger: &[MigrationStep]) -> AssetDbResult<Vec<TableSteps>> {
    let mut tables: Vec<TableSteps> = Vec::new();

    for step in ledger {
        match *step {
            MigrationStep::CreateTable { name } => {
                tables.push(TableSteps {
                    name,
                    blocks: vec![(1, Vec::new())],
                });
            }
            MigrationStep::TableRevision(revision) => {
                let table = tables.last_mut().ok_or_else(|| {
                    AssetDbError::Migration("revision marker before any table".to_string())
                })?;
                let current = table.blocks.last().expect("table has an initial block").0;
                if revision <= current {
                    return Err(AssetDbError::Migration(format!(
                        "table {}: revision marker {} does not advance past {}",
                        table.name, revision, current
                    )));
                }
                table.blocks.push((revision, Vec::new()));
            }
            other => {
                let table = tables.last_mut().ok_or_else(|| {
                    AssetDbError::Migration("migration step before any table".to_string())
                })?;
                table
                    .blocks
                    .last_mut()
                    .expect("table has an initial block")
                    .1
                    .push(other);
            }
        }
    }

    Ok(tables)
}

/// Compute the statements bringing each table up to the ledger's target
/// revision, skipping every block at or below its stored revision.
pub fn plan(
    ledger: &[MigrationStep],
    stored: &HashMap<String, u32>,
    dialect: Dialect,
) -> AssetDbResult<Vec<TablePlan>> {
    let mut plans = Vec::new();

    for table in group(ledger)? {
        let stored_revision = stored.get(table.name).copied().unwrap_or(0);
        let target_revision = table
            .blocks
            .last()
            .map(|(revision, _)| *revision)
            .expect("table has an initial block");
        if stored_revision >= target_revision {
            continue;
        }

        let mut statements = Vec::new();
        for (revision, steps) in &table.blocks {
            if *revision <= stored_revision {
                continue;
            }
            if *revision == 1 {
                render_create_block(table.name, steps, dialect, &mut statements)?;
            } else {
                render_alter_block(table.name, steps, dialect, &mut statements)?;
            }
        }

        plans.push(TablePlan {
            table: table.name,
            from_revision: stored_revision,
            target_revision,
            statements,
        });
    }

    Ok(plans)
}

/// Render the initial block as one CREATE TABLE plus index statements.
fn render_create_block(
    table: &str,
    steps: &[MigrationStep],
    dialect: Dialect,
    out: &mut Vec<String>,
) -> AssetDbResult<()> {
    let mut columns = Vec::new();
    let mut primary_key: Option<&[&str]> = None;
    let mut indexes = Vec::new();

    for step in steps {
        match step {
            MigrationStep::AddColumn(def) => columns.push(column_sql(def, dialect)),
            MigrationStep::PrimaryKey { columns } => primary_key = Some(*columns),
            MigrationStep::NamedKey {
                name,
                columns,
                unique,
            } => indexes.push(index_sql(table, name, columns, *unique)),
            other => {
                return Err(AssetDbError::Migration(format!(
                    "table {table}: unsupported step in create block: {other:?}"
                )));
            }
        }
    }

    if let Some(key_columns) = primary_key {
        columns.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));
    }
    out.push(format!("CREATE TABLE {} ({})", table, columns.join(", ")));
    out.extend(indexes);
    Ok(())
}

/// Render an upgrade block as ALTER/INDEX statements.
fn render_alter_block(
    table: &str,
    steps: &[MigrationStep],
    dialect: Dialect,
    out: &mut Vec<String>,
) -> AssetDbResult<()> {
    for step in steps {
        match step {
            MigrationStep::AddColumn(def) => {
                out.push(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    table,
                    column_sql(def, dialect)
                ));
            }
            MigrationStep::ChangeColumn(def) => match dialect {
                // SQLite has no ALTER COLUMN, and its dynamic typing makes
                // type/nullability tightening a no-op in practice; the
                // revision still advances so the block is not retried.
                Dialect::Sqlite => {}
                Dialect::Postgres => render_postgres_change_column(table, def, out),
            },
            MigrationStep::NamedKey {
                name,
                columns,
                unique,
            } => out.push(index_sql(table, name, columns, *unique)),
            MigrationStep::PrimaryKey { columns } => match dialect {
                Dialect::Sqlite => {
                    return Err(AssetDbError::Migration(format!(
                        "table {table}: SQLite cannot add a primary key after creation"
                    )));
                }
                Dialect::Postgres => out.push(format!(
                    "ALTER TABLE {} ADD PRIMARY KEY ({})",
                    table,
                    columns.join(", ")
                )),
            },
            other => {
                return Err(AssetDbError::Migration(format!(
                    "table {table}: unsupported step in upgrade block: {other:?}"
                )));
            }
        }
    }
    Ok(())
}

fn render_postgres_change_column(table: &str, def: &ColumnDef, out: &mut Vec<String>) {
    out.push(format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
        table,
        def.name,
        type_sql(def.ty, Dialect::Postgres)
    ));
    out.push(format!(
        "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
        table,
        def.name,
        if def.nullable { "DROP" } else { "SET" }
    ));
    if let Some(default) = def.default {
        out.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            table,
            def.name,
            default_sql(default, Dialect::Postgres)
        ));
    }
}

fn column_sql(def: &ColumnDef, dialect: Dialect) -> String {
    let mut sql = format!("{} {}", def.name, type_sql(def.ty, dialect));
    if !def.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = def.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_sql(default, dialect));
    }
    sql
}

fn index_sql(table: &str, name: &str, columns: &[&str], unique: bool) -> String {
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        name,
        table,
        columns.join(", ")
    )
}

fn type_sql(ty: ColumnType, dialect: Dialect) -> String {
    match dialect {
        Dialect::Sqlite => match ty {
            ColumnType::Uuid | ColumnType::Binary { .. } | ColumnType::LargeBinary => {
                "BLOB".to_string()
            }
            ColumnType::Text { .. } | ColumnType::Timestamp => "TEXT".to_string(),
            ColumnType::Int32 | ColumnType::Int64 | ColumnType::Bool => "INTEGER".to_string(),
        },
        Dialect::Postgres => match ty {
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Text { len } => format!("VARCHAR({len})"),
            ColumnType::Binary { .. } | ColumnType::LargeBinary => "BYTEA".to_string(),
            ColumnType::Int32 => "INTEGER".to_string(),
            ColumnType::Int64 => "BIGINT".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Timestamp => "TIMESTAMPTZ".to_string(),
        },
    }
}

fn default_sql(default: DefaultValue, dialect: Dialect) -> String {
    match default {
        DefaultValue::Text(text) => format!("'{text}'"),
        DefaultValue::Int(value) => value.to_string(),
        DefaultValue::Bool(value) => match dialect {
            Dialect::Sqlite => (if value { "1" } else { "0" }).to_string(),
            Dialect::Postgres => (if value { "TRUE" } else { "FALSE" }).to_string(),
        },
    }
}
