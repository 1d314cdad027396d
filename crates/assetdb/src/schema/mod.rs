//! Declarative schema migration ledger.
//!
//! The on-disk schema is described as an ordered list of structural steps
//! rather than imperative per-version upgrade code. A [`TableRevision`]
//! marker opens the block of steps that upgrades a table to that revision;
//! the steps between a table's creation and its first marker are revision 1.
//! The planner in [`plan`] skips every block at or below the revision
//! recorded for the table, which makes the ledger replayable in full
//! against an empty schema and a no-op against a current one, while new
//! blocks can keep accumulating over the software's lifetime.
//!
//! [`TableRevision`]: MigrationStep::TableRevision

pub mod plan;

pub use plan::{plan, Dialect, TablePlan};

/// SQL column type, rendered per dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    /// Bounded text; the bound is advisory on SQLite.
    Text { len: u32 },
    /// Fixed-width binary.
    Binary { len: u32 },
    /// Unbounded binary payload.
    LargeBinary,
    Int32,
    Int64,
    Bool,
    Timestamp,
}

/// Column default value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Int(i64),
    Bool(bool),
}

/// A column declaration, used by both add and change steps.
#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

/// One structural step of the migration ledger.
#[derive(Clone, Copy, Debug)]
pub enum MigrationStep {
    /// Open a new table context. Steps that follow apply to this table.
    CreateTable { name: &'static str },
    AddColumn(ColumnDef),
    /// Change an existing column's type, nullability, or default.
    ChangeColumn(ColumnDef),
    PrimaryKey { columns: &'static [&'static str] },
    /// Secondary index; lookup acceleration only.
    NamedKey {
        name: &'static str,
        columns: &'static [&'static str],
        unique: bool,
    },
    /// Steps after this marker upgrade the table to the given revision.
    TableRevision(u32),
}

/// The asset store ledger: content table and reference table.
pub const ASSET_LEDGER: &[MigrationStep] = &[
    MigrationStep::CreateTable {
        name: "asset_content",
    },
    MigrationStep::AddColumn(ColumnDef {
        name: "hash",
        ty: ColumnType::Binary { len: 20 },
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "asset_type",
        ty: ColumnType::Int32,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "data",
        ty: ColumnType::LargeBinary,
        nullable: true,
        default: None,
    }),
    MigrationStep::PrimaryKey {
        columns: &["hash", "asset_type"],
    },
    MigrationStep::CreateTable { name: "asset_refs" },
    MigrationStep::AddColumn(ColumnDef {
        name: "id",
        ty: ColumnType::Uuid,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "name",
        ty: ColumnType::Text { len: 64 },
        nullable: false,
        default: Some(DefaultValue::Text("")),
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "asset_type",
        ty: ColumnType::Int32,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "temporary",
        ty: ColumnType::Bool,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "create_time",
        ty: ColumnType::Timestamp,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "access_time",
        ty: ColumnType::Timestamp,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "flags",
        ty: ColumnType::Int64,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "creator_id",
        ty: ColumnType::Uuid,
        nullable: false,
        default: None,
    }),
    MigrationStep::AddColumn(ColumnDef {
        name: "hash",
        ty: ColumnType::Binary { len: 20 },
        nullable: false,
        default: None,
    }),
    MigrationStep::PrimaryKey { columns: &["id"] },
    MigrationStep::NamedKey {
        name: "idx_asset_refs_content",
        columns: &["hash", "asset_type"],
        unique: false,
    },
    MigrationStep::TableRevision(2),
    // Carried from an early deployment where these columns were created
    // nullable; a fresh replay re-applies the same end state.
    MigrationStep::ChangeColumn(ColumnDef {
        name: "temporary",
        ty: ColumnType::Bool,
        nullable: false,
        default: Some(DefaultValue::Bool(false)),
    }),
    MigrationStep::ChangeColumn(ColumnDef {
        name: "flags",
        ty: ColumnType::Int64,
        nullable: false,
        default: Some(DefaultValue::Int(0)),
    }),
];
