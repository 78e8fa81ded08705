use serde::{Deserialize, Serialize};

use super::metadata::Entity;
use super::schema::Schema;
use crate::core::ColumnKind;
use crate::storage::TableDef;

/// Serializable summary of a derived schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub type_name: String,
    pub table: String,
    pub id_column: String,
    pub columns: Vec<ColumnDescription>,
    pub relations: Vec<RelationDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescription {
    pub field: String,
    pub target_type: String,
    pub join_table: String,
    pub owner_column: String,
    pub target_column: String,
}

impl<E: Entity> Schema<E> {
    /// Primary table, then one index table per indexed column, then one join
    /// table per relation.
    pub fn table_defs(&self) -> Vec<TableDef> {
        let mut primary = TableDef::new(self.table_name())
            .column(self.id_name(), ColumnKind::Uuid)
            .partition_key(self.id_name());
        for column in self.columns() {
            primary = primary.column(column.name(), column.kind());
        }

        let mut defs = vec![primary];
        for column in self.indexed_columns() {
            let Some(index_table) = column.index_table() else {
                continue;
            };
            defs.push(
                TableDef::new(index_table)
                    .column(column.name(), column.kind())
                    .column(self.owner_column(), ColumnKind::Uuid)
                    .partition_key(column.name()),
            );
        }
        for relation in self.relations() {
            defs.push(
                TableDef::new(relation.join_table())
                    .column(relation.owner_column(), ColumnKind::Uuid)
                    .column(relation.target_column(), ColumnKind::Uuid)
                    .partition_key(relation.owner_column())
                    .clustering_key(relation.target_column()),
            );
        }
        defs
    }

    /// `CREATE TABLE IF NOT EXISTS` statements for every table of the schema.
    pub fn ddl(&self) -> Vec<String> {
        self.table_defs().iter().map(TableDef::to_cql).collect()
    }

    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            type_name: self.type_name().to_string(),
            table: self.table_name().to_string(),
            id_column: self.id_name().to_string(),
            columns: self
                .columns()
                .iter()
                .map(|column| ColumnDescription {
                    name: column.name().to_string(),
                    kind: column.kind(),
                    index_table: column.index_table().map(str::to_string),
                })
                .collect(),
            relations: self
                .relations()
                .iter()
                .map(|relation| RelationDescription {
                    field: relation.field().to_string(),
                    target_type: relation.target().type_name.to_string(),
                    join_table: relation.join_table().to_string(),
                    owner_column: relation.owner_column().to_string(),
                    target_column: relation.target_column().to_string(),
                })
                .collect(),
        }
    }
}
