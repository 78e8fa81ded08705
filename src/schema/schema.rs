use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::metadata::{ColumnAccessor, Entity, EntityMetadata, FieldShape};
use super::naming;
use super::relation::{RelationLink, RelationTarget};
use crate::core::{ColumnKind, MapperError, Result, SchemaError, Value};

/// Types already visited while deriving one schema graph.
///
/// A type is validated once per derivation, which lets mutually related
/// entity types derive without recursing forever.
#[derive(Debug, Default)]
pub struct DeriveTrail {
    visited: HashSet<TypeId>,
}

impl DeriveTrail {
    pub(crate) fn visited<E: 'static>(&self) -> bool {
        self.visited.contains(&TypeId::of::<E>())
    }

    fn enter<E: 'static>(&mut self) {
        self.visited.insert(TypeId::of::<E>());
    }
}

/// The identity column.
pub struct IdDescriptor<E> {
    field: &'static str,
    column: String,
    accessor: ColumnAccessor<E>,
}

impl<E> IdDescriptor<E> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// A persisted scalar field.
pub struct ColumnDescriptor<E> {
    field: &'static str,
    name: String,
    kind: ColumnKind,
    index_table: Option<String>,
    accessor: ColumnAccessor<E>,
}

impl<E: 'static> ColumnDescriptor<E> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_indexed(&self) -> bool {
        self.index_table.is_some()
    }

    /// `<table>_<column>_idx` for indexed columns.
    pub fn index_table(&self) -> Option<&str> {
        self.index_table.as_deref()
    }

    pub fn get(&self, entity: &E) -> Result<Value> {
        self.accessor
            .get(entity)
            .map_err(|err| err.in_column(&self.name))
    }

    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        self.accessor
            .set(entity, value)
            .map_err(|err| err.in_column(&self.name))
    }
}

/// A one-to-many relation backed by a join table.
pub struct RelationDescriptor<E> {
    field: &'static str,
    target: RelationTarget,
    join_table: String,
    owner_column: String,
    target_column: String,
    link: Arc<dyn RelationLink<E>>,
}

impl<E> RelationDescriptor<E> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn target(&self) -> &RelationTarget {
        &self.target
    }

    pub fn join_table(&self) -> &str {
        &self.join_table
    }

    /// Join column holding the owner's id (partition key).
    pub fn owner_column(&self) -> &str {
        &self.owner_column
    }

    /// Join column holding the related entity's id.
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub(crate) fn link(&self) -> &Arc<dyn RelationLink<E>> {
        &self.link
    }
}

/// How instances of `E` map onto a primary table, index tables and join tables.
pub struct Schema<E> {
    type_name: &'static str,
    table_name: String,
    id: IdDescriptor<E>,
    columns: Vec<ColumnDescriptor<E>>,
    relations: Vec<RelationDescriptor<E>>,
    constructor: fn() -> E,
}

impl<E: Entity> Schema<E> {
    /// Derives the schema of `E` and, recursively, of every related type.
    pub fn derive() -> Result<Self> {
        Ok(Self::derive_in(&mut DeriveTrail::default())?)
    }

    pub(crate) fn derive_in(trail: &mut DeriveTrail) -> std::result::Result<Self, SchemaError> {
        let metadata = E::metadata();
        trail.enter::<E>();

        let entity = metadata.type_name.to_string();
        let constructor = metadata
            .constructor
            .ok_or_else(|| SchemaError::MissingConstructor(entity.clone()))?;
        let table_name = metadata
            .table_name
            .clone()
            .unwrap_or_else(|| naming::table_name(metadata.type_name));

        let mut ids = Vec::new();
        let mut columns = Vec::new();
        let mut links = Vec::new();

        for field in metadata.fields {
            let column_name = field.column.clone().unwrap_or_else(|| field.name.to_string());
            match field.shape {
                FieldShape::Identity {
                    kind,
                    nullable,
                    accessor,
                } => {
                    ids.push((field.name, column_name, kind, nullable, accessor));
                }
                FieldShape::Column {
                    kind,
                    indexed,
                    accessor,
                } => {
                    if !kind.is_supported() {
                        return Err(SchemaError::UnsupportedFieldType {
                            entity,
                            field: field.name.to_string(),
                            kind,
                        });
                    }
                    let index_table =
                        indexed.then(|| naming::index_table_name(&table_name, &column_name));
                    columns.push(ColumnDescriptor {
                        field: field.name,
                        name: column_name,
                        kind,
                        index_table,
                        accessor,
                    });
                }
                FieldShape::OneToMany(link) => links.push((field.name, link)),
            }
        }

        let id = match ids.len() {
            0 => return Err(SchemaError::MissingIdentity(entity)),
            1 => {
                let (field, column, kind, nullable, accessor) = ids.remove(0);
                if kind != ColumnKind::Uuid {
                    return Err(SchemaError::InvalidIdentityType {
                        entity,
                        field: field.to_string(),
                        found: kind,
                    });
                }
                if !nullable {
                    return Err(SchemaError::NonOptionalIdentity {
                        entity,
                        field: field.to_string(),
                    });
                }
                IdDescriptor {
                    field,
                    column,
                    accessor,
                }
            }
            _ => {
                return Err(SchemaError::MultipleIdentity {
                    entity,
                    fields: ids.iter().map(|(field, ..)| field.to_string()).collect(),
                });
            }
        };

        let mut column_names = HashSet::new();
        column_names.insert(id.column.clone());
        for column in &columns {
            if !column_names.insert(column.name.clone()) {
                return Err(SchemaError::DuplicateColumn {
                    entity,
                    column: column.name.clone(),
                });
            }
        }

        let mut relations = Vec::with_capacity(links.len());
        for (field, link) in links {
            let target = link
                .resolve(trail)
                .map_err(|source| SchemaError::InvalidRelation {
                    entity: entity.clone(),
                    field: field.to_string(),
                    source: Box::new(source),
                })?;
            let join_table = naming::join_table_name(&table_name, &target.table);
            let (owner_column, target_column) = naming::join_columns(&table_name, &target.table);
            relations.push(RelationDescriptor {
                field,
                target,
                join_table,
                owner_column,
                target_column,
                link,
            });
        }

        let mut tables = HashSet::new();
        tables.insert(table_name.clone());
        let secondary = columns
            .iter()
            .filter_map(|column| column.index_table.clone())
            .chain(relations.iter().map(|relation| relation.join_table.clone()));
        for table in secondary {
            if !tables.insert(table.clone()) {
                return Err(SchemaError::DuplicateTable { entity, table });
            }
        }

        Ok(Self {
            type_name: metadata.type_name,
            table_name,
            id,
            columns,
            relations,
            constructor,
        })
    }

    /// Table and identity column of `E` read straight from its metadata.
    pub(crate) fn target_of(
        metadata: &EntityMetadata<E>,
    ) -> std::result::Result<RelationTarget, SchemaError> {
        let table = metadata
            .table_name
            .clone()
            .unwrap_or_else(|| naming::table_name(metadata.type_name));
        let id_column = metadata
            .fields
            .iter()
            .find(|field| matches!(field.shape, FieldShape::Identity { .. }))
            .map(|field| field.column_name().to_string())
            .ok_or_else(|| SchemaError::MissingIdentity(metadata.type_name.to_string()))?;
        Ok(RelationTarget {
            type_name: metadata.type_name,
            table,
            id_column,
        })
    }

    pub(crate) fn target(&self) -> RelationTarget {
        RelationTarget {
            type_name: self.type_name,
            table: self.table_name.clone(),
            id_column: self.id.column.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn id(&self) -> &IdDescriptor<E> {
        &self.id
    }

    pub fn id_name(&self) -> &str {
        &self.id.column
    }

    /// Columns in declaration order, identity and relations excluded.
    pub fn columns(&self) -> &[ColumnDescriptor<E>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor<E>> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDescriptor<E>> {
        self.columns.iter().filter(|column| column.is_indexed())
    }

    pub fn relations(&self) -> &[RelationDescriptor<E>] {
        &self.relations
    }

    pub fn relation(&self, field: &str) -> Option<&RelationDescriptor<E>> {
        self.relations.iter().find(|relation| relation.field == field)
    }

    /// `<table>_id`, the column index tables use for the owning id.
    pub fn owner_column(&self) -> String {
        naming::join_column_name(&self.table_name)
    }

    /// A fresh instance from the zero-argument constructor.
    pub fn instantiate(&self) -> E {
        (self.constructor)()
    }

    pub fn id_value(&self, entity: &E) -> Result<Option<Uuid>> {
        match self.id.accessor.get(entity)? {
            Value::Null => Ok(None),
            Value::Uuid(id) => Ok(Some(id)),
            other => Err(MapperError::UnsupportedType {
                column: self.id.column.clone(),
                expected: ColumnKind::Uuid,
                found: other.type_name(),
            }),
        }
    }

    pub fn set_id(&self, entity: &mut E, id: Uuid) -> Result<()> {
        self.id
            .accessor
            .set(entity, Value::Uuid(id))
            .map_err(|err| err.in_column(&self.id.column))
    }
}
