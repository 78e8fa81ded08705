use std::sync::Arc;

use crate::core::{ColumnKind, ColumnType, Result, Value};

use super::relation::{RelationLink, TypedLink};

/// A type that can be mapped onto column families.
///
/// Usually implemented with `#[derive(Entity)]`; a hand-written
/// implementation builds the same [`EntityMetadata`].
pub trait Entity: Send + Sync + Sized + 'static {
    fn metadata() -> EntityMetadata<Self>;
}

/// Structural description of an entity type, as declared.
///
/// Nothing is validated here; [`Schema::derive`](super::Schema::derive) checks
/// the shape and reports every problem as a schema error.
pub struct EntityMetadata<E> {
    pub(crate) type_name: &'static str,
    pub(crate) table_name: Option<String>,
    pub(crate) constructor: Option<fn() -> E>,
    pub(crate) fields: Vec<FieldMetadata<E>>,
}

impl<E: Entity> EntityMetadata<E> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table_name: None,
            constructor: None,
            fields: Vec::new(),
        }
    }

    /// Overrides the table name derived from the type name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn constructor(mut self, constructor: fn() -> E) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn field(mut self, field: FieldMetadata<E>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn id<T: ColumnType>(
        self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.field(FieldMetadata::id(name, get, get_mut))
    }

    pub fn column<T: ColumnType>(
        self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.field(FieldMetadata::column(name, get, get_mut))
    }

    pub fn indexed_column<T: ColumnType>(
        self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.field(FieldMetadata::column(name, get, get_mut).indexed())
    }

    pub fn one_to_many<R: Entity>(
        self,
        name: &'static str,
        get: fn(&E) -> &Vec<R>,
        get_mut: fn(&mut E) -> &mut Vec<R>,
    ) -> Self {
        self.field(FieldMetadata::one_to_many(name, get, get_mut))
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldMetadata<E>] {
        &self.fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Identity,
    Column { indexed: bool },
    OneToMany,
}

/// Reads and writes one scalar field as a storage [`Value`].
pub struct ColumnAccessor<E> {
    read: Arc<dyn Fn(&E) -> Result<Value> + Send + Sync>,
    write: Arc<dyn Fn(&mut E, Value) -> Result<()> + Send + Sync>,
}

impl<E> Clone for ColumnAccessor<E> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
        }
    }
}

impl<E: 'static> ColumnAccessor<E> {
    fn new<T: ColumnType>(get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self {
        Self {
            read: Arc::new(move |entity: &E| get(entity).encode()),
            write: Arc::new(move |entity: &mut E, value: Value| {
                *get_mut(entity) = T::decode(value)?;
                Ok(())
            }),
        }
    }

    pub fn get(&self, entity: &E) -> Result<Value> {
        (self.read)(entity)
    }

    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        (self.write)(entity, value)
    }
}

pub(crate) enum FieldShape<E> {
    Identity {
        kind: ColumnKind,
        nullable: bool,
        accessor: ColumnAccessor<E>,
    },
    Column {
        kind: ColumnKind,
        indexed: bool,
        accessor: ColumnAccessor<E>,
    },
    OneToMany(Arc<dyn RelationLink<E>>),
}

/// One declared field of an entity.
pub struct FieldMetadata<E> {
    pub(crate) name: &'static str,
    pub(crate) column: Option<String>,
    pub(crate) shape: FieldShape<E>,
}

impl<E: Entity> FieldMetadata<E> {
    pub fn id<T: ColumnType>(
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        Self {
            name,
            column: None,
            shape: FieldShape::Identity {
                kind: T::KIND,
                nullable: T::NULLABLE,
                accessor: ColumnAccessor::new(get, get_mut),
            },
        }
    }

    pub fn column<T: ColumnType>(
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        Self {
            name,
            column: None,
            shape: FieldShape::Column {
                kind: T::KIND,
                indexed: false,
                accessor: ColumnAccessor::new(get, get_mut),
            },
        }
    }

    pub fn one_to_many<R: Entity>(
        name: &'static str,
        get: fn(&E) -> &Vec<R>,
        get_mut: fn(&mut E) -> &mut Vec<R>,
    ) -> Self {
        Self {
            name,
            column: None,
            shape: FieldShape::OneToMany(Arc::new(TypedLink::<E, R>::new(get, get_mut))),
        }
    }

    /// Marks a column as backed by an index table. No effect on other roles.
    pub fn indexed(mut self) -> Self {
        if let FieldShape::Column { indexed, .. } = &mut self.shape {
            *indexed = true;
        }
        self
    }

    /// Stores the field under `column` instead of its field name.
    pub fn named(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn role(&self) -> FieldRole {
        match &self.shape {
            FieldShape::Identity { .. } => FieldRole::Identity,
            FieldShape::Column { indexed, .. } => FieldRole::Column { indexed: *indexed },
            FieldShape::OneToMany(_) => FieldRole::OneToMany,
        }
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(self.name)
    }
}
