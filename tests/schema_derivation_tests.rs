/// Schema derivation tests
///
/// Entity shape validation, naming of the derived tables and the DDL handed
/// to the store.
/// Run with: cargo test --test schema_derivation_tests

use cassmap::prelude::*;
use cassmap::{ColumnKind, Schema, SchemaError};

#[derive(Entity, Debug, Default)]
struct Item {
    #[id]
    id: Option<Uuid>,
    name: String,
}

#[derive(Entity, Debug, Default)]
#[entity(table = "orders")]
struct Order {
    #[id]
    id: Option<Uuid>,
    #[column(index)]
    reference: String,
    #[column(name = "memo")]
    note: Option<String>,
    #[column(skip)]
    scratch: u8,
    #[one_to_many]
    items: Vec<Item>,
}

struct NoConstructor {
    id: Option<Uuid>,
}

impl cassmap::Entity for NoConstructor {
    fn metadata() -> EntityMetadata<Self> {
        EntityMetadata::<Self>::new("NoConstructor").id("id", |e| &e.id, |e| &mut e.id)
    }
}

#[derive(Entity, Default)]
struct NoIdentity {
    name: String,
}

#[derive(Entity, Default)]
struct TwoIdentities {
    #[id]
    first: Option<Uuid>,
    #[id]
    second: Option<Uuid>,
}

#[derive(Entity, Default)]
struct TextIdentity {
    #[id]
    id: String,
}

#[derive(Entity, Default)]
struct PlainIdentity {
    #[id]
    id: Uuid,
    name: String,
}

#[derive(Entity, Default)]
struct WithList {
    #[id]
    id: Option<Uuid>,
    tags: Vec<String>,
}

#[derive(Entity, Default)]
struct BadParent {
    #[id]
    id: Option<Uuid>,
    #[one_to_many]
    children: Vec<NoIdentity>,
}

#[derive(Entity, Default)]
struct Clash {
    #[id]
    id: Option<Uuid>,
    name: String,
    #[column(name = "name")]
    alias: String,
}

#[derive(Entity, Default)]
struct Author {
    #[id]
    id: Option<Uuid>,
    #[one_to_many]
    books: Vec<Book>,
}

#[derive(Entity, Default)]
struct Book {
    #[id]
    id: Option<Uuid>,
    #[one_to_many]
    authors: Vec<Author>,
}

#[derive(Entity, Default)]
struct Node {
    #[id]
    id: Option<Uuid>,
    #[one_to_many]
    children: Vec<Node>,
}

fn schema_error<E: cassmap::Entity>() -> SchemaError {
    match Schema::<E>::derive() {
        Err(MapperError::Schema(err)) => err,
        Err(other) => panic!("expected a schema error, got {other}"),
        Ok(_) => panic!("expected derivation to fail"),
    }
}

#[test]
fn test_columns_exclude_identity_relations_and_skipped_fields() {
    let schema = Schema::<Order>::derive().unwrap();

    assert_eq!(schema.table_name(), "orders");
    assert_eq!(schema.id_name(), "id");
    let columns: Vec<&str> = schema.columns().iter().map(|c| c.name()).collect();
    assert_eq!(columns, vec!["reference", "memo"]);
    assert_eq!(schema.column("memo").unwrap().field(), "note");
    assert_eq!(schema.column("memo").unwrap().kind(), ColumnKind::Text);

    let indexed: Vec<&str> = schema.indexed_columns().map(|c| c.name()).collect();
    assert_eq!(indexed, vec!["reference"]);

    assert_eq!(schema.relations().len(), 1);
    let items = schema.relation("items").unwrap();
    assert_eq!(items.join_table(), "orders_item");
    assert_eq!(items.owner_column(), "orders_id");
    assert_eq!(items.target_column(), "item_id");
    assert_eq!(items.target().type_name, "Item");
}

#[test]
fn test_missing_constructor_is_rejected() {
    assert_eq!(
        schema_error::<NoConstructor>(),
        SchemaError::MissingConstructor("NoConstructor".into())
    );
}

#[test]
fn test_identity_count_is_enforced() {
    assert_eq!(
        schema_error::<NoIdentity>(),
        SchemaError::MissingIdentity("NoIdentity".into())
    );
    assert_eq!(
        schema_error::<TwoIdentities>(),
        SchemaError::MultipleIdentity {
            entity: "TwoIdentities".into(),
            fields: vec!["first".into(), "second".into()],
        }
    );
}

#[test]
fn test_identity_must_be_uuid() {
    assert_eq!(
        schema_error::<TextIdentity>(),
        SchemaError::InvalidIdentityType {
            entity: "TextIdentity".into(),
            field: "id".into(),
            found: ColumnKind::Text,
        }
    );
}

#[test]
fn test_identity_must_be_able_to_stay_unset() {
    assert_eq!(
        schema_error::<PlainIdentity>(),
        SchemaError::NonOptionalIdentity {
            entity: "PlainIdentity".into(),
            field: "id".into(),
        }
    );

    let mapper = Mapper::new(Arc::new(MemorySession::new()));
    assert!(matches!(
        mapper.schema::<PlainIdentity>(),
        Err(MapperError::Schema(SchemaError::NonOptionalIdentity { .. }))
    ));
}

#[test]
fn test_collection_columns_are_unsupported() {
    assert_eq!(
        schema_error::<WithList>(),
        SchemaError::UnsupportedFieldType {
            entity: "WithList".into(),
            field: "tags".into(),
            kind: ColumnKind::List,
        }
    );
}

#[test]
fn test_invalid_related_type_fails_the_owner() {
    match schema_error::<BadParent>() {
        SchemaError::InvalidRelation {
            entity,
            field,
            source,
        } => {
            assert_eq!(entity, "BadParent");
            assert_eq!(field, "children");
            assert_eq!(*source, SchemaError::MissingIdentity("NoIdentity".into()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_column_names_are_rejected() {
    assert_eq!(
        schema_error::<Clash>(),
        SchemaError::DuplicateColumn {
            entity: "Clash".into(),
            column: "name".into(),
        }
    );
}

#[test]
fn test_mutually_related_types_derive() {
    let author = Schema::<Author>::derive().unwrap();
    let book = Schema::<Book>::derive().unwrap();

    assert_eq!(author.relation("books").unwrap().join_table(), "author_book");
    assert_eq!(book.relation("authors").unwrap().join_table(), "book_author");
}

#[test]
fn test_self_relation_uses_distinct_join_columns() {
    let schema = Schema::<Node>::derive().unwrap();
    let children = schema.relation("children").unwrap();

    assert_eq!(children.join_table(), "node_node");
    assert_eq!(children.owner_column(), "node_id");
    assert_eq!(children.target_column(), "node_related_id");
}

#[test]
fn test_ddl_covers_primary_index_and_join_tables() {
    let schema = Schema::<Order>::derive().unwrap();

    assert_eq!(
        schema.ddl(),
        vec![
            "CREATE TABLE IF NOT EXISTS orders (id uuid, reference text, memo text, PRIMARY KEY (id))",
            "CREATE TABLE IF NOT EXISTS orders_reference_idx (reference text, orders_id uuid, PRIMARY KEY (reference))",
            "CREATE TABLE IF NOT EXISTS orders_item (orders_id uuid, item_id uuid, PRIMARY KEY (orders_id, item_id))",
        ]
    );
}

#[test]
fn test_describe_serializes_the_layout() {
    let description = Schema::<Order>::derive().unwrap().describe();
    let json = serde_json::to_value(&description).unwrap();

    assert_eq!(json["table"], "orders");
    assert_eq!(json["columns"][0]["index_table"], "orders_reference_idx");
    assert!(json["columns"][1].get("index_table").is_none());
    assert_eq!(json["relations"][0]["target_type"], "Item");
}

#[test]
fn test_registry_caches_successful_derivations_only() {
    let session = Arc::new(MemorySession::new());
    let mapper = Mapper::new(session);

    let first = mapper.schema::<Item>().unwrap();
    let second = mapper.schema::<Item>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert!(mapper.schema::<NoIdentity>().is_err());
    assert!(!mapper.registry().contains::<NoIdentity>());
    assert_eq!(mapper.registry().len(), 1);
}
