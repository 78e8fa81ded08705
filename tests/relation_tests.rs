/// Relation tests
///
/// Join-table maintenance on update and recursive read-back of related
/// entities, including cyclic graphs.
/// Run with: cargo test --test relation_tests

use cassmap::prelude::*;
use cassmap::storage::{Insert, Mutation};

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Track {
    #[id]
    id: Option<Uuid>,
    title: String,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Playlist {
    #[id]
    id: Option<Uuid>,
    name: String,
    #[one_to_many]
    tracks: Vec<Track>,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Node {
    #[id]
    id: Option<Uuid>,
    label: String,
    #[one_to_many]
    children: Vec<Node>,
}

async fn setup_with(config: MapperConfig) -> (Arc<MemorySession>, Mapper) {
    let session = Arc::new(MemorySession::new());
    let mapper = Mapper::with_config(session.clone(), config);
    session
        .create_schema_tables(&*mapper.schema::<Playlist>().unwrap())
        .await;
    session
        .create_schema_tables(&*mapper.schema::<Track>().unwrap())
        .await;
    session
        .create_schema_tables(&*mapper.schema::<Node>().unwrap())
        .await;
    (session, mapper)
}

async fn setup() -> (Arc<MemorySession>, Mapper) {
    setup_with(MapperConfig::default()).await
}

async fn saved_track(mapper: &Mapper, title: &str) -> Track {
    let mut track = Track {
        title: title.to_string(),
        ..Default::default()
    };
    mapper.create(&mut track).await.unwrap();
    track
}

async fn saved_node(mapper: &Mapper, label: &str, children: Vec<Node>) -> Node {
    let mut node = Node {
        label: label.to_string(),
        children,
        ..Default::default()
    };
    mapper.create(&mut node).await.unwrap();
    node
}

#[tokio::test]
async fn test_relation_diff_inserts_added_and_deletes_removed() {
    let (session, mapper) = setup().await;
    let a = saved_track(&mapper, "a").await;
    let b = saved_track(&mapper, "b").await;
    let c = saved_track(&mapper, "c").await;
    let d = saved_track(&mapper, "d").await;

    let mut playlist = Playlist {
        name: "mix".into(),
        tracks: vec![a.clone(), b.clone(), c.clone()],
        ..Default::default()
    };
    let id = mapper.create(&mut playlist).await.unwrap();

    let mut loaded = mapper.read::<Playlist>(id).await.unwrap().unwrap();
    loaded.tracks = vec![b.clone(), c.clone(), d.clone()];
    mapper.update(&loaded).await.unwrap();

    let batch = session.last_batch().unwrap();
    let join_ops: Vec<&Mutation> = batch.for_table("playlist_track").collect();
    assert_eq!(join_ops.len(), 2);
    let inserted: Vec<&Insert> = join_ops
        .iter()
        .filter_map(|op| match op {
            Mutation::Insert(insert) => Some(insert),
            _ => None,
        })
        .collect();
    assert_eq!(inserted.len(), 1);
    assert!(
        inserted[0]
            .values
            .contains(&("track_id".to_string(), Value::Uuid(d.id.unwrap())))
    );
    let deleted: Vec<_> = join_ops
        .iter()
        .filter_map(|op| match op {
            Mutation::Delete(delete) => Some(delete),
            _ => None,
        })
        .collect();
    assert_eq!(deleted.len(), 1);
    assert!(
        deleted[0]
            .conditions
            .iter()
            .any(|cond| cond.column == "track_id" && cond.value == Value::Uuid(a.id.unwrap()))
    );

    let reloaded = mapper.read::<Playlist>(id).await.unwrap().unwrap();
    let titles: Vec<&str> = reloaded.tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "c", "d"]);
}

#[tokio::test]
async fn test_reordering_related_entities_writes_nothing() {
    let (session, mapper) = setup().await;
    let a = saved_track(&mapper, "a").await;
    let b = saved_track(&mapper, "b").await;
    let mut playlist = Playlist {
        name: "pair".into(),
        tracks: vec![a, b],
        ..Default::default()
    };
    let id = mapper.create(&mut playlist).await.unwrap();
    let before = session.executed_batches().len();

    let mut loaded = mapper.read::<Playlist>(id).await.unwrap().unwrap();
    loaded.tracks.reverse();
    mapper.update(&loaded).await.unwrap();
    assert_eq!(session.executed_batches().len(), before);
}

#[tokio::test]
async fn test_adding_an_unsaved_element_fails_the_update() {
    let (session, mapper) = setup().await;
    let mut playlist = Playlist {
        name: "empty".into(),
        ..Default::default()
    };
    let id = mapper.create(&mut playlist).await.unwrap();
    let before = session.executed_batches().len();

    let mut loaded = mapper.read::<Playlist>(id).await.unwrap().unwrap();
    loaded.tracks.push(Track::default());
    let err = mapper.update(&loaded).await.unwrap_err();
    assert!(matches!(err, MapperError::UnsavedRelation { .. }));
    assert_eq!(session.executed_batches().len(), before);
}

#[tokio::test]
async fn test_join_rows_to_deleted_entities_are_skipped() {
    let (_session, mapper) = setup().await;
    let kept = saved_track(&mapper, "kept").await;
    let gone = saved_track(&mapper, "gone").await;
    let mut playlist = Playlist {
        name: "partial".into(),
        tracks: vec![kept.clone(), gone.clone()],
        ..Default::default()
    };
    let id = mapper.create(&mut playlist).await.unwrap();

    mapper.delete_detached(&gone).await.unwrap();

    let loaded = mapper.read::<Playlist>(id).await.unwrap().unwrap();
    assert_eq!(loaded.tracks, vec![kept]);
}

#[tokio::test]
async fn test_nested_relations_are_read_depth_first() {
    let (_session, mapper) = setup().await;
    let leaf = saved_node(&mapper, "leaf", Vec::new()).await;
    let middle = saved_node(&mapper, "middle", vec![leaf.clone()]).await;
    let root = saved_node(&mapper, "root", vec![middle.clone()]).await;

    let loaded = mapper.read::<Node>(root.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.children.len(), 1);
    assert_eq!(loaded.children[0].label, "middle");
    assert_eq!(loaded.children[0].children, vec![leaf]);
    // only the root is tracked
    assert_eq!(mapper.records().len(), 1);
}

#[tokio::test]
async fn test_shared_children_are_not_cycles() {
    let (_session, mapper) = setup().await;
    let shared = saved_node(&mapper, "shared", Vec::new()).await;
    let left = saved_node(&mapper, "left", vec![shared.clone()]).await;
    let right = saved_node(&mapper, "right", vec![shared.clone()]).await;
    let root = saved_node(&mapper, "root", vec![left, right]).await;

    let loaded = mapper.read::<Node>(root.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.children[0].children, vec![shared.clone()]);
    assert_eq!(loaded.children[1].children, vec![shared]);
}

#[tokio::test]
async fn test_cyclic_graphs_are_detected() {
    let (_session, mapper) = setup().await;
    let mut first = saved_node(&mapper, "first", Vec::new()).await;
    let second = saved_node(&mapper, "second", vec![first.clone()]).await;

    first.children = vec![second.clone()];
    mapper.update_detached(&first).await.unwrap();

    let err = mapper.read::<Node>(first.id.unwrap()).await.unwrap_err();
    match err {
        MapperError::RelationCycle { table, id } => {
            assert_eq!(table, "node");
            assert_eq!(Some(id), first.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(mapper.records().is_empty());
}

#[tokio::test]
async fn test_relation_depth_is_bounded() {
    let (_session, mapper) = setup_with(MapperConfig::new().max_relation_depth(1)).await;
    let leaf = saved_node(&mapper, "leaf", Vec::new()).await;
    let middle = saved_node(&mapper, "middle", vec![leaf]).await;
    let root = saved_node(&mapper, "root", vec![middle.clone()]).await;

    assert!(mapper.read::<Node>(middle.id.unwrap()).await.unwrap().is_some());
    let err = mapper.read::<Node>(root.id.unwrap()).await.unwrap_err();
    assert!(matches!(err, MapperError::RelationDepthExceeded { depth: 1 }));
}

#[tokio::test]
async fn test_zero_depth_reads_entities_without_relations() {
    let (_session, mapper) = setup_with(MapperConfig::new().max_relation_depth(0)).await;
    let leaf = saved_node(&mapper, "leaf", Vec::new()).await;
    let parent = saved_node(&mapper, "parent", vec![leaf]).await;

    let err = mapper.read::<Node>(parent.id.unwrap()).await.unwrap_err();
    assert!(matches!(err, MapperError::RelationDepthExceeded { depth: 0 }));
    let alone = saved_node(&mapper, "alone", Vec::new()).await;
    assert!(mapper.read::<Node>(alone.id.unwrap()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_keeps_related_entities() {
    let (session, mapper) = setup().await;
    let track = saved_track(&mapper, "survivor").await;
    let mut playlist = Playlist {
        name: "doomed".into(),
        tracks: vec![track.clone()],
        ..Default::default()
    };
    mapper.create(&mut playlist).await.unwrap();

    mapper.delete_detached(&playlist).await.unwrap();
    assert_eq!(session.row_count("playlist_track").await.unwrap(), 0);
    let survivor = mapper.read::<Track>(track.id.unwrap()).await.unwrap();
    assert_eq!(survivor.map(|t| t.into_inner()), Some(track));
}
