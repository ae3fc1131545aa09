mod common;

use common::{backends, seed_feed, seed_item, FaultyBackend};
use feedstore_core::{
    BackendKind, Entity, FeedService, Item, ItemRepository, MetaData, PurgeSummary, RepoError,
    SqliteBackend,
};
use uuid::Uuid;

#[test]
fn item_with_children_loads_metadata_and_entities_in_order() {
    for (name, backend) in backends() {
        let service = FeedService::new(backend.as_ref());
        let feed = seed_feed(backend.as_ref(), "Source");
        let item = seed_item(backend.as_ref(), &feed, "Story");
        service
            .metadata()
            .bulk_create(&[
                MetaData::new(item.id, "lang", "en"),
                MetaData::new(item.id, "author", "Ada"),
            ])
            .unwrap();
        service
            .entities()
            .bulk_create(&[
                Entity::new(item.id, "GPE", "Paris", 20, 25),
                Entity::new(item.id, "PERSON", "Ada", 0, 3),
            ])
            .unwrap();

        let loaded = service.item_with_children(item.id).unwrap();
        let names = loaded
            .metadata
            .iter()
            .map(|meta| meta.name.as_str())
            .collect::<Vec<_>>();
        let labels = loaded
            .entities
            .iter()
            .map(|entity| entity.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["author", "lang"], "{name}");
        assert_eq!(labels, vec!["PERSON", "GPE"], "{name}");
    }
}

#[test]
fn item_with_children_for_missing_item_is_not_found() {
    for (name, backend) in backends() {
        let service = FeedService::new(backend.as_ref());
        let err = service.item_with_children(Uuid::new_v4()).unwrap_err();
        assert!(
            matches!(&err, RepoError::NotFound { collection: "items", .. }),
            "{name}: {err}"
        );
    }
}

#[test]
fn items_for_feed_lists_only_that_feed() {
    for (name, backend) in backends() {
        let service = FeedService::new(backend.as_ref());
        let feed = seed_feed(backend.as_ref(), "Source");
        let other = seed_feed(backend.as_ref(), "Other");
        seed_item(backend.as_ref(), &feed, "Beta");
        seed_item(backend.as_ref(), &feed, "Alpha");
        seed_item(backend.as_ref(), &other, "Gamma");

        let titles = service
            .items_for_feed(feed.id)
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Alpha", "Beta"], "{name}");
    }
}

#[test]
fn deleting_item_then_purging_children_leaves_no_orphans() {
    for (name, backend) in backends() {
        let service = FeedService::new(backend.as_ref());
        let feed = seed_feed(backend.as_ref(), "Source");
        let item = seed_item(backend.as_ref(), &feed, "Story");
        let sibling = seed_item(backend.as_ref(), &feed, "Sibling");
        service
            .metadata()
            .create(&MetaData::new(item.id, "lang", "en"))
            .unwrap();
        service
            .metadata()
            .create(&MetaData::new(sibling.id, "lang", "de"))
            .unwrap();
        service
            .entities()
            .create(&Entity::new(item.id, "ORG", "Acme", 0, 4))
            .unwrap();

        service.items().delete(&item).unwrap();
        assert_eq!(service.metadata().find_by_owner(item.id).unwrap().len(), 1, "{name}");

        let summary = service.purge_item_children(item.id).unwrap();
        assert_eq!(
            summary,
            PurgeSummary {
                metadata: 1,
                entities: 1
            },
            "{name}"
        );
        assert!(service.metadata().find_by_owner(item.id).unwrap().is_empty(), "{name}");
        assert!(service.entities().find_by_owner(item.id).unwrap().is_empty(), "{name}");
        assert_eq!(service.metadata().find_by_owner(sibling.id).unwrap().len(), 1, "{name}");

        let again = service.purge_item_children(item.id).unwrap();
        assert_eq!(again, PurgeSummary::default(), "{name}");
    }
}

#[test]
fn service_reports_backend_kind() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    assert_eq!(FeedService::new(&backend).backend_kind(), BackendKind::Sqlite);
}

#[test]
fn sqlite_rejects_item_for_missing_feed() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let orphan = Item::new(Uuid::new_v4(), "Orphan");

    let err = ItemRepository::new(&backend).create(&orphan).unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConstraintViolation {
            collection: "items",
            ..
        }
    ));
}

#[test]
fn sqlite_rejects_metadata_moved_to_missing_item() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let service = FeedService::new(&backend);
    let feed = seed_feed(&backend, "Source");
    let item = seed_item(&backend, &feed, "Story");
    let mut meta = MetaData::new(item.id, "lang", "en");
    service.metadata().create(&meta).unwrap();

    meta.item_id = Uuid::new_v4();
    let err = service.metadata().update(&meta).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation { .. }));
}

#[test]
fn sqlite_reference_failure_aborts_whole_batch() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let service = FeedService::new(&backend);
    let feed = seed_feed(&backend, "Source");
    let item = seed_item(&backend, &feed, "Story");

    let batch = vec![
        MetaData::new(item.id, "lang", "en"),
        MetaData::new(Uuid::new_v4(), "lang", "xx"),
    ];
    let err = service.metadata().bulk_create(&batch).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation { .. }));
    assert!(service.metadata().find().unwrap().is_empty());
}

#[test]
fn document_backend_does_not_check_references() {
    let backend = feedstore_core::DocumentBackend::in_memory();
    let orphan = Item::new(Uuid::new_v4(), "Orphan");

    ItemRepository::new(&backend).create(&orphan).unwrap();
    assert_eq!(backend.document_count("items").unwrap(), 1);
}

#[test]
fn purge_failure_on_entities_keeps_metadata() {
    let backend = FaultyBackend::failing_scoped_writes_to("entities");
    let service = FeedService::new(&backend);
    let feed = seed_feed(&backend, "Source");
    let item = seed_item(&backend, &feed, "Story");
    service
        .metadata()
        .create(&MetaData::new(item.id, "lang", "en"))
        .unwrap();
    service
        .entities()
        .create(&Entity::new(item.id, "ORG", "Acme", 0, 4))
        .unwrap();

    let err = service.purge_item_children(item.id).unwrap_err();
    assert!(matches!(err, RepoError::Transport(_)));
    assert_eq!(service.metadata().find_by_owner(item.id).unwrap().len(), 1);
    assert_eq!(service.entities().find_by_owner(item.id).unwrap().len(), 1);
}

#[test]
fn purge_commit_failure_requires_reverification() {
    let backend = FaultyBackend::failing_commit();
    let service = FeedService::new(&backend);
    let feed = seed_feed(&backend, "Source");
    let item = seed_item(&backend, &feed, "Story");

    let err = service.purge_item_children(item.id).unwrap_err();
    assert!(err.requires_reverification());
}
