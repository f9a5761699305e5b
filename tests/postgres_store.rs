//! PostgreSQL store tests. They run only when `TEST_DATABASE_URL` points
//! at a disposable database; otherwise every test returns early.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use lead_rotator::domain::contact::is_dense;
use lead_rotator::domain::{
    Contact, EventBus, LinkFilter, LinkId, LinkPatch, LinkStatus, NewLink,
};
use lead_rotator::error::RotatorError;
use lead_rotator::persistence::PostgresStore;
use lead_rotator::service::AssignmentService;
use lead_rotator::store::{ContactListStore, CursorStore, LeadStore, LinkStore};

async fn store() -> Option<PostgresStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = match PgPoolOptions::new().max_connections(16).connect(&url).await {
        Ok(pool) => pool,
        Err(e) => panic!("cannot connect to TEST_DATABASE_URL: {e}"),
    };
    let store = PostgresStore::new(pool, Duration::from_secs(2));
    if let Err(e) = store.migrate().await {
        panic!("migration failed: {e}");
    }
    Some(store)
}

async fn link(store: &PostgresStore, phones: &[&str]) -> LinkId {
    let slug = format!("pg-{}", LinkId::new());
    let Ok(new) = NewLink::new("Postgres", &slug) else {
        panic!("valid link");
    };
    let Ok(link) = store.create_link(new).await else {
        panic!("create failed");
    };
    let phones = phones.iter().map(ToString::to_string).collect();
    let Ok(_) = store.replace_contacts(link.id, phones).await else {
        panic!("replace failed");
    };
    link.id
}

#[tokio::test]
async fn cursor_starts_unset_and_advances() {
    let Some(store) = store().await else {
        return;
    };
    let link_id = link(&store, &["+551111", "+552222"]).await;

    let Ok(cursor) = store.cursor(link_id).await else {
        panic!("cursor missing");
    };
    assert_eq!(cursor.current_index, None);

    let Ok(first) = store.advance(link_id, 2).await else {
        panic!("advance failed");
    };
    let Ok(second) = store.advance(link_id, 2).await else {
        panic!("advance failed");
    };
    assert_eq!((first.slot, first.selected_index), (0, 0));
    assert_eq!((second.slot, second.selected_index), (1, 1));

    assert!(matches!(
        store.advance(link_id, 0).await,
        Err(RotatorError::NoContacts(_))
    ));
    let Ok(cursor) = store.cursor(link_id).await else {
        panic!("cursor missing");
    };
    assert_eq!(cursor.current_index, Some(2));
}

#[tokio::test]
async fn advance_unknown_link_is_not_found() {
    let Some(store) = store().await else {
        return;
    };
    assert!(matches!(
        store.advance(LinkId::new(), 3).await,
        Err(RotatorError::LinkNotFound(_))
    ));
}

#[tokio::test]
async fn concurrent_advances_are_serialized() {
    let Some(store) = store().await else {
        return;
    };
    let link_id = link(&store, &["a", "b", "c"]).await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.advance(link_id, 3).await }));
    }
    let mut slots = Vec::new();
    for handle in handles {
        let Ok(Ok(advance)) = handle.await else {
            panic!("advance task failed");
        };
        slots.push(advance.slot);
    }
    slots.sort_unstable();
    assert_eq!(slots, (0..50).collect::<Vec<u64>>());
}

#[tokio::test]
async fn contact_mutations_keep_positions_dense() {
    let Some(store) = store().await else {
        return;
    };
    let link_id = link(&store, &["a", " ", "b", "c", "d"]).await;

    let Ok(moved) = store.move_contact(link_id, 3, 0).await else {
        panic!("move failed");
    };
    let order: Vec<_> = moved.iter().map(|c| (c.position, c.phone.as_str())).collect();
    assert_eq!(order, [(0, "d"), (1, "a"), (2, "b"), (3, "c")]);

    let Ok(listed) = store.list_contacts(link_id).await else {
        panic!("list failed");
    };
    assert_eq!(listed, moved);

    assert!(matches!(
        store.move_contact(link_id, 4, 0).await,
        Err(RotatorError::PositionOutOfRange { .. })
    ));
}

#[tokio::test]
async fn slug_conflicts_and_lookup() {
    let Some(store) = store().await else {
        return;
    };
    let slug = format!("dup-{}", LinkId::new());
    let Ok(new) = NewLink::new("One", &slug) else {
        panic!("valid link");
    };
    let Ok(created) = store.create_link(new.clone()).await else {
        panic!("create failed");
    };
    assert!(matches!(
        store.create_link(new).await,
        Err(RotatorError::SlugTaken(_))
    ));
    let Ok(found) = store.get_link_by_slug(&slug).await else {
        panic!("lookup failed");
    };
    assert_eq!(found.id, created.id);

    let patch = LinkPatch {
        enabled: Some(false),
        ..LinkPatch::default()
    };
    let Ok(updated) = store.update_link(created.id, patch).await else {
        panic!("update failed");
    };
    assert!(!updated.enabled);

    let filter = LinkFilter {
        query: Some(slug.clone()),
        ..LinkFilter::default()
    };
    let Ok(listed) = store.list_links(&filter).await else {
        panic!("list failed");
    };
    let [summary] = listed.as_slice() else {
        panic!("expected one link");
    };
    assert_eq!(summary.status, LinkStatus::Inactive);
}

#[tokio::test]
async fn assignment_records_lead_and_counters() {
    let Some(store) = store().await else {
        return;
    };
    let link_id = link(&store, &["+551111"]).await;
    let store = Arc::new(store);
    let service = AssignmentService::new(Arc::<PostgresStore>::clone(&store), EventBus::new(16));

    let Ok(assignment) = service.assign(link_id, None).await else {
        panic!("assign failed");
    };
    let Ok(leads) = store.list_leads(link_id, 10, 0).await else {
        panic!("leads missing");
    };
    let [lead] = leads.as_slice() else {
        panic!("expected one lead");
    };
    assert_eq!(lead.id, assignment.lead.id);
    assert_eq!(lead.assigned_to, "+551111");

    let Ok(link) = store.get_link(link_id).await else {
        panic!("link missing");
    };
    assert_eq!(link.total_leads, 1);

    let Ok(()) = store.delete_link(link_id).await else {
        panic!("delete failed");
    };
    assert!(matches!(
        store.list_leads(link_id, 10, 0).await,
        Err(RotatorError::LinkNotFound(_))
    ));
}

const WRITTEN_LISTS: [&[&str]; 3] = [
    &["a0", "a1", "a2"],
    &["b0", "b1"],
    &["c0", "c1", "c2", "c3", "c4"],
];

fn is_whole_written_list(contacts: &[Contact]) -> bool {
    let mut phones: Vec<&str> = contacts.iter().map(|c| c.phone.as_str()).collect();
    phones.sort_unstable();
    is_dense(contacts) && WRITTEN_LISTS.iter().any(|list| phones == *list)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn list_edits_are_atomic_under_concurrent_assignment() {
    let Some(store) = store().await else {
        return;
    };
    let Some(initial) = WRITTEN_LISTS.first() else {
        panic!("no lists to write");
    };
    let link_id = link(&store, initial).await;
    let store = Arc::new(store);
    let service = Arc::new(AssignmentService::new(
        Arc::<PostgresStore>::clone(&store),
        EventBus::new(16),
    ));

    let mut handles = Vec::new();
    for writer in 0..2usize {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for round in 0..20usize {
                let Some(list) = WRITTEN_LISTS.get((round + writer) % WRITTEN_LISTS.len()) else {
                    panic!("list index out of range");
                };
                let phones = list.iter().map(ToString::to_string).collect();
                let Ok(replaced) = store.replace_contacts(link_id, phones).await else {
                    panic!("replace failed");
                };
                assert!(is_whole_written_list(&replaced));
                let Ok(moved) = store.move_contact(link_id, 0, list.len() - 1).await else {
                    panic!("move failed");
                };
                assert!(is_whole_written_list(&moved));
            }
        }));
    }
    for _ in 0..2 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for _ in 0..40 {
                let Ok(contacts) = store.list_contacts(link_id).await else {
                    panic!("list failed");
                };
                assert!(is_whole_written_list(&contacts), "torn list: {contacts:?}");
            }
        }));
    }
    for _ in 0..2 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            for _ in 0..40 {
                let Ok(assignment) = service.assign(link_id, None).await else {
                    panic!("assign failed");
                };
                let phone = assignment.contact.phone.as_str();
                assert!(WRITTEN_LISTS.iter().any(|list| list.contains(&phone)));
            }
        }));
    }

    for handle in handles {
        let Ok(()) = handle.await else {
            panic!("task panicked");
        };
    }
    let Ok(leads) = store.list_leads(link_id, 1_000, 0).await else {
        panic!("leads missing");
    };
    let mut slots: Vec<u64> = leads.iter().map(|l| l.rotation_slot).collect();
    slots.sort_unstable();
    assert_eq!(slots, (0..80).collect::<Vec<u64>>());
}

#[tokio::test]
async fn search_treats_pattern_characters_literally() {
    let Some(store) = store().await else {
        return;
    };
    let marker = LinkId::new().to_string();
    let mut ids = Vec::new();
    for name in [format!("{marker} back\\slash"), format!("{marker} 50% off")] {
        let Ok(new) = NewLink::new(&name, &format!("lit-{}", LinkId::new())) else {
            panic!("valid link");
        };
        let Ok(link) = store.create_link(new).await else {
            panic!("create failed");
        };
        ids.push(link.id);
    }

    for (query, expected) in [("\\", ids.first()), ("0%", ids.get(1)), ("_", None)] {
        let filter = LinkFilter {
            query: Some(query.to_string()),
            ..LinkFilter::default()
        };
        let Ok(listed) = store.list_links(&filter).await else {
            panic!("list failed");
        };
        let found: Vec<LinkId> = listed
            .iter()
            .filter(|s| s.name.starts_with(&marker))
            .map(|s| s.id)
            .collect();
        assert_eq!(found.first(), expected, "query {query:?}");
        assert!(found.len() <= 1, "query {query:?} matched {found:?}");
    }
}
