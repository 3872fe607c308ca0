//! Scenarios of the [`Service`] over the in-memory store.

use std::time::Duration;

use service::{
    command::{create_listing, join_listing, CreateListing, JoinListing},
    domain::{listing, user, Listing, User},
    infra::{database, Memory},
    query,
    read::listing::list::Projection,
    task::expire_listings,
    Command as _, Config, Query as _, Service, Subscription,
};
use tokio::sync::mpsc;

fn service(db: &Memory) -> Service<Memory> {
    let config = Config {
        jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"secret"),
        allowed_email_domain: Some("lion.lmu.edu".into()),
        store_timeout: Duration::from_secs(10),
        expire_listings: expire_listings::Config::default(),
    };
    Service::new(config, db.clone()).0
}

fn user(email: &str) -> User {
    User {
        id: user::Id::new(email).unwrap(),
        is_verified: true,
    }
}

fn create(header: &str, limit: i64) -> CreateListing {
    CreateListing {
        author: Some(user("owner@lion.lmu.edu")),
        header: header.into(),
        body: "Come along".into(),
        kind: listing::Kind::Social,
        member_limit: limit,
        scheduled_start: None,
        scheduled_end: None,
    }
}

async fn fetch(svc: &Service<Memory>, id: listing::Id) -> Listing {
    svc.execute(query::listing::ById::by(id))
        .await
        .unwrap()
        .unwrap()
}

async fn join(
    svc: &Service<Memory>,
    listing: Listing,
    email: &str,
) -> Result<(), tracerr::Traced<join_listing::ExecutionError>> {
    svc.execute(JoinListing {
        listing,
        user: Some(user(email)),
    })
    .await
}

#[tokio::test]
async fn feed_reports_current_state_and_changes() {
    let db = Memory::new();
    let svc = service(&db);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let feed = Subscription::start(&svc, Projection::default(), move |l| {
        _ = tx.send(l);
    })
    .await
    .unwrap();
    assert!(feed.is_active());
    assert!(rx.recv().await.unwrap().is_empty());

    let id = svc.execute(create("L1", 3)).await.unwrap();
    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].header.to_string(), "L1");
    assert!(snapshot[0].members.is_empty());

    feed.cancel();
    feed.cancel();
    assert!(!feed.is_active());

    _ = svc.execute(create("L2", 3)).await.unwrap();
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn dropped_feed_stops_callbacks() {
    let db = Memory::new();
    let svc = service(&db);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let feed = Subscription::start(&svc, Projection::default(), move |l| {
        _ = tx.send(l);
    })
    .await
    .unwrap();
    assert!(rx.recv().await.unwrap().is_empty());

    drop(feed);
    _ = svc.execute(create("L1", 3)).await.unwrap();

    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn feed_ends_once_store_is_gone() {
    let db = Memory::new();
    let svc = service(&db);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let feed = Subscription::start(&svc, Projection::default(), move |l| {
        _ = tx.send(l);
    })
    .await
    .unwrap();
    assert!(rx.recv().await.unwrap().is_empty());

    drop(svc);
    drop(db);

    let end = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
    assert_eq!(end, Ok(None));
    assert!(!feed.is_active());
}

#[tokio::test]
async fn feed_applies_projection() {
    let db = Memory::new();
    let svc = service(&db);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let projection = Projection {
        search: "soccer".into(),
        sort: Default::default(),
    };

    let _feed = Subscription::start(&svc, projection, move |l| {
        _ = tx.send(l);
    })
    .await
    .unwrap();
    assert!(rx.recv().await.unwrap().is_empty());

    _ = svc.execute(create("Chess club", 3)).await.unwrap();
    assert!(rx.recv().await.unwrap().is_empty());

    let id = svc.execute(create("Soccer match", 3)).await.unwrap();
    let view = rx.recv().await.unwrap();
    assert_eq!(view.iter().map(|l| l.id).collect::<Vec<_>>(), [id]);
}

#[tokio::test]
async fn capacity_is_enforced_against_snapshot() {
    let db = Memory::new();
    let svc = service(&db);
    let id = svc.execute(create("Study group", 2)).await.unwrap();

    join(&svc, fetch(&svc, id).await, "a@lion.lmu.edu")
        .await
        .unwrap();
    join(&svc, fetch(&svc, id).await, "b@lion.lmu.edu")
        .await
        .unwrap();

    let full = fetch(&svc, id).await;
    assert!(full.is_full());
    assert_eq!(
        full.members.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["a@lion.lmu.edu", "b@lion.lmu.edu"],
    );

    let err = join(&svc, full.clone(), "c@lion.lmu.edu")
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        join_listing::ExecutionError::Refused(listing::Refusal::Full),
    ));

    let err = join(&svc, full, "a@lion.lmu.edu").await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        join_listing::ExecutionError::Refused(listing::Refusal::AlreadyMember),
    ));

    assert_eq!(fetch(&svc, id).await.members.len(), 2);
}

#[tokio::test]
async fn duplicate_joins_are_idempotent() {
    let db = Memory::new();
    let svc = service(&db);
    let id = svc.execute(create("Hike", 5)).await.unwrap();
    let stale = fetch(&svc, id).await;

    let (first, second) = futures::join!(
        join(&svc, stale.clone(), "a@lion.lmu.edu"),
        join(&svc, stale, "a@lion.lmu.edu"),
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(fetch(&svc, id).await.members.len(), 1);
}

#[tokio::test]
async fn racing_for_last_slot_may_overfill() {
    let db = Memory::new();
    let svc = service(&db);
    let id = svc.execute(create("Ride share", 1)).await.unwrap();
    let stale = fetch(&svc, id).await;

    join(&svc, stale.clone(), "a@lion.lmu.edu").await.unwrap();
    join(&svc, stale, "b@lion.lmu.edu").await.unwrap();

    let listing = fetch(&svc, id).await;
    assert_eq!(listing.members.len(), 2);
    assert!(listing.is_full());
}

#[tokio::test(start_paused = true)]
async fn unresponsive_store_times_out() {
    let db = Memory::new();
    let svc = service(&db);
    db.set_latency(Duration::from_secs(60));

    let err = svc.execute(create("Late", 3)).await.unwrap_err();

    assert!(matches!(
        err.as_ref(),
        create_listing::ExecutionError::StoreUnavailable(
            database::Error::Timeout(_),
        ),
    ));
}

#[tokio::test]
async fn unreachable_store_keeps_state() {
    let db = Memory::new();
    let svc = service(&db);
    let id = svc.execute(create("Trivia night", 3)).await.unwrap();
    let listing = fetch(&svc, id).await;
    db.set_reachable(false);

    let err = join(&svc, listing, "a@lion.lmu.edu").await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        join_listing::ExecutionError::StoreUnavailable(
            database::Error::Memory(_),
        ),
    ));

    db.set_reachable(true);
    assert!(fetch(&svc, id).await.members.is_empty());
    assert_eq!(
        svc.execute(query::listings::All::by(())).await.unwrap().len(),
        1,
    );
}
