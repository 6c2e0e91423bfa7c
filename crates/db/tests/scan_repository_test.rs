//! Integration tests for the scan repository against in-memory SQLite.

use chrono::{Duration, SubsecRound, Utc};
use naturescan_core::scan::{NewScan, ScanRepository as _};
use naturescan_core::vision::{Confidence, SpeciesAnalysis};
use naturescan_db::ScanRepository;
use naturescan_db::entities::{scans, sea_orm_active_enums::ConfidenceLevel};
use naturescan_db::migration::{Migrator, MigratorTrait};
use naturescan_shared::types::{ScanId, UserId};
use rstest::rstest;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

/// Fresh migrated database. A single connection keeps the in-memory schema alive.
async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to sqlite");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

fn analysis(species: &str, confidence: Confidence) -> SpeciesAnalysis {
    SpeciesAnalysis {
        species: species.to_string(),
        common_name: "Test organism".to_string(),
        safe_to_eat: false,
        safe_to_touch: true,
        confidence,
        warnings: String::new(),
        description: "Seen in a test.".to_string(),
    }
}

/// Insert a row with a fixed id and timestamp.
async fn insert_raw(
    db: &DatabaseConnection,
    id: Uuid,
    owner: UserId,
    created_at: chrono::DateTime<Utc>,
) {
    scans::ActiveModel {
        id: Set(id),
        user_id: Set(owner.into_inner()),
        image_key: Set(format!("scans/{owner}/{id}.jpg")),
        species: Set("Quercus robur".to_string()),
        common_name: Set("English oak".to_string()),
        safe_to_eat: Set(false),
        safe_to_touch: Set(true),
        confidence: Set(ConfidenceLevel::High),
        warnings: Set(String::new()),
        description: Set("Deciduous tree.".to_string()),
        created_at: Set(created_at.into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert scan");
}

#[tokio::test]
async fn test_create_and_find() {
    let db = setup_db().await;
    let repo = ScanRepository::new(db);
    let owner = UserId::new();

    let created = repo
        .create(NewScan {
            user_id: owner,
            image_key: format!("scans/{owner}/1-leaf.jpg"),
            analysis: analysis("Urtica dioica", Confidence::Medium),
        })
        .await
        .expect("create");

    assert_eq!(created.user_id, owner);
    assert_eq!(created.id.into_inner().get_version_num(), 7);

    let found = repo
        .find_by_id(created.id)
        .await
        .expect("find")
        .expect("row exists");
    assert_eq!(found, created);
}

#[rstest]
#[case(Confidence::High)]
#[case(Confidence::Medium)]
#[case(Confidence::Low)]
#[tokio::test]
async fn test_confidence_round_trips(#[case] confidence: Confidence) {
    let db = setup_db().await;
    let repo = ScanRepository::new(db);

    let created = repo
        .create(NewScan {
            user_id: UserId::new(),
            image_key: "scans/a/1-x.jpg".to_string(),
            analysis: analysis("Bellis perennis", confidence),
        })
        .await
        .expect("create");

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.analysis.confidence, confidence);
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let db = setup_db().await;
    let repo = ScanRepository::new(db);

    assert!(repo.find_by_id(ScanId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_by_owner_newest_first() {
    let db = setup_db().await;
    let owner = UserId::new();
    let now = Utc::now().trunc_subsecs(6);

    let oldest = Uuid::now_v7();
    let newest = Uuid::now_v7();
    let middle = Uuid::now_v7();
    insert_raw(&db, oldest, owner, now - Duration::minutes(10)).await;
    insert_raw(&db, newest, owner, now).await;
    insert_raw(&db, middle, owner, now - Duration::minutes(5)).await;
    insert_raw(&db, Uuid::now_v7(), UserId::new(), now).await;

    let repo = ScanRepository::new(db);
    let ids: Vec<Uuid> = repo
        .list_by_owner(owner)
        .await
        .expect("list")
        .into_iter()
        .map(|scan| scan.id.into_inner())
        .collect();

    assert_eq!(ids, vec![newest, middle, oldest]);
}

#[tokio::test]
async fn test_list_ties_broken_by_id_desc() {
    let db = setup_db().await;
    let owner = UserId::new();
    let at = Utc::now().trunc_subsecs(6);

    let first = Uuid::now_v7();
    let second = Uuid::now_v7();
    insert_raw(&db, first, owner, at).await;
    insert_raw(&db, second, owner, at).await;

    let repo = ScanRepository::new(db);
    let ids: Vec<Uuid> = repo
        .list_by_owner(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|scan| scan.id.into_inner())
        .collect();

    assert_eq!(ids, vec![second, first]);
}

#[tokio::test]
async fn test_list_unknown_owner_is_empty() {
    let db = setup_db().await;
    let repo = ScanRepository::new(db);

    assert!(repo.list_by_owner(UserId::new()).await.unwrap().is_empty());
}
