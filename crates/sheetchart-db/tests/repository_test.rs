mod helpers;

use helpers::{new_chart, new_file, setup_test_db, tick};
use sheetchart_core::models::{FileStatus, ProcessedData, ProcessedMetadata, StatusUpdate};
use sheetchart_db::{ChartStore, FileStore};
use uuid::Uuid;

fn processed() -> ProcessedData {
    ProcessedData {
        headers: vec!["Month".into(), "Revenue".into()],
        row_count: 2,
        sheets: vec![],
        data_preview: vec![],
        metadata: ProcessedMetadata {
            has_headers: true,
            encoding: Some("UTF-8".into()),
            created_date: None,
            modified_date: None,
        },
    }
}

#[tokio::test]
async fn test_status_guard_only_moves_forward() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let file = db.files.create_file(new_file(owner, "guard")).await.unwrap();
    assert_eq!(file.status, FileStatus::Uploading);

    // uploading cannot jump straight to completed
    let skipped = db
        .files
        .transition_status(owner, file.id, StatusUpdate::completed(processed()))
        .await
        .unwrap();
    assert!(skipped.is_none());

    // another owner cannot move the file
    let foreign = db
        .files
        .transition_status(Uuid::new_v4(), file.id, StatusUpdate::to(FileStatus::Processing))
        .await
        .unwrap();
    assert!(foreign.is_none());

    let processing = db
        .files
        .transition_status(owner, file.id, StatusUpdate::to(FileStatus::Processing))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processing.status, FileStatus::Processing);

    let completed = db
        .files
        .transition_status(owner, file.id, StatusUpdate::completed(processed()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, FileStatus::Completed);
    assert_eq!(completed.processed_data.as_ref().unwrap().row_count, 2);
    assert!(completed.processing_error.is_none());

    // terminal: no second run, no regression
    for update in [
        StatusUpdate::to(FileStatus::Processing),
        StatusUpdate::failed("late"),
        StatusUpdate::to(FileStatus::Uploading),
    ] {
        assert!(db
            .files
            .transition_status(owner, file.id, update)
            .await
            .unwrap()
            .is_none());
    }

    let stored = db.files.get_file(owner, file.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FileStatus::Completed);
    assert_eq!(stored.processed_data.unwrap().headers, vec!["Month", "Revenue"]);
}

#[tokio::test]
async fn test_failed_processing_records_reason() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let file = db.files.create_file(new_file(owner, "broken")).await.unwrap();

    db.files
        .transition_status(owner, file.id, StatusUpdate::to(FileStatus::Processing))
        .await
        .unwrap()
        .unwrap();
    let failed = db
        .files
        .transition_status(owner, file.id, StatusUpdate::failed("Processing failed"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(failed.status, FileStatus::Error);
    assert_eq!(failed.processing_error.as_deref(), Some("Processing failed"));
    assert!(failed.processed_data.is_none());
}

#[tokio::test]
async fn test_files_are_listed_newest_first_per_owner() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let first = db.files.create_file(new_file(owner, "first")).await.unwrap();
    tick().await;
    let second = db.files.create_file(new_file(owner, "second")).await.unwrap();
    tick().await;
    db.files.create_file(new_file(other, "other")).await.unwrap();

    let ids: Vec<Uuid> = db
        .files
        .list_files(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert!(db.files.get_file(other, first.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_files_by_ids_skips_missing_and_foreign() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let mine = db.files.create_file(new_file(owner, "mine")).await.unwrap();
    let theirs = db.files.create_file(new_file(other, "theirs")).await.unwrap();

    let found = db
        .files
        .get_files_by_ids(owner, &[mine.id, theirs.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, mine.id);

    assert!(db.files.get_files_by_ids(owner, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_download_increments_counter() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let file = db.files.create_file(new_file(owner, "download")).await.unwrap();
    assert_eq!(file.download_count, 0);
    assert!(file.last_accessed.is_none());

    assert!(db.files.record_download(owner, file.id).await.unwrap());
    assert!(db.files.record_download(owner, file.id).await.unwrap());
    assert!(!db.files.record_download(Uuid::new_v4(), file.id).await.unwrap());
    assert!(!db.files.record_download(owner, Uuid::new_v4()).await.unwrap());

    let stored = db.files.get_file(owner, file.id).await.unwrap().unwrap();
    assert_eq!(stored.download_count, 2);
    assert!(stored.last_accessed.is_some());
}

#[tokio::test]
async fn test_autogenerated_chart_conflict_is_skipped() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let file = db.files.create_file(new_file(owner, "auto")).await.unwrap();

    let first = db
        .charts
        .insert_autogenerated(new_chart(owner, file.id, "auto", true))
        .await
        .unwrap();
    assert!(first.as_ref().is_some_and(|c| c.auto_generated));

    let again = db
        .charts
        .insert_autogenerated(new_chart(owner, file.id, "auto again", true))
        .await
        .unwrap();
    assert!(again.is_none());

    // a different owner of the same source id is a separate slot
    let other = db
        .charts
        .insert_autogenerated(new_chart(Uuid::new_v4(), file.id, "auto", true))
        .await
        .unwrap();
    assert!(other.is_some());

    // manual charts are not limited
    db.charts
        .create_chart(new_chart(owner, file.id, "manual", false))
        .await
        .unwrap();
    db.charts
        .create_chart(new_chart(owner, file.id, "manual", false))
        .await
        .unwrap();

    assert!(db.charts.exists_for_file(owner, file.id).await.unwrap());
    assert!(!db.charts.exists_for_file(owner, Uuid::new_v4()).await.unwrap());
    assert_eq!(db.charts.list_charts(owner).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_charts_newest_first_and_views_counted() {
    let db = setup_test_db().await;
    let owner = Uuid::new_v4();
    let source = Uuid::new_v4();

    let older = db
        .charts
        .create_chart(new_chart(owner, source, "older", false))
        .await
        .unwrap();
    tick().await;
    let newer = db
        .charts
        .create_chart(new_chart(owner, source, "newer", false))
        .await
        .unwrap();
    assert_eq!(newer.config.x_axis.field, "Month");
    assert_eq!(newer.tags, vec!["sales"]);

    let titles: Vec<String> = db
        .charts
        .list_charts(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.title)
        .collect();
    assert_eq!(titles, vec!["newer", "older"]);

    let viewed = db.charts.record_view(owner, older.id).await.unwrap().unwrap();
    assert_eq!(viewed.view_count, 1);
    assert!(viewed.last_viewed.is_some());
    assert!(db
        .charts
        .record_view(Uuid::new_v4(), older.id)
        .await
        .unwrap()
        .is_none());
}
