mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{regional_table, session, store_in};
use tempfile::tempdir;
use workplan_tracker::TrackerError;
use workplan_tracker::actions;
use workplan_tracker::filter::TaskFilter;
use workplan_tracker::io::edits;
use workplan_tracker::model::{Region, Status};
use workplan_tracker::reconcile::{self, TaskEdit};
use workplan_tracker::store::TrackerStore;
use workplan_tracker::update::{ProgressPolicy, StatusUpdate};

fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, 1)
        .unwrap()
        .and_hms_opt(14, 5, 9)
        .unwrap()
}

#[test]
fn unchanged_edits_do_not_save() {
    let dir = tempdir().expect("temporary directory");
    let store = store_in(dir.path());
    let mut table = regional_table();
    store.save(&table).expect("tracker saved");

    let task_edits: Vec<TaskEdit> = table.tasks.iter().map(TaskEdit::from_task).collect();
    let change_set = reconcile::reconcile(&store, &mut table, &task_edits, &session(), timestamp())
        .expect("reconciled");

    assert!(change_set.is_empty());
    assert!(!store.backup_dir().exists());
    assert_eq!(table, regional_table());
}

#[test]
fn comment_change_is_persisted_with_audit_fields() {
    let dir = tempdir().expect("temporary directory");
    let store = store_in(dir.path());
    let mut table = regional_table();
    store.save(&table).expect("tracker saved");

    let mut edit = TaskEdit::from_task(&table.tasks[2]);
    edit.comments = "waiting on test kits".into();
    let change_set = reconcile::reconcile(&store, &mut table, &[edit], &session(), timestamp())
        .expect("reconciled");
    assert_eq!(change_set.len(), 1);
    assert_eq!(store.list_backups().expect("backups listed").len(), 1);

    let original = regional_table();
    let reloaded = store.load().expect("tracker loaded").expect("tracker present");
    assert_eq!(reloaded.tasks[0], original.tasks[0]);
    assert_eq!(reloaded.tasks[1], original.tasks[1]);

    let changed = &reloaded.tasks[2];
    assert_eq!(changed.comments, "waiting on test kits");
    assert_eq!(changed.status, original.tasks[2].status);
    assert_eq!(changed.last_modified_by, "si.manager@example.org");
    assert_eq!(changed.last_modified_date, Some(timestamp()));
}

#[test]
fn exported_view_round_trips_through_apply() {
    let dir = tempdir().expect("temporary directory");
    let store = store_in(dir.path());
    store.save(&regional_table()).expect("tracker saved");

    let view_path = dir.path().join("north.json");
    let filter = TaskFilter {
        region: Some(Region::North),
        ..TaskFilter::default()
    };
    let view = actions::export_view(&store, &filter, &view_path).expect("view exported");
    assert_eq!(view.len(), 1);

    let mut task_edits = edits::read_edits(&view_path).expect("edits read");
    task_edits[0].status = Status::InProgress;
    task_edits[0].progress = 35;
    task_edits.push(TaskEdit {
        id: 77,
        status: Status::Delayed,
        progress: 0,
        comments: String::new(),
    });
    std::fs::write(
        &view_path,
        serde_json::to_string_pretty(&task_edits).expect("edits serialised"),
    )
    .expect("edits written");

    let change_set =
        actions::apply_edit_file(&store, &view_path, &session()).expect("edits applied");
    assert_eq!(change_set.len(), 1);
    assert_eq!(change_set.unmatched, vec![77]);

    let reloaded = actions::load_tracker(&store).expect("tracker loaded");
    let north = reloaded.get(1).expect("north task");
    assert_eq!(north.status, Status::InProgress);
    assert_eq!(north.progress, 35);
    assert_eq!(north.last_modified_by, "si.manager@example.org");
}

#[test]
fn single_task_update_appends_comment_and_pins_progress() {
    let dir = tempdir().expect("temporary directory");
    let store = store_in(dir.path());
    let mut table = regional_table();
    table.tasks[0].comments = "training done".into();
    store.save(&table).expect("tracker saved");

    let status_update = StatusUpdate {
        id: 1,
        status: Status::Completed,
        comment: Some("report filed".into()),
        progress: None,
    };
    let change_set = actions::update_task(
        &store,
        &status_update,
        ProgressPolicy::SyncWithStatus,
        &session(),
    )
    .expect("task updated");
    assert_eq!(change_set.len(), 1);

    let reloaded = actions::load_tracker(&store).expect("tracker loaded");
    let task = reloaded.get(1).expect("task 1");
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.comments, "training done | report filed");
}

#[test]
fn single_task_update_rejects_unknown_id() {
    let dir = tempdir().expect("temporary directory");
    let store = store_in(dir.path());
    store.save(&regional_table()).expect("tracker saved");

    let status_update = StatusUpdate {
        id: 404,
        status: Status::Completed,
        comment: None,
        progress: None,
    };
    let result = actions::update_task(&store, &status_update, ProgressPolicy::Keep, &session());

    assert!(matches!(result, Err(TrackerError::TaskNotFound(404))));
    assert!(!store.backup_dir().exists());
}

#[test]
fn failed_write_keeps_changes_in_memory() {
    let dir = tempdir().expect("temporary directory");
    let store = TrackerStore::new(
        dir.path().join("missing").join("tracker.xlsx"),
        common::TRACKER_SHEET,
        dir.path().join("backups"),
        10,
    );
    let mut table = regional_table();

    let mut edit = TaskEdit::from_task(&table.tasks[0]);
    edit.comments = "field visit booked".into();
    let result = reconcile::reconcile(&store, &mut table, &[edit], &session(), timestamp());

    assert!(matches!(result, Err(TrackerError::ExcelWrite(_))));
    assert!(!store.tracker_file().exists());
    assert_eq!(table.tasks[0].comments, "field visit booked");
    assert_eq!(table.tasks[0].last_modified_by, "si.manager@example.org");
    assert_eq!(table.tasks[0].last_modified_date, Some(timestamp()));
}
