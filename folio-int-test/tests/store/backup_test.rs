use folio::collection::{Document, FindOptions};
use folio::errors::ErrorKind;
use folio_int_test::test_util::{
    cleanup, create_test_context, insert_test_documents, random_path, read_json, run_test,
};
use serde_json::json;
use std::fs;

fn ids(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_backup_writes_every_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db.collection("people")?)?;
            db.collection("notes")?.insert_with_id("n1", json!({"text": "hi"}))?;

            db.backup(ctx.path().join("backups").join("full.json"))?;

            let backup = read_json(&ctx, "backups/full.json");
            assert_eq!(backup["version"], json!("1.0"));
            assert!(backup["timestamp"].is_string());
            let names: Vec<&String> = backup["collections"].as_object().unwrap().keys().collect();
            assert_eq!(names, vec!["notes", "people"]);
            assert_eq!(backup["collections"]["notes"]["n1"], json!({"text": "hi"}));
            assert_eq!(backup["collections"]["people"]["2"]["age"], json!(24));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restore_replaces_store() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;
            let backup_path = ctx.path().join("backups").join("snapshot.json");
            db.backup(&backup_path)?;

            // diverge from the backup
            people.delete(1)?;
            people.update(2, json!({"first_name": "changed"}))?;
            db.collection("extra")?.insert(json!({"x": 1}))?;

            db.restore(&backup_path)?;

            assert_eq!(db.list_collection_names()?, vec!["people"]);
            assert_eq!(ids(&people.find(FindOptions::new())?), vec!["1", "2", "3"]);
            assert_eq!(people.find_by_id(2)?.unwrap()["first_name"], json!("fn2"));
            assert!(!ctx.path().join("extra.json").exists());
            assert_eq!(read_json(&ctx, ".manifest.json")["collections"], json!(["people"]));

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.total_document_count()?, 3);
            reopened.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restore_legacy_flat_backup() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.collection("old")?.insert(json!({"x": 1}))?;

            let backup_path = ctx.path().join("legacy-backup");
            fs::write(&backup_path, r#"{"a": {"v": 1}, "b": {"v": 2}}"#).unwrap();
            db.restore(&backup_path)?;

            assert_eq!(db.list_collection_names()?, vec!["_default"]);
            let default = db.collection("_default")?;
            assert_eq!(ids(&default.find(FindOptions::new())?), vec!["a", "b"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restore_skips_empty_collections() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let backup_path = ctx.path().join("backup-with-empty");
            fs::write(
                &backup_path,
                r#"{"version": "1.0", "timestamp": "t", "collections": {"empty": {}, "full": {"f": {}}}}"#,
            )
            .unwrap();

            db.restore(&backup_path)?;
            assert_eq!(db.list_collection_names()?, vec!["full"]);
            assert!(!ctx.path().join("empty.json").exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_corrupt_backup_leaves_store_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;

            let backup_path = ctx.path().join("broken-backup");
            fs::write(&backup_path, "{ not json").unwrap();
            let err = db.restore(&backup_path).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FileCorrupted);

            fs::write(&backup_path, "[1, 2]").unwrap();
            let err = db.restore(&backup_path).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FileCorrupted);

            fs::write(
                &backup_path,
                r#"{"version": "1.0", "timestamp": "t", "collections": {"bad/name": {"a": {}}}}"#,
            )
            .unwrap();
            let err = db.restore(&backup_path).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            assert_eq!(db.list_collection_names()?, vec!["people"]);
            assert_eq!(people.size()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restore_missing_backup_file() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let err = db.restore(ctx.path().join("nope.json")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FileNotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_backup_clear_restore_round_trip() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;
            db.collection("notes")?.insert_with_id("n1", json!({"text": "hi"}))?;
            let before = people.find(FindOptions::new())?;

            let backup_path = ctx.path().join("backups").join("round-trip.json");
            db.backup(&backup_path)?;
            db.clear_all()?;
            assert_eq!(db.total_document_count()?, 0);

            db.restore(&backup_path)?;
            assert_eq!(db.list_collection_names()?, vec!["notes", "people"]);
            assert_eq!(people.find(FindOptions::new())?, before);
            assert_eq!(read_json(&ctx, "notes.json"), json!({"n1": {"text": "hi"}}));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_restore_rolls_back() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;
            db.collection("notes")?.insert_with_id("n1", json!({"text": "hi"}))?;
            let before = people.find(FindOptions::new())?;
            // warm the cache with the pre-restore body
            assert_eq!(people.find_by_id(2)?.unwrap()["age"], json!(24));

            let backup_path = random_path().with_extension("json");
            fs::write(
                &backup_path,
                r#"{"version": "1.0", "timestamp": "t", "collections": {"people": {"2": {"age": 99}}}}"#,
            )
            .unwrap();

            // a plain file in place of the storage folder fails every write
            fs::remove_dir_all(ctx.path()).unwrap();
            fs::write(ctx.path(), "not a directory").unwrap();

            let err = db.restore(&backup_path).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IOError);

            assert_eq!(db.list_collection_names()?, vec!["notes", "people"]);
            assert_eq!(people.find(FindOptions::new())?, before);
            assert_eq!(people.find_by_id(2)?.unwrap()["age"], json!(24));
            assert_eq!(
                db.collection("notes")?.find_by_id("n1")?.unwrap()["text"],
                json!("hi")
            );

            fs::remove_file(ctx.path()).unwrap();
            fs::create_dir_all(ctx.path()).unwrap();
            fs::remove_file(&backup_path).unwrap();
            Ok(())
        },
        cleanup,
    )
}
