use folio::collection::{CountQuery, FindOptions};
use folio::errors::ErrorKind;
use folio_int_test::test_util::{
    cleanup, create_test_context, create_test_context_with_cache, insert_test_documents, read_json,
    run_test,
};
use serde_json::json;

#[test]
fn test_drop_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;
            db.collection("notes")?.insert(json!({"text": "x"}))?;
            assert!(people.find_by_id(1)?.is_some());

            assert!(db.drop_collection("people")?);
            assert!(!db.drop_collection("people")?);

            assert_eq!(db.list_collection_names()?, vec!["notes"]);
            assert!(!ctx.path().join("people.json").exists());
            assert!(people.find_by_id(1)?.is_none());
            assert_eq!(people.count(CountQuery::All)?, 0);
            assert_eq!(read_json(&ctx, ".manifest.json")["collections"], json!(["notes"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_keeps_other_cached_collections() {
    run_test(
        || create_test_context_with_cache(10),
        |ctx| {
            let db = ctx.db();
            // "user" is a prefix of "users" and must survive dropping it
            db.collection("user")?.insert_with_id("1", json!({"v": "user"}))?;
            db.collection("users")?.insert_with_id("1", json!({"v": "users"}))?;
            assert_eq!(db.stats()?.cache_size, 2);

            db.drop_collection("users")?;
            assert_eq!(db.stats()?.cache_size, 1);
            assert_eq!(db.collection("user")?.find_by_id("1")?.unwrap()["v"], json!("user"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_clear_all() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db.collection("a")?)?;
            insert_test_documents(&db.collection("b")?)?;

            db.clear_all()?;

            assert!(db.list_collection_names()?.is_empty());
            assert_eq!(db.total_document_count()?, 0);
            assert_eq!(db.stats()?.cache_size, 0);
            assert!(!ctx.path().join("a.json").exists());
            assert!(!ctx.path().join("b.json").exists());
            assert_eq!(read_json(&ctx, ".manifest.json")["collections"], json!([]));

            // the store stays usable
            db.collection("a")?.insert(json!({"after": true}))?;
            assert_eq!(db.total_document_count()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_stats() {
    run_test(
        || create_test_context_with_cache(5),
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db.collection("people")?)?;
            db.collection("notes")?.insert(json!({"text": "x"}))?;

            let stats = db.stats()?;
            assert_eq!(stats.total_documents, 4);
            assert_eq!(stats.document_count("people"), Some(3));
            assert_eq!(stats.document_count("notes"), Some(1));
            assert_eq!(stats.document_count("missing"), None);
            let names: Vec<&str> = stats.collections.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["notes", "people"]);
            assert_eq!(stats.cache_capacity, 5);
            assert_eq!(stats.cache_size, 4);
            assert!(!stats.sync_writes);
            assert_eq!(stats.storage_path, ctx.path().display().to_string());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_closed_store_rejects_operations() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let people = db.collection("people")?;
            insert_test_documents(&people)?;

            db.close()?;
            assert!(db.is_closed());
            // closing again is a no-op
            db.close()?;

            let err = people.insert(json!({"late": true})).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            let err = people.find(FindOptions::new()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            let err = db.collection("people").err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            let err = db.list_collection_names().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);

            // data written before close is on disk
            let reopened = ctx.reopen()?;
            assert_eq!(reopened.collection("people")?.size()?, 3);
            reopened.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_close_writes_manifest() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db.collection("people")?)?;
            std::fs::remove_file(ctx.path().join(".manifest.json")).unwrap();

            db.close()?;
            assert_eq!(read_json(&ctx, ".manifest.json")["collections"], json!(["people"]));
            Ok(())
        },
        cleanup,
    )
}
