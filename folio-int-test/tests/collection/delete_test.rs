use folio::collection::{CountQuery, Document, FindOptions};
use folio_int_test::test_util::{
    cleanup, create_test_context, insert_test_documents, read_json, run_test,
};
use serde_json::json;

fn ids(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_delete() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert!(collection.delete(2)?);
            assert!(collection.find_by_id(2)?.is_none());
            assert_eq!(ids(&collection.find(FindOptions::new())?), vec!["1", "3"]);

            let file = read_json(&ctx, "test.json");
            assert!(file.get("2").is_none());
            assert_eq!(file.as_object().unwrap().len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_missing_document() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert!(!collection.delete("404")?);
            assert_eq!(collection.count(CountQuery::All)?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_evicts_cached_body() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert!(collection.find_by_id(1)?.is_some());
            collection.delete(1)?;
            assert!(collection.find_by_id(1)?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_deleting_last_document_removes_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            let other = db.collection("other")?;
            insert_test_documents(&collection)?;
            other.insert(json!({"keep": true}))?;

            for id in 1..=3 {
                assert!(collection.delete(id)?);
            }

            assert!(!db.has_collection("test")?);
            assert_eq!(db.list_collection_names()?, vec!["other"]);
            assert!(!ctx.path().join("test.json").exists());
            assert_eq!(read_json(&ctx, ".manifest.json")["collections"], json!(["other"]));

            // the handle keeps working after its collection went away
            collection.insert_with_id("again", json!({"v": 1}))?;
            assert!(db.has_collection("test")?);
            assert_eq!(db.list_collection_names()?, vec!["other", "test"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_then_reinsert_appends() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            collection.delete(1)?;
            collection.insert_with_id(1, json!({"back": true}))?;
            assert_eq!(ids(&collection.find(FindOptions::new())?), vec!["2", "3", "1"]);
            Ok(())
        },
        cleanup,
    )
}
