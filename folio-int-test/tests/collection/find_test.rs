use folio::collection::{filter_by, limit_to, skip_by, CountQuery, Document, Filter, FindOptions};
use folio_int_test::test_util::{
    cleanup, create_test_context, create_test_context_with_cache, insert_test_documents, run_test,
};
use serde_json::json;

fn ids(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

fn lives_in(city: &'static str) -> Filter {
    Filter::new(move |_, body| body["address"]["city"] == json!(city))
}

#[test]
fn test_find_all() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let documents = collection.find(FindOptions::new())?;
            assert_eq!(ids(&documents), vec!["1", "2", "3"]);
            assert_eq!(documents[0]["tags"], json!(["one", "two", "three"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_filter() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let documents = collection.find(filter_by(lives_in("Paris")))?;
            assert_eq!(ids(&documents), vec!["1", "3"]);

            let older = Filter::new(|_, body| body["age"].as_i64().unwrap_or(0) > 30);
            assert_eq!(ids(&collection.find(filter_by(older))?), vec!["1", "3"]);

            let by_id = Filter::new(|id, _| id == "2");
            assert_eq!(ids(&collection.find(filter_by(by_id))?), vec!["2"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_skip_is_applied_before_filter() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            // "1" is skipped as a raw entry even though it matches
            let documents = collection.find(filter_by(lives_in("Paris")).skip(1))?;
            assert_eq!(ids(&documents), vec!["3"]);

            let documents = collection.find(filter_by(lives_in("Paris")).skip(3))?;
            assert!(documents.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_limit_counts_matches() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_eq!(ids(&collection.find(limit_to(2))?), vec!["1", "2"]);
            assert_eq!(ids(&collection.find(skip_by(1).limit(1))?), vec!["2"]);
            assert_eq!(
                ids(&collection.find(filter_by(lives_in("Paris")).limit(1))?),
                vec!["1"]
            );
            assert!(collection.find(limit_to(0))?.is_empty());
            assert_eq!(collection.find(limit_to(10))?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let document = collection.find_one(lives_in("Berlin"))?.unwrap();
            assert_eq!(document["id"], json!("2"));
            assert!(collection.find_one(lives_in("Rome"))?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_by_id() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let document = collection.find_by_id(2)?.unwrap();
            let keys: Vec<&String> = document.keys().collect();
            assert_eq!(
                keys,
                vec!["id", "first_name", "last_name", "age", "address", "tags"]
            );
            assert_eq!(document["first_name"], json!("fn2"));
            assert!(collection.find_by_id("4")?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_by_id_without_cache() {
    run_test(
        || create_test_context_with_cache(0),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_eq!(collection.find_by_id("3")?.unwrap()["age"], json!(45));
            assert_eq!(ctx.db().stats()?.cache_size, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cache_evicts_oldest_entry() {
    run_test(
        || create_test_context_with_cache(2),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let stats = ctx.db().stats()?;
            assert_eq!(stats.cache_size, 2);
            assert_eq!(stats.cache_capacity, 2);

            // evicted entries are still served from memory
            assert_eq!(collection.find_by_id("1")?.unwrap()["first_name"], json!("fn1"));
            assert_eq!(ctx.db().stats()?.cache_size, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_count() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            assert_eq!(collection.count(CountQuery::All)?, 0);

            insert_test_documents(&collection)?;
            assert_eq!(collection.count(CountQuery::All)?, 3);
            assert_eq!(collection.count(lives_in("Paris"))?, 2);
            // skip and limit do not apply to counts
            assert_eq!(collection.count(filter_by(lives_in("Paris")).skip(2).limit(1))?, 2);
            assert_eq!(collection.size()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_stream() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let names: Vec<String> = collection
                .stream()?
                .map(|d| d["last_name"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(names, vec!["ln1", "ln2", "ln2"]);

            let first_two: Vec<Document> = collection.stream()?.take(2).collect();
            assert_eq!(ids(&first_two), vec!["1", "2"]);

            let empty = ctx.db().collection("empty")?;
            assert_eq!(empty.stream()?.count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reads_do_not_create_collections() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("nothing")?;
            assert!(collection.find(FindOptions::new())?.is_empty());
            assert!(collection.find_by_id("x")?.is_none());
            assert_eq!(collection.count(CountQuery::All)?, 0);

            assert!(!ctx.db().has_collection("nothing")?);
            assert!(ctx.db().list_collection_names()?.is_empty());
            assert!(!ctx.path().join("nothing.json").exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_skip_and_limit_with_filter() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("numbers")?;
            for i in 0..5 {
                collection.insert_with_id(i, json!({"index": i}))?;
            }

            let odd = Filter::new(|_, body| body["index"].as_i64().unwrap_or(0) % 2 == 1);
            let documents = collection.find(filter_by(odd).skip(2).limit(1))?;
            assert_eq!(ids(&documents), vec!["3"]);
            Ok(())
        },
        cleanup,
    )
}
