use folio::collection::{Document, FolioCollection};
use folio::errors::{ErrorKind, FolioError, FolioResult};
use folio::Folio;
use serde_json::{json, Value};
use std::backtrace::Backtrace;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Runs a test between a setup and a teardown step, retrying a failed
/// attempt a few times before panicking with the last error.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> FolioResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> FolioResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> FolioResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => match after(ctx.clone()) {
                        Ok(_) => Ok(()),
                        Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                    },
                    Err(e) => {
                        let _ = after(ctx.clone());
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = Some(Backtrace::capture().to_string());
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("{}", err_msg);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    db: Folio,
}

impl TestContext {
    pub fn new(path: PathBuf, db: Folio) -> Self {
        Self { path, db }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn db(&self) -> Folio {
        self.db.clone()
    }

    /// Opens a second, independent store over the same folder.
    pub fn reopen(&self) -> FolioResult<Folio> {
        Folio::builder()
            .storage_path(&self.path)
            .sync_writes(false)
            .open()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("folio-{}", id))
}

pub fn create_test_context() -> FolioResult<TestContext> {
    create_test_context_with_cache(100)
}

pub fn create_test_context_with_cache(cache_capacity: usize) -> FolioResult<TestContext> {
    let path = random_path();
    if path.exists() {
        let _ = fs::remove_dir_all(&path);
    }

    let db = Folio::builder()
        .storage_path(&path)
        .cache_capacity(cache_capacity)
        .sync_writes(false)
        .open()?;
    Ok(TestContext::new(path, db))
}

pub fn cleanup(ctx: TestContext) -> FolioResult<()> {
    ctx.db().close()?;
    if ctx.path().exists() {
        fs::remove_dir_all(ctx.path()).map_err(|e| {
            FolioError::new(
                &format!("Failed to remove test folder: {}", e),
                ErrorKind::IOError,
            )
        })?;
    }
    Ok(())
}

pub fn create_test_docs() -> Vec<Value> {
    vec![
        json!({
            "first_name": "fn1",
            "last_name": "ln1",
            "age": 31,
            "address": {"city": "Paris", "zip": "75001"},
            "tags": ["one", "two", "three"],
        }),
        json!({
            "first_name": "fn2",
            "last_name": "ln2",
            "age": 24,
            "address": {"city": "Berlin", "zip": "10115"},
            "tags": ["three", "four"],
        }),
        json!({
            "first_name": "fn3",
            "last_name": "ln2",
            "age": 45,
            "address": {"city": "Paris", "zip": "75002"},
            "tags": [],
        }),
    ]
}

/// Inserts the test documents under ids `1`, `2` and `3`.
pub fn insert_test_documents(collection: &FolioCollection) -> FolioResult<Vec<Document>> {
    create_test_docs()
        .into_iter()
        .enumerate()
        .map(|(index, body)| collection.insert_with_id(index + 1, body))
        .collect()
}

/// Reads a file under the store folder as JSON.
pub fn read_json(ctx: &TestContext, file_name: &str) -> Value {
    let content = fs::read_to_string(ctx.path().join(file_name)).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or(Value::Null)
}
