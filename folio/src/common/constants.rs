// store layout constants
pub const MANIFEST_FILE: &str = ".manifest.json";
pub const COLLECTION_FILE_EXTENSION: &str = "json";
pub const TEMP_FILE_SUFFIX: &str = "tmp";
pub const STORE_FORMAT_VERSION: &str = "1.0";

// collection constants
pub const DEFAULT_COLLECTION: &str = "_default";
pub const DOC_ID: &str = "id";
pub const CACHE_KEY_SEPARATOR: &str = ":";
pub const FIELD_SEPARATOR: &str = ".";
pub const UNDEFINED_GROUP: &str = "undefined";

// configuration defaults
pub const DEFAULT_STORAGE_PATH: &str = "./data";
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

// event constants
pub const FOLIO_EVENT: &str = "folio_event";
