use crate::collection::Document;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Predicate over `(id, body)` used by find, count and match stages.
#[derive(Clone)]
pub struct Filter {
    predicate: Arc<dyn Fn(&str, &Document) -> bool + Send + Sync>,
}

impl Filter {
    pub fn new(predicate: impl Fn(&str, &Document) -> bool + Send + Sync + 'static) -> Self {
        Filter {
            predicate: Arc::new(predicate),
        }
    }

    /// A filter that accepts every document.
    pub fn all() -> Self {
        Filter::new(|_, _| true)
    }

    #[inline]
    pub fn apply(&self, id: &str, body: &Document) -> bool {
        (self.predicate)(id, body)
    }
}

impl Debug for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Filter")
    }
}

/// Options for controlling find operations.
///
/// `skip` counts raw entries in insertion order whether or not they pass the
/// filter; `limit` counts only entries that pass it.
///
/// # Examples
///
/// ```rust
/// use folio::collection::{FindOptions, Filter};
///
/// let options = FindOptions::new()
///     .filter(Filter::new(|_, body| body.contains_key("email")))
///     .skip(10)
///     .limit(20);
/// ```
#[derive(Clone, Default, Debug)]
pub struct FindOptions {
    pub(crate) filter: Option<Filter>,
    pub(crate) skip: Option<usize>,
    pub(crate) limit: Option<usize>,
}

/// Creates `FindOptions` that skips a number of raw entries.
pub fn skip_by(skip: usize) -> FindOptions {
    FindOptions::new().skip(skip)
}

/// Creates `FindOptions` that limits the number of returned documents.
pub fn limit_to(limit: usize) -> FindOptions {
    FindOptions::new().limit(limit)
}

/// Creates `FindOptions` carrying only a filter.
pub fn filter_by(filter: Filter) -> FindOptions {
    FindOptions::new().filter(filter)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn filter(mut self, filter: Filter) -> FindOptions {
        self.filter = Some(filter);
        self
    }

    pub fn skip(mut self, skip: usize) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> FindOptions {
        self.limit = Some(limit);
        self
    }
}

/// What a count operation should count.
#[derive(Clone, Debug, Default)]
pub enum CountQuery {
    /// Every document of the collection.
    #[default]
    All,
    /// Documents that pass the filter.
    Filter(Filter),
    /// The filter carried by the options; skip and limit are ignored.
    Options(FindOptions),
}

impl CountQuery {
    pub(crate) fn into_filter(self) -> Option<Filter> {
        match self {
            CountQuery::All => None,
            CountQuery::Filter(filter) => Some(filter),
            CountQuery::Options(options) => options.filter,
        }
    }
}

impl From<Filter> for CountQuery {
    fn from(filter: Filter) -> Self {
        CountQuery::Filter(filter)
    }
}

impl From<FindOptions> for CountQuery {
    fn from(options: FindOptions) -> Self {
        CountQuery::Options(options)
    }
}
