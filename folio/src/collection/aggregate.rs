use crate::collection::{group_key, resolve_field, Document, Filter};
use crate::common::{SortOrder, DOC_ID};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use indexmap::IndexMap;
use itertools::Itertools;
use serde_json::Value;
use std::cmp::Ordering;

/// One stage of an aggregation pipeline.
#[derive(Clone, Debug)]
pub enum AggregateStage {
    /// Keeps documents accepted by the filter, called with the document's
    /// `id` and the full document.
    Match(Filter),
    /// Stable sort by a dotted field path.
    Sort { field: String, order: SortOrder },
    Limit(usize),
    Skip(usize),
    /// Buckets documents by the string form of a dotted field path. Must be
    /// the last stage.
    Group { field: String },
}

impl AggregateStage {
    pub fn matching(filter: Filter) -> Self {
        AggregateStage::Match(filter)
    }

    pub fn sort(field: &str, order: SortOrder) -> Self {
        AggregateStage::Sort {
            field: field.to_string(),
            order,
        }
    }

    pub fn group(field: &str) -> Self {
        AggregateStage::Group {
            field: field.to_string(),
        }
    }
}

/// Result of an aggregation: a document list, or insertion-ordered groups
/// when the pipeline ends with a group stage.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateOutput {
    Documents(Vec<Document>),
    Groups(IndexMap<String, Vec<Document>>),
}

impl AggregateOutput {
    pub fn documents(&self) -> Option<&Vec<Document>> {
        match self {
            AggregateOutput::Documents(documents) => Some(documents),
            AggregateOutput::Groups(_) => None,
        }
    }

    pub fn groups(&self) -> Option<&IndexMap<String, Vec<Document>>> {
        match self {
            AggregateOutput::Documents(_) => None,
            AggregateOutput::Groups(groups) => Some(groups),
        }
    }
}

pub(crate) fn validate_pipeline(stages: &[AggregateStage]) -> FolioResult<()> {
    let last = stages.len().saturating_sub(1);
    for (index, stage) in stages.iter().enumerate() {
        if matches!(stage, AggregateStage::Group { .. }) && index != last {
            log::error!("Group stage at position {} is not the last stage", index);
            return Err(FolioError::new(
                "Group must be the last stage of an aggregation pipeline",
                ErrorKind::InvalidOperation,
            ));
        }
    }
    Ok(())
}

/// Runs a validated pipeline over `{id, ...body}` documents.
pub(crate) fn run_pipeline(
    mut documents: Vec<Document>,
    stages: &[AggregateStage],
) -> FolioResult<AggregateOutput> {
    validate_pipeline(stages)?;

    for stage in stages {
        documents = match stage {
            AggregateStage::Match(filter) => documents
                .into_iter()
                .filter(|document| filter.apply(&id_of(document), document))
                .collect(),
            AggregateStage::Sort { field, order } => documents
                .into_iter()
                .sorted_by(|a, b| {
                    order.apply(compare_values(resolve_field(a, field), resolve_field(b, field)))
                })
                .collect(),
            AggregateStage::Limit(n) => documents.into_iter().take(*n).collect(),
            AggregateStage::Skip(n) => documents.into_iter().skip(*n).collect(),
            AggregateStage::Group { field } => {
                let mut groups: IndexMap<String, Vec<Document>> = IndexMap::new();
                for document in documents {
                    let key = group_key(resolve_field(&document, field));
                    groups.entry(key).or_default().push(document);
                }
                return Ok(AggregateOutput::Groups(groups));
            }
        };
    }
    Ok(AggregateOutput::Documents(documents))
}

fn id_of(document: &Document) -> String {
    match document.get(DOC_ID) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Orders two field values. Only number/number, string/string and bool/bool
/// pairs compare; every other combination ties so the sort keeps input order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
