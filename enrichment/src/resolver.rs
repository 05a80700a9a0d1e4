//! Queries the collaborator for every unresolved field of a record.

use crate::client::{EnrichmentClient, PromptSet, QueryOutcome};
use crate::error::{EnrichmentError, Result};
use crate::record::{Field, Record};

/// Fills every unresolved field of `record` with a raw answer.
///
/// Fields are queried one at a time in a fixed order (description, price,
/// length, height, width, weight, technical specs, technical doc); resolved
/// fields are never re-queried. An absent answer leaves the field unresolved
/// so validation rejects it. The first failed query aborts the record with
/// [`EnrichmentError::Upstream`] and the remaining fields are not queried.
///
/// Returns the number of queries issued.
pub async fn resolve_missing(
    client: &dyn EnrichmentClient,
    prompts: &PromptSet,
    record: &mut Record,
) -> Result<usize> {
    let missing = record.missing_fields();
    let mut issued = 0;

    for field in missing {
        if field == Field::Length {
            tracing::info!(name = record.name(), "Searching dimensions");
        } else if !Field::AXES.contains(&field) {
            tracing::info!(name = record.name(), %field, "Searching field");
        }

        let outcome = client.query(prompts.for_field(field), record.name()).await;
        issued += 1;

        match outcome {
            QueryOutcome::Answer(answer) => record.set_raw(field, Some(answer)),
            QueryOutcome::Absent => {
                tracing::warn!(name = record.name(), %field, "No answer returned");
                record.set_raw(field, None);
            }
            QueryOutcome::Failed => {
                return Err(EnrichmentError::Upstream {
                    name: record.name().to_string(),
                    field,
                });
            }
        }
    }

    Ok(issued)
}
