//! Boundary with the enrichment query collaborator.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::record::Field;

/// Literal answer the query collaborator uses to signal an upstream failure.
pub const FAILURE_SENTINEL: &str = "Error";

/// Result of one enrichment query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Free-text answer from the model.
    Answer(String),
    /// Upstream API failure; fatal for the current record cycle.
    Failed,
    /// Invalid request or empty reply; the field stays unresolved.
    Absent,
}

impl QueryOutcome {
    /// Maps a raw reply onto an outcome, recognizing the failure sentinel.
    #[must_use]
    pub fn from_reply(reply: Option<String>) -> Self {
        match reply {
            Some(text) if text == FAILURE_SENTINEL => Self::Failed,
            Some(text) if text.trim().is_empty() => Self::Absent,
            Some(text) => Self::Answer(text),
            None => Self::Absent,
        }
    }
}

/// Answers one research prompt about one subject.
///
/// Implementations may rate-limit or retry internally; the pipeline awaits
/// each query before issuing the next one.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Queries the collaborator with a task prompt and a subject name.
    async fn query(&self, prompt: &str, subject: &str) -> QueryOutcome;
}

#[async_trait]
impl<T: EnrichmentClient + ?Sized> EnrichmentClient for Arc<T> {
    async fn query(&self, prompt: &str, subject: &str) -> QueryOutcome {
        (**self).query(prompt, subject).await
    }
}

/// Field-specific research prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    /// Prompt for the product description.
    pub description: String,
    /// Prompt for the price.
    pub price: String,
    /// Prompts for length, height, width and weight.
    pub dimensions: [String; 4],
    /// Prompt for the technical specification.
    pub technical: String,
    /// Prompt for the documentation URL.
    pub documentation: String,
}

impl PromptSet {
    /// Loads the prompt files from `dir`.
    ///
    /// Expected files: `prompt-description.md`, `prompt-price.md`,
    /// `prompt-longueur.md`, `prompt-hauteur.md`, `prompt-largeur.md`,
    /// `prompt-poids.md`, `prompt-technical.md`, `prompt-documentation.md`.
    /// A missing file is logged and leaves that prompt empty.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let read = |name: &str| fetch_prompt(&dir.join(name));
        Self {
            description: read("prompt-description.md"),
            price: read("prompt-price.md"),
            dimensions: [
                read("prompt-longueur.md"),
                read("prompt-hauteur.md"),
                read("prompt-largeur.md"),
                read("prompt-poids.md"),
            ],
            technical: read("prompt-technical.md"),
            documentation: read("prompt-documentation.md"),
        }
    }

    /// Prompt used to query `field`.
    #[must_use]
    pub fn for_field(&self, field: Field) -> &str {
        match field {
            Field::Description => &self.description,
            Field::Price => &self.price,
            Field::Length => &self.dimensions[0],
            Field::Height => &self.dimensions[1],
            Field::Width => &self.dimensions[2],
            Field::Weight => &self.dimensions[3],
            Field::TechnicalSpecs => &self.technical,
            Field::TechnicalDoc => &self.documentation,
        }
    }
}

/// Reads a prompt file, logging and returning an empty prompt on failure.
#[must_use]
pub fn fetch_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(prompt) => prompt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(path = %path.display(), "Prompt file not found");
            String::new()
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read prompt file");
            String::new()
        }
    }
}
