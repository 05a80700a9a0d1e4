//! Memory tools exposed to the research agent.
//!
//! [`MemoryToolbox::definitions`] produces the function-calling definitions
//! sent with each chat request; [`MemoryToolbox::execute`] runs a tool call
//! returned by the model against a [`KnowledgeGraph`]. Execution never fails:
//! errors are reported back to the model as `Error: ...` strings.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::client::KnowledgeGraph;
use crate::error::MemoryError;
use crate::types::{Entity, ObservationAddition, ObservationDeletion, Relation};

/// Arguments of `create_entities`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateEntitiesArgs {
    /// Entities to create.
    pub entities: Vec<Entity>,
}

/// Arguments of `delete_entities`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntitiesArgs {
    /// Names of the entities to delete.
    pub entity_names: Vec<String>,
}

/// Arguments of `create_relations` and `delete_relations`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RelationsArgs {
    /// Relations to create or delete.
    pub relations: Vec<Relation>,
}

/// Arguments of `add_observations`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddObservationsArgs {
    /// Observations to add, grouped by entity.
    pub observations: Vec<ObservationAddition>,
}

/// Arguments of `delete_observations`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteObservationsArgs {
    /// Observations to remove, grouped by entity.
    pub deletions: Vec<ObservationDeletion>,
}

/// Arguments of `search_nodes`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchNodesArgs {
    /// Text matched against names, types and observations.
    pub query: String,
}

/// Arguments of `open_nodes`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenNodesArgs {
    /// Names of the entities to fetch.
    pub names: Vec<String>,
}

/// Arguments of tools that take none.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Function-calling definition of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Tool name the model calls.
    pub name: &'static str,
    /// What the tool does.
    pub description: &'static str,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    fn of<T: JsonSchema>(name: &'static str, description: &'static str) -> Self {
        let mut parameters =
            serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({}));
        if let Some(schema) = parameters.as_object_mut() {
            schema.remove("$schema");
            schema.remove("title");
        }
        Self {
            name,
            description,
            parameters,
        }
    }

    /// Chat-completions `tools` entry.
    #[must_use]
    pub fn to_openai_format(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

#[derive(Debug, Error)]
enum ToolError {
    #[error("Unknown tool '{0}'")]
    Unknown(String),
    #[error("Invalid arguments for '{tool}': {message}")]
    Arguments { tool: String, message: String },
    #[error("Failed executing tool '{tool}': {source}")]
    Graph { tool: String, source: MemoryError },
}

/// Memory tools bound to a knowledge graph.
#[derive(Debug, Clone)]
pub struct MemoryToolbox<G> {
    graph: G,
}

impl<G: KnowledgeGraph> MemoryToolbox<G> {
    /// Binds the tools to `graph`.
    #[must_use]
    pub const fn new(graph: G) -> Self {
        Self { graph }
    }

    /// Definitions of the tools offered to the model.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::of::<CreateEntitiesArgs>(
                "create_entities",
                "Create multiple new entities in the knowledge graph. Ignores entities with existing names.",
            ),
            ToolDefinition::of::<RelationsArgs>(
                "create_relations",
                "Create multiple new relations between entities. Skips duplicate relations.",
            ),
            ToolDefinition::of::<AddObservationsArgs>(
                "add_observations",
                "Add new observations to existing entities. Fails if entity doesn't exist.",
            ),
            ToolDefinition::of::<DeleteEntitiesArgs>(
                "delete_entities",
                "Remove entities and their relations. Silent if entity doesn't exist.",
            ),
            ToolDefinition::of::<DeleteObservationsArgs>(
                "delete_observations",
                "Remove specific observations from entities. Silent if observation doesn't exist.",
            ),
            ToolDefinition::of::<RelationsArgs>(
                "delete_relations",
                "Remove specific relations from the graph. Silent if relation doesn't exist.",
            ),
            ToolDefinition::of::<NoArgs>(
                "read_graph",
                "Read the entire knowledge graph, including all entities and relations.",
            ),
            ToolDefinition::of::<SearchNodesArgs>(
                "search_nodes",
                "Search for nodes based on query across names, types, and observation content.",
            ),
            ToolDefinition::of::<OpenNodesArgs>(
                "open_nodes",
                "Retrieve specific nodes by name. Silently skips non-existent nodes.",
            ),
        ]
    }

    /// Runs tool `name` with JSON `arguments` and renders the result for the model.
    ///
    /// Returns the bridge answer as JSON text, or an `Error: ...` message.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        match self.dispatch(name, arguments).await {
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "Memory tool failed");
                format!("Error: {err}")
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolError> {
        let graph = &self.graph;
        let result = match name {
            "create_entities" => {
                let args: CreateEntitiesArgs = parse(name, arguments)?;
                graph.create_entities(&args.entities).await
            }
            "delete_entities" => {
                let args: DeleteEntitiesArgs = parse(name, arguments)?;
                graph.delete_entities(&args.entity_names).await
            }
            "create_relations" => {
                let args: RelationsArgs = parse(name, arguments)?;
                graph.create_relations(&args.relations).await
            }
            "delete_relations" => {
                let args: RelationsArgs = parse(name, arguments)?;
                graph.delete_relations(&args.relations).await
            }
            "add_observations" => {
                let args: AddObservationsArgs = parse(name, arguments)?;
                graph.add_observations(&args.observations).await
            }
            "delete_observations" => {
                let args: DeleteObservationsArgs = parse(name, arguments)?;
                graph.delete_observations(&args.deletions).await
            }
            "read_graph" => graph.read_graph().await,
            "search_nodes" => {
                let args: SearchNodesArgs = parse(name, arguments)?;
                graph.search_nodes(&args.query).await
            }
            "open_nodes" => {
                let args: OpenNodesArgs = parse(name, arguments)?;
                graph.open_nodes(&args.names).await
            }
            "status" => graph.status().await,
            "health" => graph.health().await,
            // `reset` is operator-only and never dispatched from a model reply.
            other => return Err(ToolError::Unknown(other.to_string())),
        };

        result.map_err(|source| ToolError::Graph {
            tool: name.to_string(),
            source,
        })
    }
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, ToolError> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| ToolError::Arguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}
