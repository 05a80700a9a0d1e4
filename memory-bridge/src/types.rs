//! Knowledge-graph payload types, serialized in the bridge's camelCase shape.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named node of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Unique entity name.
    pub name: String,
    /// Free-form entity kind ("instrument", "brand", ...).
    pub entity_type: String,
    /// Facts attached to the entity.
    #[serde(default)]
    pub observations: Vec<String>,
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation kind, in active voice ("manufactures").
    pub relation_type: String,
}

/// Observations to attach to an existing entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAddition {
    /// Entity receiving the observations.
    pub entity_name: String,
    /// Facts to add.
    pub contents: Vec<String>,
}

/// Observations to remove from an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDeletion {
    /// Entity losing the observations.
    pub entity_name: String,
    /// Facts to remove.
    pub observations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_is_camel_case() {
        let entity = Entity {
            name: "Fender".into(),
            entity_type: "brand".into(),
            observations: vec!["Fondée en 1946".into()],
        };
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({"name": "Fender", "entityType": "brand", "observations": ["Fondée en 1946"]})
        );

        let relation: Relation = serde_json::from_value(
            json!({"from": "Fender", "to": "Precision Bass", "relationType": "manufactures"}),
        )
        .unwrap();
        assert_eq!(relation.relation_type, "manufactures");

        let entity: Entity =
            serde_json::from_value(json!({"name": "Gibson", "entityType": "brand"})).unwrap();
        assert!(entity.observations.is_empty());
    }
}
