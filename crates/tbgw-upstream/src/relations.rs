//! Entity relation graph traversal.
//!
//! Breadth-first crawl over the upstream's relation endpoints, producing
//! nodes and edges suitable for graph rendering. The walk is bounded by a
//! relation depth and a hard node limit.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::UpstreamClient;
use crate::error::UpstreamResult;

/// Direction of relations to follow from each visited node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationDirection {
    From,
    To,
    Both,
}

impl RelationDirection {
    /// Query value understood by the upstream relations endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationDirection::From => "FROM",
            RelationDirection::To => "TO",
            RelationDirection::Both => "BOTH",
        }
    }
}

/// Parameters for a relation graph walk.
#[derive(Debug, Clone)]
pub struct GraphQuery {
    /// Entity the walk starts from.
    pub root_id: String,
    /// Entity type of the root (upstream spelling, e.g. `DEVICE`).
    pub root_type: String,
    /// Relations are not expanded beyond this depth; the root is depth 0.
    pub max_depth: u32,
    pub direction: RelationDirection,
    /// Keep only nodes of these entity types (upstream spelling); edges
    /// with a dropped endpoint are removed with them.
    pub allowed_types: Option<BTreeSet<String>>,
    /// The walk never visits more nodes than this.
    pub node_limit: usize,
}

impl GraphQuery {
    /// Walk from a device root with the standard bounds.
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            root_type: "DEVICE".to_string(),
            max_depth: 2,
            direction: RelationDirection::Both,
            allowed_types: None,
            node_limit: 500,
        }
    }
}

/// A visited entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub depth: u32,
}

/// A directed relation between two visited entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub relation_type: Option<String>,
}

/// Result of a relation walk, nodes in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGraph {
    pub root: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub depth: u32,
}

#[derive(Deserialize)]
struct RelationInfo {
    #[serde(rename = "toId")]
    to: Option<EntityRef>,
    #[serde(rename = "type")]
    relation_type: Option<String>,
}

#[derive(Deserialize)]
struct EntityRef {
    id: Option<String>,
    #[serde(rename = "entityType")]
    entity_type: Option<String>,
}

/// Breadth-first walker over the upstream relation endpoints.
pub struct RelationWalker {
    client: UpstreamClient,
}

impl RelationWalker {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Crawl relations breadth-first from the query's root.
    ///
    /// One `entityInfo` call per visited node resolves its display name; a
    /// node whose info cannot be fetched is kept with the name `unknown`.
    /// A failing relations lookup aborts the walk.
    pub async fn walk(&self, query: &GraphQuery) -> UpstreamResult<EntityGraph> {
        let mut queue: VecDeque<(String, String, u32)> = VecDeque::new();
        queue.push_back((query.root_id.clone(), query.root_type.clone(), 0));

        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();

        while let Some((entity_id, entity_type, depth)) = queue.pop_front() {
            if nodes.len() >= query.node_limit {
                break;
            }
            if !visited.insert(entity_id.clone()) {
                continue;
            }

            let name = self.entity_name(&entity_id).await;
            nodes.push(GraphNode {
                id: entity_id.clone(),
                entity_type: entity_type.clone(),
                name,
                depth,
            });

            if depth >= query.max_depth {
                continue;
            }

            let params = vec![
                ("fromId", entity_id.clone()),
                ("fromType", entity_type),
                ("direction", query.direction.as_str().to_string()),
            ];
            let body = self.client.get_json("/api/relations/info", &params).await?;
            let relations: Vec<RelationInfo> = serde_json::from_value(body)?;

            for rel in relations {
                let Some(to) = rel.to else { continue };
                let (Some(to_id), Some(to_type)) = (to.id, to.entity_type) else {
                    continue;
                };

                edges.push(GraphEdge {
                    from: entity_id.clone(),
                    to: to_id.clone(),
                    relation_type: rel.relation_type,
                });

                if nodes.len() + queue.len() >= query.node_limit {
                    continue;
                }
                queue.push_back((to_id, to_type, depth + 1));
            }
        }

        if let Some(allowed) = &query.allowed_types {
            nodes.retain(|n| allowed.contains(&n.entity_type));
            let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            edges.retain(|e| kept.contains(e.from.as_str()) && kept.contains(e.to.as_str()));
        }

        debug!(
            root = %query.root_id,
            nodes = nodes.len(),
            edges = edges.len(),
            "walked relation graph"
        );
        Ok(EntityGraph {
            root: query.root_id.clone(),
            nodes,
            edges,
            depth: query.max_depth,
        })
    }

    async fn entity_name(&self, entity_id: &str) -> String {
        let path = format!("/api/entityInfo/{entity_id}");
        match self.client.get_json(&path, &[]).await {
            Ok(info) => info
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            Err(_) => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = GraphQuery::new("root");
        assert_eq!(query.root_type, "DEVICE");
        assert_eq!(query.max_depth, 2);
        assert_eq!(query.direction, RelationDirection::Both);
        assert_eq!(query.node_limit, 500);
        assert!(query.allowed_types.is_none());
    }

    #[test]
    fn test_malformed_relations_are_skipped() {
        let raw = serde_json::json!([
            { "toId": { "id": "a", "entityType": "DEVICE" }, "type": "Contains" },
            { "toId": { "id": "b" } },
            { "type": "Manages" }
        ]);
        let relations: Vec<RelationInfo> = serde_json::from_value(raw).unwrap();
        let complete = relations
            .iter()
            .filter(|r| {
                r.to.as_ref()
                    .is_some_and(|t| t.id.is_some() && t.entity_type.is_some())
            })
            .count();
        assert_eq!(complete, 1);
    }
}
