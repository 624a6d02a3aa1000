//! Hierarchy graph construction.
//!
//! Builds a directory/file tree from path-sorted files. Every path prefix
//! becomes one node (`dir:<prefix>` for ancestors, `file:<path>` for leaves)
//! hanging off a synthetic `root`. Node and edge registries make insertion
//! idempotent, so directories shared by many files collapse into a single
//! node without any recursion: one pass over all path segments.

use std::collections::HashSet;

use crate::models::{EdgeData, GraphEdge, GraphNode, HierarchyGraph, NodeData, ProjectFile};

pub const ROOT_ID: &str = "root";
pub const ROOT_LABEL: &str = "Project Root";

/// Insertion-ordered node and edge registries.
#[derive(Default)]
struct GraphBuilder {
    node_ids: HashSet<String>,
    edge_ids: HashSet<String>,
    graph: HierarchyGraph,
}

impl GraphBuilder {
    fn ensure_node(&mut self, id: &str, label: &str) {
        if self.node_ids.insert(id.to_string()) {
            self.graph.nodes.push(GraphNode {
                data: NodeData {
                    id: id.to_string(),
                    label: label.to_string(),
                },
            });
        }
    }

    fn ensure_edge(&mut self, source: &str, target: &str) {
        let id = format!("{}->{}", source, target);
        if self.edge_ids.insert(id.clone()) {
            self.graph.edges.push(GraphEdge {
                data: EdgeData {
                    id,
                    source: source.to_string(),
                    target: target.to_string(),
                },
            });
        }
    }
}

pub fn build_hierarchy_graph(files: &[ProjectFile]) -> HierarchyGraph {
    let mut builder = GraphBuilder::default();
    builder.ensure_node(ROOT_ID, ROOT_LABEL);

    for file in files {
        let parts: Vec<&str> = file.path.split('/').collect();
        let mut parent_id = ROOT_ID.to_string();

        for (index, part) in parts.iter().enumerate() {
            let prefix = if index == parts.len() - 1 { "file" } else { "dir" };
            let id_path = parts[..=index].join("/");
            let node_id = format!("{}:{}", prefix, id_path);
            builder.ensure_node(&node_id, part);
            builder.ensure_edge(&parent_id, &node_id);
            parent_id = node_id;
        }
    }

    builder.graph
}
