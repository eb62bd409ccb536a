//! Dependency graph visualization for development and debugging
//!
//! This module renders the declared dependency graph in DOT format, which can
//! be rendered using Graphviz. Build it by hand or sketch it straight off a
//! [`GraphBuilder`](crate::scope::GraphBuilder) with `dependency_graph`.
//!
//! ## Example
//!
//! ```rust
//! use grappelli_core::visualization::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("Database::new", "pooled");
//! graph.add_node("UserService::new", "pooled");
//! graph.add_dependency("UserService::new", "Database::new");
//!
//! let dot = graph.to_dot();
//! println!("{}", dot);
//! ```

#[cfg(feature = "dev-tools")]
use std::collections::HashMap;

/// One node in the sketched graph.
#[cfg(feature = "dev-tools")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
	/// Display label of the unit or service
	pub name: String,
	/// Role: "constant", "pooled", "deferred", "setter" or "service"
	pub role: String,
}

/// One declared dependency edge.
#[cfg(feature = "dev-tools")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
	pub from: String,
	pub to: String,
	/// Optional dependencies render as dashed edges
	pub optional: bool,
}

/// Sketch of a dependency graph for Graphviz rendering.
#[cfg(feature = "dev-tools")]
#[derive(Debug, Default)]
pub struct DependencyGraph {
	nodes: HashMap<String, GraphNode>,
	order: Vec<String>,
	edges: Vec<GraphEdge>,
}

#[cfg(feature = "dev-tools")]
impl DependencyGraph {
	/// Create a new empty graph
	///
	/// # Example
	///
	/// ```rust
	/// use grappelli_core::visualization::DependencyGraph;
	///
	/// let graph = DependencyGraph::new();
	/// assert_eq!(graph.statistics().node_count, 0);
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a node, replacing any node of the same name
	///
	/// # Example
	///
	/// ```rust
	/// use grappelli_core::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("Database::new", "pooled");
	/// ```
	pub fn add_node(&mut self, name: impl Into<String>, role: impl Into<String>) {
		let name = name.into();
		if !self.nodes.contains_key(&name) {
			self.order.push(name.clone());
		}
		self.nodes.insert(
			name.clone(),
			GraphNode {
				name,
				role: role.into(),
			},
		);
	}

	/// Add a node only if no node of that name exists yet
	pub fn ensure_node(&mut self, name: impl Into<String>, role: impl Into<String>) {
		let name = name.into();
		if !self.nodes.contains_key(&name) {
			self.add_node(name, role);
		}
	}

	/// Add a required dependency edge from `from` to `to`
	///
	/// # Example
	///
	/// ```rust
	/// use grappelli_core::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("Service::new", "pooled");
	/// graph.add_node("Database::new", "pooled");
	/// graph.add_dependency("Service::new", "Database::new");
	/// ```
	pub fn add_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.edges.push(GraphEdge {
			from: from.into(),
			to: to.into(),
			optional: false,
		});
	}

	/// Add an optional dependency edge, rendered dashed
	pub fn add_optional_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.edges.push(GraphEdge {
			from: from.into(),
			to: to.into(),
			optional: true,
		});
	}

	/// Generate DOT format output for Graphviz
	///
	/// Nodes appear in insertion order, so the output is stable across runs.
	///
	/// # Example
	///
	/// ```rust
	/// use grappelli_core::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("Database::new", "pooled");
	/// graph.add_node("UserService::new", "deferred");
	/// graph.add_dependency("UserService::new", "Database::new");
	///
	/// let dot = graph.to_dot();
	/// assert!(dot.contains("digraph"));
	/// assert!(dot.contains("Database::new"));
	/// assert!(dot.contains("UserService::new"));
	/// ```
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for name in &self.order {
			let Some(node) = self.nodes.get(name) else {
				continue;
			};
			let color = match node.role.as_str() {
				"constant" => "lightblue",
				"pooled" => "lightgreen",
				"deferred" => "lightyellow",
				"setter" => "lightgrey",
				_ => "white",
			};
			output.push_str(&format!(
				"  \"{}\" [label=\"{}\\n({})\", fillcolor={}, style=filled];\n",
				node.name, node.name, node.role, color
			));
		}

		output.push('\n');

		for edge in &self.edges {
			if edge.optional {
				output.push_str(&format!(
					"  \"{}\" -> \"{}\" [style=dashed];\n",
					edge.from, edge.to
				));
			} else {
				output.push_str(&format!("  \"{}\" -> \"{}\";\n", edge.from, edge.to));
			}
		}

		output.push_str("}\n");
		output
	}

	/// Get statistics about the sketched graph
	///
	/// # Example
	///
	/// ```rust
	/// use grappelli_core::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("Config", "constant");
	/// graph.add_node("Service::new", "pooled");
	/// graph.add_dependency("Service::new", "Config");
	///
	/// let stats = graph.statistics();
	/// assert_eq!(stats.node_count, 2);
	/// assert_eq!(stats.edge_count, 1);
	/// assert_eq!(stats.pooled_count, 1);
	/// ```
	pub fn statistics(&self) -> GraphStatistics {
		let count_role = |role: &str| {
			self.nodes
				.values()
				.filter(|node| node.role == role)
				.count()
		};
		GraphStatistics {
			node_count: self.nodes.len(),
			edge_count: self.edges.len(),
			constant_count: count_role("constant"),
			pooled_count: count_role("pooled"),
			deferred_count: count_role("deferred"),
			setter_count: count_role("setter"),
		}
	}
}

/// Statistics about a sketched dependency graph
#[cfg(feature = "dev-tools")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	/// Total number of nodes
	pub node_count: usize,
	/// Total number of edges
	pub edge_count: usize,
	/// Number of registered constants
	pub constant_count: usize,
	/// Number of pool-materialized units
	pub pooled_count: usize,
	/// Number of deferred units
	pub deferred_count: usize,
	/// Number of member setters
	pub setter_count: usize,
}
