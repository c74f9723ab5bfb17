use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    Container,
    External,
}

/// A graph node as produced by the topology backend.
///
/// `data` is the open attribute bag (hostname, status, health, ports, image,
/// compose_project, ...). Only `id` takes part in diffing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(
        default,
        rename = "parent",
        alias = "parentId",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            label: label.into(),
            kind,
            parent_id: None,
            data: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// String attribute, `None` when absent, not a string, or blank.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn hostname(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Host => self
                .attr_str("hostname")
                .or_else(|| Some(self.label.as_str()).filter(|l| !l.trim().is_empty())),
            NodeKind::Container | NodeKind::External => self.attr_str("hostname"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[serde(alias = "network")]
    Connection,
    Dependency,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    Internal,
    #[serde(alias = "cross_host")]
    CrossHost,
    External,
}

impl ConnectionType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(Self::Internal),
            "cross-host" | "cross_host" => Some(Self::CrossHost),
            "external" => Some(Self::External),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::CrossHost => "cross-host",
            Self::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    #[default]
    ProcNet,
    Tcpdump,
    Both,
}

impl SourceMethod {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "proc_net" => Some(Self::ProcNet),
            "tcpdump" => Some(Self::Tcpdump),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcNet => "proc_net",
            Self::Tcpdump => "tcpdump",
            Self::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// `connection_type: None` means the collector could not classify the link.
    Connection {
        connection_type: Option<ConnectionType>,
        source_method: SourceMethod,
    },
    Dependency,
}

impl EdgeKind {
    pub fn edge_type(&self) -> EdgeType {
        match self {
            Self::Connection { .. } => EdgeType::Connection,
            Self::Dependency => EdgeType::Dependency,
        }
    }
}

/// Diffing key of an edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub ty: EdgeType,
}

impl EdgeKey {
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }

    pub fn other(&self, id: &NodeId) -> &NodeId {
        if &self.source == id {
            &self.target
        } else {
            &self.source
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEdge", into = "WireEdge")]
pub struct Edge {
    pub id: Option<String>,
    pub source: NodeId,
    pub target: NodeId,
    pub label: Option<String>,
    pub kind: EdgeKind,
    /// Remaining attributes (protocol, declared, project, ...).
    pub data: Map<String, Value>,
}

impl Edge {
    pub fn connection(
        source: impl Into<String>,
        target: impl Into<String>,
        connection_type: ConnectionType,
        source_method: SourceMethod,
    ) -> Self {
        Self::with_kind(
            source,
            target,
            EdgeKind::Connection {
                connection_type: Some(connection_type),
                source_method,
            },
        )
    }

    pub fn dependency(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_kind(source, target, EdgeKind::Dependency)
    }

    fn with_kind(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            id: None,
            source: NodeId::new(source),
            target: NodeId::new(target),
            label: None,
            kind,
            data: Map::new(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            ty: self.kind.edge_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    source: NodeId,
    target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "type")]
    ty: EdgeType,
    #[serde(default)]
    data: Map<String, Value>,
}

impl From<WireEdge> for Edge {
    fn from(mut w: WireEdge) -> Self {
        let kind = match w.ty {
            EdgeType::Connection => {
                let connection_type = w
                    .data
                    .remove("connection_type")
                    .and_then(|v| v.as_str().and_then(ConnectionType::parse));
                // Collectors that predate packet capture only report /proc/net.
                let source_method = w
                    .data
                    .remove("source_method")
                    .and_then(|v| v.as_str().and_then(SourceMethod::parse))
                    .unwrap_or_default();
                EdgeKind::Connection {
                    connection_type,
                    source_method,
                }
            }
            EdgeType::Dependency => EdgeKind::Dependency,
        };
        Self {
            id: w.id,
            source: w.source,
            target: w.target,
            label: w.label,
            kind,
            data: w.data,
        }
    }
}

impl From<Edge> for WireEdge {
    fn from(e: Edge) -> Self {
        let mut data = e.data;
        if let EdgeKind::Connection {
            connection_type,
            source_method,
        } = e.kind
        {
            if let Some(ct) = connection_type {
                data.insert("connection_type".into(), ct.as_str().into());
            }
            data.insert("source_method".into(), source_method.as_str().into());
        }
        Self {
            id: e.id,
            source: e.source,
            target: e.target,
            label: e.label,
            ty: e.kind.edge_type(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The surface reports exactly (0, 0) for elements it never placed.
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut b = Bounds {
            min: first,
            max: first,
        };
        for p in it {
            b.min.x = b.min.x.min(p.x);
            b.min.y = b.min.y.min(p.y);
            b.max.x = b.max.x.max(p.x);
            b.max.y = b.max.y.max(p.y);
        }
        Some(b)
    }

    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) * 0.5, (self.min.y + self.max.y) * 0.5)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            last_updated: None,
        }
    }

    /// Decodes a snapshot record by record so that one malformed node or edge
    /// does not discard the whole payload. Returns the skipped records' errors.
    pub fn from_value_lenient(value: Value) -> Result<(Self, Vec<String>), serde_json::Error> {
        let Value::Object(mut obj) = value else {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "snapshot must be a JSON object",
            ));
        };

        let mut skipped = Vec::new();
        let nodes = decode_records::<Node>(obj.remove("nodes"), "node", &mut skipped);
        let edges = decode_records::<Edge>(obj.remove("edges"), "edge", &mut skipped);
        let last_updated = obj
            .remove("last_updated")
            .and_then(|v| v.as_str().map(str::to_string));

        Ok((
            Self {
                nodes,
                edges,
                last_updated,
            },
            skipped,
        ))
    }
}

fn decode_records<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    what: &str,
    skipped: &mut Vec<String>,
) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(v) => out.push(v),
            Err(e) => skipped.push(format!("{what} #{i}: {e}")),
        }
    }
    out
}

/// Positions of a dashboard. Accepts the backend's `{node_id, x, y}` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    #[serde(default)]
    pub positions: HashMap<NodeId, Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeFilters {
    pub show_internal: bool,
    pub show_cross_host: bool,
    pub show_external: bool,
    pub show_proc_net: bool,
    pub show_tcpdump: bool,
    pub show_connections: bool,
    pub show_dependencies: bool,
}

impl Default for EdgeFilters {
    fn default() -> Self {
        Self {
            show_internal: true,
            show_cross_host: true,
            show_external: true,
            show_proc_net: true,
            show_tcpdump: true,
            show_connections: true,
            show_dependencies: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub edge_filters: EdgeFilters,
    /// hostname -> included. Missing entries are visible.
    pub host_inclusion: HashMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavePositionsRequest {
    pub positions: Vec<NodePosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ViewerEvent {
    PositionChanged {
        node_id: NodeId,
        x: f64,
        y: f64,
    },
    SelectionChanged {
        node: Option<Node>,
    },
    ContextMenuRequested {
        node: Node,
        screen_x: f64,
        screen_y: f64,
    },
    SearchResults {
        nodes: Vec<Node>,
    },
}

/// Inbound feed message, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Msg {
    Snapshot(Snapshot),
    SavedLayout(SavedLayout),
    Filters(FilterState),
    Search { query: String },
}
