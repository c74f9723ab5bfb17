use topograph_core::{FilterState, SavedLayout, Snapshot};

#[derive(Debug, Clone)]
pub struct Incoming {
    pub stream: String,
    pub kind: IncomingKind,
}

#[derive(Debug, Clone)]
pub enum IncomingKind {
    Snapshot(Snapshot),
    SavedLayout(SavedLayout),
    Filters(FilterState),
    Search(String),
    Error(String),
    Closed,
}

impl Incoming {
    pub fn snapshot(stream: String, snapshot: Snapshot) -> Self {
        Self {
            stream,
            kind: IncomingKind::Snapshot(snapshot),
        }
    }

    pub fn saved_layout(stream: String, layout: SavedLayout) -> Self {
        Self {
            stream,
            kind: IncomingKind::SavedLayout(layout),
        }
    }

    pub fn filters(stream: String, filters: FilterState) -> Self {
        Self {
            stream,
            kind: IncomingKind::Filters(filters),
        }
    }

    pub fn search(stream: String, query: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Search(query),
        }
    }

    pub fn error(stream: String, msg: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Error(msg),
        }
    }

    pub fn closed(stream: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Closed,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self.kind, IncomingKind::Snapshot(_))
    }
}
