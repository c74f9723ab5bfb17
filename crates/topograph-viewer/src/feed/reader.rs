use crossbeam_channel::Sender;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};
use std::thread::JoinHandle;
use topograph_core::{Msg, Snapshot};

use crate::feed::{Incoming, IncomingKind};

/// Reads newline-delimited JSON messages from `reader` on its own thread.
///
/// Malformed lines become `Incoming::error`; the stream always ends with
/// `Incoming::closed`.
pub fn spawn_reader<R>(stream: String, reader: R, tx: Sender<Incoming>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = BufReader::new(reader);
        for (lineno, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    let _ = tx.send(Incoming::error(stream.clone(), format!("read error: {e}")));
                    break;
                }
            };
            let Some(inc) = decode_line(&stream, &line) else {
                continue;
            };
            if let IncomingKind::Error(msg) = &inc.kind {
                tracing::warn!(stream = %stream, line = lineno + 1, "{msg}");
            }
            if tx.send(inc).is_err() {
                // receiver gone
                return;
            }
        }
        let _ = tx.send(Incoming::closed(stream));
    })
}

/// Decodes one feed line. Blank lines yield `None`.
///
/// Snapshots are decoded record by record, so one bad node or edge only
/// drops itself. A bare `{nodes, edges}` object is read as a snapshot.
pub fn decode_line(stream: &str, line: &str) -> Option<Incoming> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(Incoming::error(stream.to_string(), format!("decode error: {e}"))),
    };

    let tag = value.get("type").and_then(Value::as_str).map(str::to_string);
    let snapshot_body = match (tag.as_deref(), value) {
        (Some("snapshot"), Value::Object(mut obj)) => Ok(obj.remove("data").unwrap_or(Value::Null)),
        (None, v @ Value::Object(_)) if v.get("nodes").is_some() => Ok(v),
        (_, v) => Err(v),
    };

    let inc = match snapshot_body {
        Ok(body) => decode_snapshot(stream, body),
        Err(value) => match serde_json::from_value::<Msg>(value) {
            Ok(Msg::Snapshot(s)) => Incoming::snapshot(stream.to_string(), s),
            Ok(Msg::SavedLayout(l)) => Incoming::saved_layout(stream.to_string(), l),
            Ok(Msg::Filters(f)) => Incoming::filters(stream.to_string(), f),
            Ok(Msg::Search { query }) => Incoming::search(stream.to_string(), query),
            Err(e) => Incoming::error(stream.to_string(), format!("decode error: {e}")),
        },
    };
    Some(inc)
}

fn decode_snapshot(stream: &str, body: Value) -> Incoming {
    match Snapshot::from_value_lenient(body) {
        Ok((snapshot, skipped)) => {
            for reason in &skipped {
                tracing::debug!(stream = %stream, %reason, "skipped malformed snapshot record");
            }
            Incoming::snapshot(stream.to_string(), snapshot)
        }
        Err(e) => Incoming::error(stream.to_string(), format!("decode error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tagged_lines_decode_to_their_kind() {
        let snap = decode_line(
            "t",
            r#"{"type":"snapshot","data":{"nodes":[{"id":"a","label":"a","type":"container"}],"edges":[]}}"#,
        );
        assert!(matches!(
            snap.map(|i| i.kind),
            Some(IncomingKind::Snapshot(s)) if s.nodes.len() == 1
        ));

        let search = decode_line("t", r#"{"type":"search","data":{"query":"web"}}"#);
        assert!(matches!(search.map(|i| i.kind), Some(IncomingKind::Search(q)) if q == "web"));

        let filters = decode_line(
            "t",
            r#"{"type":"filters","data":{"edge_filters":{"show_internal":false},"host_inclusion":{"vm1":false}}}"#,
        );
        let Some(IncomingKind::Filters(f)) = filters.map(|i| i.kind) else {
            panic!("expected filters");
        };
        assert!(!f.edge_filters.show_internal);
        assert!(f.edge_filters.show_external);
        assert_eq!(f.host_inclusion.get("vm1"), Some(&false));
    }

    #[test]
    fn saved_layout_accepts_backend_positions() {
        let inc = decode_line(
            "t",
            r#"{"type":"saved_layout","data":{"positions":{"a":{"node_id":"a","x":1.5,"y":-2}}}}"#,
        );
        let Some(IncomingKind::SavedLayout(l)) = inc.map(|i| i.kind) else {
            panic!("expected saved layout");
        };
        assert_eq!(l.positions.len(), 1);
    }

    #[test]
    fn bad_records_do_not_sink_the_snapshot() {
        let inc = decode_line(
            "t",
            r#"{"nodes":[{"id":"a","type":"container"},{"id":"b","type":"spaceship"}],"edges":[{"source":"a"}]}"#,
        );
        let Some(IncomingKind::Snapshot(s)) = inc.map(|i| i.kind) else {
            panic!("expected snapshot");
        };
        assert_eq!(s.nodes.len(), 1);
        assert!(s.edges.is_empty());
    }

    #[test]
    fn garbage_and_blank_lines() {
        assert!(decode_line("t", "   ").is_none());
        assert!(matches!(
            decode_line("t", "{not json").map(|i| i.kind),
            Some(IncomingKind::Error(_))
        ));
        assert!(matches!(
            decode_line("t", r#"{"type":"launch_rockets"}"#).map(|i| i.kind),
            Some(IncomingKind::Error(_))
        ));
    }

    #[test]
    fn reader_thread_forwards_lines_then_closes() {
        let input = "{\"type\":\"search\",\"data\":{\"query\":\"a\"}}\n\nnope\n";
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_reader("stdin".into(), Cursor::new(input.as_bytes().to_vec()), tx);
        handle.join().expect("reader thread");

        let kinds: Vec<_> = rx.try_iter().map(|i| i.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], IncomingKind::Search(_)));
        assert!(matches!(kinds[1], IncomingKind::Error(_)));
        assert!(matches!(kinds[2], IncomingKind::Closed));
    }
}
