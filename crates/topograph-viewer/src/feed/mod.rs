pub mod protocol;
pub mod reader;

pub use protocol::{Incoming, IncomingKind};
pub use reader::{decode_line, spawn_reader};
