use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

pub const USAGE: &str = "usage: topograph-viewer [--config PATH] [--write-config] \
[--saved-layout PATH] [--filters PATH] [--search QUERY] [--stdin] [SNAPSHOT.json ...]";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    /// Write the effective config back to its location before replaying.
    pub write_config: bool,
    pub saved_layout: Option<PathBuf>,
    pub filters: Option<PathBuf>,
    pub search: Option<String>,
    pub stdin: bool,
    pub snapshots: Vec<PathBuf>,
}

pub fn parse_args() -> Result<CliArgs> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(path) = args.next() else {
                anyhow::bail!("--config expects a path");
            };
            out.config = Some(PathBuf::from(path));
        } else if arg == "--write-config" {
            out.write_config = true;
        } else if arg == "--saved-layout" {
            let Some(path) = args.next() else {
                anyhow::bail!("--saved-layout expects a path");
            };
            out.saved_layout = Some(PathBuf::from(path));
        } else if arg == "--filters" {
            let Some(path) = args.next() else {
                anyhow::bail!("--filters expects a path");
            };
            out.filters = Some(PathBuf::from(path));
        } else if arg == "--search" {
            let Some(query) = args.next() else {
                anyhow::bail!("--search expects a query");
            };
            out.search = Some(query.to_string_lossy().into_owned());
        } else if arg == "--stdin" {
            out.stdin = true;
        } else if arg.to_string_lossy().starts_with("--") {
            anyhow::bail!("unknown argument: {:?}\n{USAGE}", arg);
        } else {
            out.snapshots.push(PathBuf::from(arg));
        }
    }

    if !out.stdin && out.snapshots.is_empty() && !out.write_config {
        anyhow::bail!("nothing to replay: pass snapshot files or --stdin\n{USAGE}");
    }
    Ok(out)
}
