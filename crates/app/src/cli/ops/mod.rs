pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rename;
pub mod rm;
pub mod share;
pub mod upload;

pub use ls::{Ls, Tree};
pub use mkdir::Mkdir;
pub use mv::Mv;
pub use rename::Rename;
pub use rm::Rm;
pub use share::{Access, Share};
pub use upload::{Reconcile, UploadUrl};

use common::nodes::{Share as NodeShare, ShareSettings, StorageNode};

use crate::cli::op::OpContext;

/// Render nodes one per line, or as a JSON array with `--json`.
pub fn render_nodes(
    ctx: &OpContext,
    nodes: &[StorageNode],
    empty: &str,
) -> Result<String, serde_json::Error> {
    if ctx.json {
        return serde_json::to_string_pretty(nodes);
    }
    if nodes.is_empty() {
        return Ok(empty.to_string());
    }
    Ok(nodes.iter().map(describe).collect::<Vec<_>>().join("\n"))
}

fn describe(node: &StorageNode) -> String {
    let type_str = if node.is_dir() { "dir" } else { "file" };
    let mut line = format!("{} ({})", node.path, type_str);
    match (&node.id, node.exists) {
        (_, false) => line.push_str(" [virtual]"),
        (Some(id), true) => line.push_str(&format!(" [{}]", id)),
        (None, true) => {}
    }
    if let NodeShare::Explicit(settings) = &node.share {
        line.push_str(&format!(" {}", describe_share(settings)));
    }
    line
}

pub fn describe_share(settings: &ShareSettings) -> String {
    let visibility = if settings.is_public {
        "public"
    } else {
        "private"
    };
    if settings.uids.is_empty() {
        visibility.to_string()
    } else {
        let uids: Vec<&str> = settings.uids.iter().map(String::as_str).collect();
        format!("{} shared with {}", visibility, uids.join(","))
    }
}
