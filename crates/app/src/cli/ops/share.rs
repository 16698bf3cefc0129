use clap::Args;
use common::nodes::{NodeStoreError, ShareSettings};

use super::{describe_share, render_nodes};

#[derive(Args, Debug, Clone)]
pub struct Share {
    /// File or directory to update
    pub path: String,

    /// Make the node public
    #[arg(long)]
    pub public: bool,

    /// Grant access to a user id (repeatable)
    #[arg(long = "uid")]
    pub uids: Vec<String>,

    /// Drop the node's own settings and inherit from its parent
    #[arg(long, conflicts_with_all = ["public", "uids"])]
    pub clear: bool,
}

#[derive(Args, Debug, Clone)]
pub struct Access {
    /// File or directory to inspect
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Share {
    type Error = ShareError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let settings = if self.clear {
            None
        } else {
            Some(ShareSettings::new(self.public, self.uids.iter().cloned()))
        };
        let nodes = ctx.store.set_share_settings(&self.path, settings).await?;
        Ok(render_nodes(ctx, &nodes, "Nothing updated")?)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Access {
    type Error = ShareError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let settings = ctx.store.effective_share_settings(&self.path).await?;
        if ctx.json {
            return Ok(serde_json::to_string_pretty(&settings)?);
        }
        Ok(describe_share(&settings))
    }
}
