use clap::Args;
use common::nodes::NodeStoreError;

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct Rename {
    /// File or directory to rename
    pub path: String,
    /// New name, a single path segment
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rename {
    type Error = RenameError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let is_file = ctx
            .store
            .get_node(&self.path)
            .await?
            .is_some_and(|node| node.is_file());

        let nodes = if is_file {
            vec![ctx.store.rename_file(&self.path, &self.name).await?]
        } else {
            ctx.store.rename_dir(&self.path, &self.name).await?
        };
        Ok(render_nodes(ctx, &nodes, "Nothing renamed")?)
    }
}
