use clap::Args;
use common::nodes::NodeStoreError;

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// File or directory to move
    pub from: String,
    /// Destination path
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mv {
    type Error = MvError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // anything that is not a stored file is moved as a directory
        let is_file = ctx
            .store
            .get_node(&self.from)
            .await?
            .is_some_and(|node| node.is_file());

        let nodes = if is_file {
            vec![ctx.store.move_file(&self.from, &self.to).await?]
        } else {
            ctx.store.move_dir(&self.from, &self.to).await?
        };
        Ok(render_nodes(ctx, &nodes, "Nothing moved")?)
    }
}
