use clap::Args;
use common::nodes::NodeStoreError;

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Directories to create, along with any missing parents
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = ctx.store.create_dirs(&self.paths).await?;
        Ok(render_nodes(ctx, &nodes, "Nothing created")?)
    }
}
