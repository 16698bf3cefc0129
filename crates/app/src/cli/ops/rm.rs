use clap::Args;
use common::nodes::NodeStoreError;

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Paths to remove
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove directories and everything below them
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = if self.recursive {
            ctx.store.remove_dirs(&self.paths).await?
        } else {
            ctx.store.remove_files(&self.paths).await?
        };
        Ok(render_nodes(ctx, &nodes, "Nothing removed")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::Op;
    use crate::cli::ops::tests::test_ctx;

    #[tokio::test]
    async fn test_rm_without_recursive_keeps_dirs() {
        let ctx = test_ctx();
        ctx.store.create_dirs(&["docs"]).await.unwrap();

        let rm = Rm {
            paths: vec!["docs".to_string()],
            recursive: false,
        };
        assert_eq!(rm.execute(&ctx).await.unwrap(), "Nothing removed");

        let rm = Rm {
            recursive: true,
            ..rm
        };
        assert!(rm.execute(&ctx).await.unwrap().starts_with("docs (dir)"));
        assert!(ctx.store.list_descendants(None).await.unwrap().is_empty());
    }
}
