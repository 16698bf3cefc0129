use clap::Args;
use common::nodes::NodeStoreError;

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list (defaults to root)
    pub dir: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct Tree {
    /// Directory to walk (defaults to root)
    pub dir: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = ctx.store.list_children(self.dir.as_deref()).await?;
        Ok(render_nodes(ctx, &nodes, "No items found")?)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Tree {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = ctx.store.list_descendants(self.dir.as_deref()).await?;
        Ok(render_nodes(ctx, &nodes, "No items found")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::Op;
    use crate::cli::ops::tests::test_ctx;

    #[tokio::test]
    async fn test_ls_and_tree() {
        let ctx = test_ctx();
        ctx.store.create_dirs(&["a/b"]).await.unwrap();

        let output = Ls { dir: None }.execute(&ctx).await.unwrap();
        assert!(output.starts_with("a (dir) ["));
        assert_eq!(output.lines().count(), 1);

        let output = Tree { dir: None }.execute(&ctx).await.unwrap();
        let paths: Vec<&str> = output
            .lines()
            .filter_map(|line| line.split(' ').next())
            .collect();
        assert_eq!(paths, vec!["a", "a/b"]);

        let output = Ls {
            dir: Some("missing".to_string()),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(output, "No items found");
    }
}
