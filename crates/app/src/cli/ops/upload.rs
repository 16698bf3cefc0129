use clap::Args;
use common::nodes::{NodeStoreError, UploadRequest};

use super::render_nodes;

#[derive(Args, Debug, Clone)]
pub struct UploadUrl {
    /// Destination paths of the files to upload
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Content type the uploads will be sent with
    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,
}

#[derive(Args, Debug, Clone)]
pub struct Reconcile {
    /// Paths of files that finished uploading
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("store error: {0}")]
    Store(#[from] NodeStoreError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for UploadUrl {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let requests: Vec<UploadRequest> = self
            .paths
            .iter()
            .map(|path| UploadRequest::new(path.clone(), self.content_type.clone()))
            .collect();
        let urls = ctx.store.issue_upload_urls(&requests).await?;

        if ctx.json {
            let urls: Vec<String> = urls.iter().map(|url| url.to_string()).collect();
            return Ok(serde_json::to_string_pretty(&urls)?);
        }
        Ok(self
            .paths
            .iter()
            .zip(urls)
            .map(|(path, url)| format!("{} {}", path, url))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Reconcile {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = ctx.store.reconcile_uploaded_files(&self.paths).await?;
        Ok(render_nodes(ctx, &nodes, "No uploaded files found")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::Op;
    use crate::cli::ops::tests::test_ctx;

    #[tokio::test]
    async fn test_upload_url_lines_follow_paths() {
        let ctx = test_ctx();
        let op = UploadUrl {
            paths: vec!["b.txt".to_string(), "a/c.txt".to_string()],
            content_type: "text/plain".to_string(),
        };

        let output = op.execute(&ctx).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("b.txt memory://uploads/b.txt?"));
        assert!(lines[1].starts_with("a/c.txt memory://uploads/a/c.txt?"));
    }

    #[tokio::test]
    async fn test_reconcile_without_uploads() {
        let ctx = test_ctx();
        let op = Reconcile {
            paths: vec!["never.txt".to_string()],
        };
        assert_eq!(op.execute(&ctx).await.unwrap(), "No uploaded files found");
    }
}
