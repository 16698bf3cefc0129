use std::error::Error;

use anyhow::Context;
use common::nodes::{NodeStore, NodeStoreError};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct OpContext {
    /// Node service, already scoped to the configured base path
    pub store: NodeStore,
    /// Print results as JSON instead of text
    pub json: bool,
}

impl OpContext {
    pub fn new(store: NodeStore, json: bool) -> Self {
        Self { store, json }
    }

    /// Connect to the configured backend and scope the service.
    ///
    /// `base_path` overrides the one from the config.
    pub async fn connect(
        config: &AppConfig,
        base_path: Option<&str>,
        json: bool,
    ) -> anyhow::Result<Self> {
        let client = config
            .store
            .connect()
            .await
            .context("failed to connect to object store")?;
        let base = base_path.unwrap_or(&config.base_path);
        let store = NodeStore::new(client, config.nodes.clone())
            .with_base_path(base)
            .with_context(|| format!("invalid base path '{base}'"))?;
        tracing::debug!(base = %store.base_path(), "node store ready");
        Ok(Self::new(store, json))
    }
}

/// Exit status for a failed op: 2 when the node service rejected the
/// request itself, 1 for everything else.
pub fn exit_code(error: &(dyn Error + 'static)) -> i32 {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(store_error) = e.downcast_ref::<NodeStoreError>() {
            return if store_error.is_input_error() { 2 } else { 1 };
        }
        current = e.source();
    }
    1
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_applies_base_path() {
        let mut config = AppConfig::default();
        config.base_path = "users/u1".to_string();

        let ctx = OpContext::connect(&config, None, false).await.unwrap();
        assert_eq!(ctx.store.base_path(), "users/u1");

        let ctx = OpContext::connect(&config, Some("/team/"), true).await.unwrap();
        assert_eq!(ctx.store.base_path(), "team");
        assert!(ctx.json);
    }

    #[test]
    fn test_exit_code_follows_store_error() {
        use crate::cli::ops::rename::RenameError;

        let bad_request = RenameError::Store(NodeStoreError::SamePath("a".to_string()));
        assert_eq!(exit_code(&bad_request), 2);

        let missing = RenameError::Store(NodeStoreError::PathNotFound("a".to_string()));
        assert_eq!(exit_code(&missing), 1);

        let io = std::io::Error::other("boom");
        assert_eq!(exit_code(&io), 1);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_base_path() {
        let config = AppConfig::default();
        assert!(OpContext::connect(&config, Some("a/../b"), false)
            .await
            .is_err());
    }
}
