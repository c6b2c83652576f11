use super::context::BuildContext;
use anyhow::Result;
use async_trait::async_trait;

/// One stage-construction phase. Phases run strictly in declaration order;
/// the Builder phase always completes before the Runtime phase copies its
/// artifact tree.
#[async_trait]
pub trait BuildPhase: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, context: &mut BuildContext) -> Result<()>;
}
