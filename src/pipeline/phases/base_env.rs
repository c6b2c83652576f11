use crate::pipeline::context::BuildContext;
use crate::pipeline::phase_trait::BuildPhase;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Pins the interpreter-level flags both later stages inherit. Pure
/// configuration: no network, no disk, no failure mode.
pub struct BaseEnvPhase;

#[async_trait]
impl BuildPhase for BaseEnvPhase {
    fn name(&self) -> &'static str {
        "BaseEnvPhase"
    }

    async fn execute(&self, context: &mut BuildContext) -> Result<()> {
        let base_env = context.config.base_env.clone();
        debug!(
            flags = base_env.vars().count(),
            "Pinned base environment flags"
        );
        context.base_env = Some(base_env);
        Ok(())
    }
}
