use super::connect_with_retry;
use crate::error::{CliError, CliResult};
use hydra_mint_client::HeadClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Init,
    Abort,
    Close,
    Fanout,
}

impl LifecycleStep {
    fn label(self) -> &'static str {
        match self {
            LifecycleStep::Init => "Init",
            LifecycleStep::Abort => "Abort",
            LifecycleStep::Close => "Close",
            LifecycleStep::Fanout => "Fanout",
        }
    }
}

pub async fn execute(head: HeadClientConfig, step: LifecycleStep) -> CliResult<()> {
    println!("🚀 Sending {} to {}", step.label(), head.api_url);
    let mut client = connect_with_retry(&head).await?;

    if let Some(status) = client.await_greetings().await? {
        println!("📋 Current head status: {}", status);
    }

    let confirmed = match step {
        LifecycleStep::Init => client.init_head().await?,
        LifecycleStep::Abort => client.abort_head().await?,
        LifecycleStep::Close => client.close_head().await?,
        LifecycleStep::Fanout => client.fanout_head().await?,
    };
    client.disconnect().await?;

    if !confirmed {
        return Err(CliError::CommandExecution(format!(
            "{} rejected by the Head (status {})",
            step.label(),
            client.observed_status()
        )));
    }

    println!(
        "✅ {} confirmed, head status now {}",
        step.label(),
        client.observed_status()
    );
    Ok(())
}
