//! Classify the drivelology sheet with gpt-4o-mini on a single OpenAI key.

use drivel_runner::{init_tracing, run_profile, GPT_4O_MINI};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run_profile(&GPT_4O_MINI).await?;
    Ok(())
}
