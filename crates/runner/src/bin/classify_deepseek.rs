//! Classify the drivelology sheet with DeepSeek V3 via OpenRouter, rotating
//! through the keys in `openrouter_keys.txt`.

use drivel_runner::{init_tracing, run_profile, DEEPSEEK_V3};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let summary = run_profile(&DEEPSEEK_V3).await?;
    if summary.exhausted > 0 {
        tracing::warn!(
            exhausted = summary.exhausted,
            "some records failed on every key; rerun to retry them"
        );
    }
    Ok(())
}
