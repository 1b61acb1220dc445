use relay_domain::config::Config;

use crate::bootstrap::build_transcript_store;

/// Print a session's history as pretty JSON on stdout.
pub async fn run(config: &Config, session_id: &str) -> anyhow::Result<()> {
    let store = build_transcript_store(config)?;
    let history = store.read_history_async(session_id).await?;
    if history.is_empty() {
        tracing::warn!(
            session_id = session_id,
            dir = %store.project_dir().display(),
            "no history found"
        );
    }
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
