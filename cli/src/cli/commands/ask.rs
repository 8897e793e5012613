use std::path::{Path, PathBuf};

use serde_json::Value;

pub async fn run(config_path: Option<PathBuf>, message: String, history_path: Option<PathBuf>) -> anyhow::Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("Message cannot be empty");
    }

    let config = super::effective_config(config_path)?;
    let client = super::build_client(&config)?;

    let history = match history_path {
        Some(path) => read_history(&path)?,
        None => Vec::new(),
    };

    let reply = client.chat(&message, &history).await?;
    println!("{}", reply);

    Ok(())
}

fn read_history(path: &Path) -> anyhow::Result<Vec<Value>> {
    if !path.exists() {
        anyhow::bail!("File not found: {:?}", path);
    }

    let content = std::fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&content)?;

    match data {
        Value::Array(turns) => Ok(turns),
        _ => anyhow::bail!("History file must contain a JSON array of turns"),
    }
}
