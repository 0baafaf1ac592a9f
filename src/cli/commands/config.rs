//! `tryon config`

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use tryon_config::Config;

/// Print the effective configuration with the source of each value.
pub fn execute_config_command(config: &Config, json: bool) -> Result<()> {
    if json {
        let entries: BTreeMap<String, serde_json::Value> = config
            .effective_config()
            .into_iter()
            .map(|(key, (value, source))| {
                (key, serde_json::json!({ "value": value, "source": source }))
            })
            .collect();
        let doc = serde_json::json!({
            "config_path": config.config_path.as_ref().map(|p| p.display().to_string()),
            "effective": entries,
        });
        let text = serde_json::to_string_pretty(&doc).context("Failed to render configuration")?;
        println!("{text}");
    } else {
        print!("{}", render_config_table(config));
    }
    Ok(())
}

/// Human-readable `key = value (source)` listing, sorted by key.
#[must_use]
pub fn render_config_table(config: &Config) -> String {
    let mut out = String::new();
    match &config.config_path {
        Some(path) => out.push_str(&format!("Config file: {}\n", path.display())),
        None => out.push_str("Config file: (none)\n"),
    }

    let effective: BTreeMap<_, _> = config.effective_config().into_iter().collect();
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in effective {
        out.push_str(&format!("  {key:<width$} = {value} ({source})\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_sources() {
        let config = Config::builder().max_retries(3).build().unwrap();
        let table = render_config_table(&config);
        assert!(table.starts_with("Config file: (none)"));
        assert!(table.contains("max_retries"));
        assert!(table.contains("= 3 (programmatic)"));
        assert!(table.contains("(default)"));
    }
}
