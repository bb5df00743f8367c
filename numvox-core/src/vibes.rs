use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Style prompts loaded from a JSON file. Only the general `prompts` group can
/// be selected by key; the other groups are listed for reference.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VibeLibrary {
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub number_specific: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub range_specific: BTreeMap<String, String>,
}

impl VibeLibrary {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Vibe prompts file not found: {path:?}"))?;
        let library: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in vibe prompts file {path:?}"))?;
        info!(path = ?path, prompts = library.prompts.len(), "Loaded vibe prompts");
        Ok(library)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prompts.get(key).map(String::as_str)
    }

    /// Human-readable listing of every group.
    pub fn listing(&self) -> Vec<String> {
        let mut lines = vec![
            "Available vibe prompts:".to_string(),
            String::new(),
            "=== General Prompts ===".to_string(),
        ];
        for (key, prompt) in &self.prompts {
            lines.push(format!("  {key}: {prompt}"));
        }

        if !self.number_specific.is_empty() {
            lines.push(String::new());
            lines.push("=== Number-Specific Prompts ===".to_string());
            for (category, numbers) in &self.number_specific {
                lines.push(format!("  {category}:"));
                for (number, prompt) in numbers {
                    lines.push(format!("    {number}: {prompt}"));
                }
            }
        }

        if !self.range_specific.is_empty() {
            lines.push(String::new());
            lines.push("=== Range-Specific Prompts ===".to_string());
            for (range, prompt) in &self.range_specific {
                lines.push(format!("  {range}: {prompt}"));
            }
        }

        lines
    }
}

/// Command-line style selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSelection {
    pub vibe: Option<String>,
    pub vibe_key: Option<String>,
}

/// Pick the style prompt for this run. A key wins over a literal `--vibe`;
/// a prompt file with neither is an error.
pub fn resolve_style(
    library: Option<&VibeLibrary>,
    selection: &StyleSelection,
) -> Result<Option<String>> {
    let Some(library) = library else {
        if selection.vibe_key.is_some() {
            bail!("--vibe-key requires --vibe-file");
        }
        return Ok(selection.vibe.clone());
    };

    match (&selection.vibe_key, &selection.vibe) {
        (Some(key), _) => match library.get(key) {
            Some(prompt) => {
                info!(key = %key, "Using vibe prompt '{key}': {}", preview(prompt));
                Ok(Some(prompt.to_string()))
            }
            None => bail!(
                "Vibe key '{key}' not found in vibe file. Use --list-vibes to see available keys"
            ),
        },
        (None, Some(vibe)) => Ok(Some(vibe.clone())),
        (None, None) => {
            bail!("When using --vibe-file, you must specify either --vibe-key or --vibe")
        }
    }
}

/// First 50 characters, for log lines.
pub fn preview(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(50).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
