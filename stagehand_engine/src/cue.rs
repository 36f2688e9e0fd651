use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

static VOICE_CUE: OnceCell<Regex> = OnceCell::new();

/// Splits dialogue text of the form `/cue/ rest...` into the voice cue and
/// the display text. Text without a leading cue tag passes through unchanged.
pub fn split_voice_cue(text: &str) -> Result<(Option<String>, String)> {
    let pattern = VOICE_CUE
        .get_or_try_init(|| Regex::new(r"^\s*/([^/]+)/\s*(.*)$"))
        .context("compiling voice cue pattern")?;
    match pattern.captures(text) {
        Some(captures) => {
            let cue = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .filter(|cue| !cue.trim().is_empty());
            let rest = captures
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Ok((cue, rest))
        }
        None => Ok((None, text.to_string())),
    }
}
