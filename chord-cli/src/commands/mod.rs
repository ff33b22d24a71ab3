pub mod analyze;
pub mod listen;

use std::fs;
use std::path::Path;

use anyhow::Context;
use chord_core::AnalysisConfig;

/// Loads an analysis configuration from JSON; missing fields keep their
/// calibrated defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: AnalysisConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    log::info!("Loaded analysis configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "history_len": 5, "analysis_band": {{ "low_hz": 60.0, "high_hz": 2000.0 }} }}"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.history_len, 5);
        assert_eq!(config.analysis_band.high_hz, 2000.0);
        assert_eq!(config.max_chords, AnalysisConfig::default().max_chords);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "history_len": 0 }}"#).unwrap();
        assert!(load_config(Some(file.path())).is_err());
        assert_eq!(load_config(None).unwrap(), AnalysisConfig::default());
    }
}
