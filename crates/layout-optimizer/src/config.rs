//! Session configuration from JSON files

use crate::{OptimizerConfig, Result, SearchBounds};
use led_photometry::{LayoutParams, ReceiverGeometry, SourceSpec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Everything one manual or optimization run needs
///
/// Missing sections and fields fall back to their defaults, so a file can
/// override only what it cares about:
///
/// ```json
/// { "source": { "power_mw": 1200.0 }, "optimizer": { "seed": 7 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub source: SourceSpec,
    pub receiver: ReceiverGeometry,
    /// Layout for manual evaluation
    pub layout: LayoutParams,
    pub bounds: SearchBounds,
    pub optimizer: OptimizerConfig,
}

impl SessionConfig {
    /// Check every section before any field is computed
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.receiver.grid_shape()?;
        self.layout.validate()?;
        self.bounds.validate()?;
        Ok(())
    }
}

/// Load and validate a session file
pub fn load_session_config(path: impl AsRef<Path>) -> Result<SessionConfig> {
    let path = path.as_ref();
    info!("Loading session config from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: SessionConfig = serde_json::from_reader(reader)?;
    config.validate()?;

    info!(
        "Session: {} mW source, {}x{} cm receiver, {:?} count search",
        config.source.power_mw,
        config.receiver.width_cm,
        config.receiver.length_cm,
        config.optimizer.count_strategy
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CountStrategy, OptimizeError};
    use led_photometry::PhotometryError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"{
                "source": { "power_mw": 1200.0 },
                "receiver": { "width_cm": 4.0 },
                "optimizer": { "seed": 9, "count_strategy": "Relaxed" }
            }"#,
        );
        let config = load_session_config(file.path()).unwrap();

        assert_eq!(config.source.power_mw, 1200.0);
        assert_eq!(config.source.theta_lens_deg, SourceSpec::default().theta_lens_deg);
        assert_eq!(config.receiver.width_cm, 4.0);
        assert_eq!(config.receiver.length_cm, ReceiverGeometry::default().length_cm);
        assert_eq!(config.layout, LayoutParams::default());
        assert_eq!(config.bounds, SearchBounds::default());
        assert_eq!(config.optimizer.seed, Some(9));
        assert_eq!(config.optimizer.count_strategy, CountStrategy::Relaxed);
        assert_eq!(config.optimizer.max_iterations, OptimizerConfig::default().max_iterations);
    }

    #[test]
    fn test_empty_object_is_default() {
        let file = write_config("{}");
        assert_eq!(load_session_config(file.path()).unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_custom_start_range_parses() {
        let file = write_config(
            r#"{ "optimizer": { "start_range": { "Custom": {
                "height_cm": [2.0, 4.0],
                "radius_cm": [3.0, 5.0],
                "num_leds": [2, 3],
                "tilt_deg": [0.0, 10.0]
            } } } }"#,
        );
        let config = load_session_config(file.path()).unwrap();
        match config.optimizer.start_range {
            crate::StartRange::Custom(range) => assert_eq!(range.num_leds, (2, 3)),
            other => panic!("unexpected start range {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config(r#"{ "layout": { "num_leds": 0 } }"#);
        assert!(matches!(
            load_session_config(file.path()),
            Err(OptimizeError::Photometry(PhotometryError::InvalidLayout(_)))
        ));

        let file = write_config(r#"{ "bounds": { "height_cm": [5.0, 1.0] } }"#);
        assert!(matches!(
            load_session_config(file.path()),
            Err(OptimizeError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_malformed_json_and_missing_file() {
        let file = write_config("{ not json");
        assert!(matches!(load_session_config(file.path()), Err(OptimizeError::Json(_))));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_session_config(dir.path().join("missing.json")),
            Err(OptimizeError::Io(_))
        ));
    }
}
