//! Dashboard configuration loaded from TOML.
//!
//! Looked up at `--config PATH`, else `$XDG_CONFIG_HOME/pdvmon/config.toml`
//! when present, else defaults.
//!
//! ```toml
//! server_address = "10.0.0.1:8080"
//! control_port = 8765
//! slot_count = 4
//! quality = "medium-low"
//!
//! [[slots]]
//! slot = 1
//! source_url = "rtsp://10.0.0.20/stream1"
//! terminal = "10.0.0.5"
//! quality = "high"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pdvmon_core::{QualityPreset, SlotId, SlotLayout, DEFAULT_SLOT_COUNT};
use pdvmon_session::{SessionConfig, SlotBoard, DEFAULT_CONTROL_PORT};

use crate::error::{Result, TuiError};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Backend address pre-filled in the server input.
    #[serde(default)]
    pub server_address: Option<String>,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default = "default_slot_count")]
    pub slot_count: u8,
    /// Preset requested for slots without their own.
    #[serde(default)]
    pub quality: Option<QualityPreset>,
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

/// Pre-filled inputs for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub slot: u8,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub quality: Option<QualityPreset>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_address: None,
            control_port: default_control_port(),
            slot_count: default_slot_count(),
            quality: None,
            ice_servers: default_ice_servers(),
            connect_timeout_secs: default_connect_timeout_secs(),
            slots: Vec::new(),
        }
    }
}

fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}

fn default_slot_count() -> u8 {
    DEFAULT_SLOT_COUNT
}

fn default_ice_servers() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
    ]
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl DashboardConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pdvmon").join("config.toml"))
    }

    /// Loads `path`.
    ///
    /// # Errors
    ///
    /// Returns `TuiError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TuiError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| TuiError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Loads an explicit path, or the default location if it exists, or
    /// falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `TuiError::Config` if an existing file is invalid.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.layout().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// Slot layout from `slot_count`.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the count is outside `1..=9`.
    pub fn layout(&self) -> pdvmon_core::DomainResult<SlotLayout> {
        SlotLayout::new(self.slot_count)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Session settings derived from this config.
    ///
    /// Slot entries outside the layout are skipped with a warning.
    pub fn session_config(&self, layout: SlotLayout) -> SessionConfig {
        let mut slot_quality = BTreeMap::new();
        for entry in &self.slots {
            let Some(quality) = entry.quality else {
                continue;
            };
            match layout.slot(entry.slot) {
                Ok(slot) => {
                    slot_quality.insert(slot, quality);
                }
                Err(e) => warn!(error = %e, "Ignoring slot quality"),
            }
        }

        SessionConfig {
            layout,
            control_port: self.control_port,
            default_quality: self.quality,
            slot_quality,
        }
    }

    /// Pre-fills the board's inputs.
    pub fn apply_inputs(&self, board: &SlotBoard, layout: SlotLayout) {
        if let Some(server) = &self.server_address {
            board.set_server_address(server);
        }
        for entry in &self.slots {
            let slot: SlotId = match layout.slot(entry.slot) {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(error = %e, "Ignoring slot inputs");
                    continue;
                }
            };
            if let Some(url) = &entry.source_url {
                board.set_source_url(slot, url);
            }
            if let Some(terminal) = &entry.terminal {
                board.set_terminal_input(slot, terminal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use pdvmon_session::PresentationPort;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.control_port, 8765);
        assert_eq!(config.slot_count, 4);
        assert_eq!(config.ice_servers.len(), 2);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.server_address.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(DashboardConfig::parse("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let text = r#"
server_address = "10.0.0.1:8080"
control_port = 9000
slot_count = 6
quality = "medium"

[[slots]]
slot = 1
source_url = "rtsp://cam/1"
terminal = "10.0.0.5"
quality = "high"

[[slots]]
slot = 2
terminal = "10.0.0.6"
"#;
        let config = DashboardConfig::parse(text).unwrap();
        assert_eq!(config.server_address.as_deref(), Some("10.0.0.1:8080"));
        assert_eq!(config.control_port, 9000);
        assert_eq!(config.slots.len(), 2);
        assert_eq!(config.slots[0].quality, Some(QualityPreset::High));

        let layout = config.layout().unwrap();
        let session = config.session_config(layout);
        assert_eq!(session.layout.count(), 6);
        assert_eq!(session.default_quality, Some(QualityPreset::Medium));
        assert_eq!(session.slot_quality.get(&SlotId::new(1)), Some(&QualityPreset::High));
        assert!(!session.slot_quality.contains_key(&SlotId::new(2)));
    }

    #[test]
    fn test_invalid_slot_count_rejected() {
        assert!(DashboardConfig::parse("slot_count = 12").is_err());
        assert!(DashboardConfig::parse("slot_count = 0").is_err());
    }

    #[test]
    fn test_unknown_quality_rejected() {
        assert!(DashboardConfig::parse(r#"quality = "ultra""#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_address = \"backend:8080\"").unwrap();

        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.server_address.as_deref(), Some("backend:8080"));
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "slot_count = \"four\"").unwrap();

        let err = DashboardConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, TuiError::Config { ref path, .. } if path == file.path()));
    }

    #[test]
    fn test_discover_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(DashboardConfig::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_apply_inputs_skips_out_of_range() {
        let config = DashboardConfig {
            server_address: Some("10.0.0.1:8080".to_string()),
            slots: vec![
                SlotConfig {
                    slot: 1,
                    source_url: Some("rtsp://cam/1".to_string()),
                    terminal: Some("10.0.0.5".to_string()),
                    quality: None,
                },
                SlotConfig {
                    slot: 7,
                    source_url: Some("rtsp://cam/7".to_string()),
                    terminal: None,
                    quality: None,
                },
            ],
            ..Default::default()
        };
        let layout = SlotLayout::default();
        let board = SlotBoard::new(layout);
        config.apply_inputs(&board, layout);

        assert_eq!(board.server_address_input().as_deref(), Some("10.0.0.1:8080"));
        assert_eq!(board.source_url(SlotId::new(1)).as_deref(), Some("rtsp://cam/1"));
        assert_eq!(
            board.terminal_address_input(SlotId::new(1)).as_deref(),
            Some("10.0.0.5")
        );
        assert!(board.slot(SlotId::new(7)).is_none());
    }
}
