//! Configuration model for the arbitrage monitor.
//!
//! Every section is optional in the YAML file; omitted fields fall back to
//! the defaults below.

use common::types::Venue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// The top-level configuration struct that maps directly to the YAML file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub feed: FeedConfig,
    pub detector: DetectorConfig,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub source: DataSource,
    pub reconnect_delay_ms: u64,
    pub filter: FilterConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            reconnect_delay_ms: 3_000,
            filter: FilterConfig::All,
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum DataSource {
    #[serde(rename = "websocket")]
    WebSocket { url: String },
    /// JSON-lines replay, one frame per line.
    #[serde(rename = "file")]
    File {
        path: String,
        #[serde(default)]
        replay_delay_ms: u64,
    },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::WebSocket {
            url: "ws://127.0.0.1:8080/ws".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "mode")]
pub enum FilterConfig {
    #[serde(rename = "pairs")]
    Pairs { pairs: Vec<(String, String)> },
    #[serde(rename = "asset")]
    Asset { asset: String },
    #[serde(rename = "all")]
    All,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum profit, in percent, for a crossing to count as an opportunity.
    pub min_profit_pct: Decimal,
    /// Profit, in percent, above which a new opportunity is announced.
    pub notify_profit_pct: Decimal,
    pub active_venues: Vec<Venue>,
    /// Taker fee per venue as a fraction (0.001 = 0.1%).
    pub taker_fees: HashMap<Venue, Decimal>,
    /// Skip crossings whose legs were observed further apart than this.
    pub max_quote_skew_ms: Option<u64>,
    pub summary_interval_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_profit_pct: Decimal::new(1, 1),
            notify_profit_pct: Decimal::ONE,
            active_venues: vec![Venue::from("Binance"), Venue::from("Kraken")],
            taker_fees: HashMap::new(),
            max_quote_skew_ms: None,
            summary_interval_ms: 5_000,
        }
    }
}

impl DetectorConfig {
    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PresentationConfig {
    pub page_size: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.feed.source {
            DataSource::WebSocket { url } if url.trim().is_empty() => {
                return Err(ConfigError::ValidationError(
                    "Feed websocket url cannot be empty".to_string(),
                ));
            }
            DataSource::File { path, .. } if path.trim().is_empty() => {
                return Err(ConfigError::ValidationError(
                    "Feed replay file path cannot be empty".to_string(),
                ));
            }
            _ => {}
        }

        if self.feed.reconnect_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Reconnect delay must be greater than 0".to_string(),
            ));
        }

        if self.detector.min_profit_pct.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "Minimum profit percentage cannot be negative".to_string(),
            ));
        }

        if self.detector.notify_profit_pct.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "Notification profit percentage cannot be negative".to_string(),
            ));
        }

        for (venue, fee) in &self.detector.taker_fees {
            if fee.is_sign_negative() || *fee >= Decimal::ONE {
                return Err(ConfigError::ValidationError(format!(
                    "Taker fee for venue '{}' must be within [0, 1), got {}",
                    venue, fee
                )));
            }
        }

        if self.detector.summary_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Summary interval must be greater than 0".to_string(),
            ));
        }

        if self.presentation.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "Page size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

pub async fn load_config_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !tokio::fs::try_exists(path).await? {
        log::warn!(
            "No config file found at {}, using default values",
            path.display()
        );
        return Ok(EngineConfig::default());
    }
    let config_str = tokio::fs::read_to_string(path).await?;
    EngineConfig::from_yaml_str(&config_str)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::NamedTempFile;

    fn create_test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.feed.source = DataSource::File {
            path: "data/frames.jsonl".to_string(),
            replay_delay_ms: 50,
        };
        config.feed.filter = FilterConfig::Pairs {
            pairs: vec![("BTC".to_string(), "USDT".to_string())],
        };
        config.detector.min_profit_pct = dec!(0.25);
        config.detector.active_venues = vec![Venue::from("Binance"), Venue::from("Kraken")];
        config
            .detector
            .taker_fees
            .insert(Venue::from("Kraken"), dec!(0.0026));
        config
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.detector.min_profit_pct, dec!(0.1));
        assert_eq!(config.detector.notify_profit_pct, dec!(1));
        assert!(config.detector.active_venues.len() >= 2);
        assert_eq!(config.presentation.page_size, 10);
        assert_eq!(config.feed.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.feed.filter, FilterConfig::All);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_save_and_load() {
        let config = create_test_config();
        let temp_file = NamedTempFile::new().unwrap();

        config.save(temp_file.path()).unwrap();
        let loaded_config = EngineConfig::load(temp_file.path()).unwrap();

        assert_eq!(loaded_config, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
feed:
  source:
    type: websocket
    url: "wss://feed.example/ws"
detector:
  min_profit_pct: 0.5
  active_venues: [Binance, Kraken, Coinbase]
  taker_fees:
    Binance: "0.001"
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.feed.source,
            DataSource::WebSocket {
                url: "wss://feed.example/ws".to_string()
            }
        );
        assert_eq!(config.feed.reconnect_delay_ms, 3_000);
        assert_eq!(config.detector.min_profit_pct, dec!(0.5));
        assert_eq!(config.detector.active_venues.len(), 3);
        assert_eq!(
            config.detector.taker_fees.get(&Venue::from("Binance")),
            Some(&dec!(0.001))
        );
        assert_eq!(config.presentation.page_size, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_filter_modes_parse() {
        let asset: FilterConfig = serde_yaml::from_str("mode: asset\nasset: BTC\n").unwrap();
        assert_eq!(
            asset,
            FilterConfig::Asset {
                asset: "BTC".to_string()
            }
        );
        let all: FilterConfig = serde_yaml::from_str("mode: all\n").unwrap();
        assert_eq!(all, FilterConfig::All);
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = EngineConfig::from_yaml_str("feed: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(&dir.path().join("missing.yml"))
            .await
            .unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();

        // Valid config should pass
        config.validate().unwrap();

        config.feed.reconnect_delay_ms = 0;
        assert!(config.validate().is_err());

        config = create_test_config();
        config.detector.min_profit_pct = dec!(-0.1);
        assert!(config.validate().is_err());

        config = create_test_config();
        config.presentation.page_size = 0;
        assert!(config.validate().is_err());

        config = create_test_config();
        config
            .detector
            .taker_fees
            .insert(Venue::from("Binance"), dec!(1));
        assert!(config.validate().is_err());

        config = create_test_config();
        config.feed.source = DataSource::WebSocket { url: " ".to_string() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_configs_are_valid() {
        let default =
            EngineConfig::from_yaml_str(include_str!("../../../config/default.yml")).unwrap();
        default.validate().unwrap();
        assert_eq!(
            default.detector.taker_fees.get(&Venue::from("Kraken")),
            Some(&dec!(0.0026))
        );

        let replay =
            EngineConfig::from_yaml_str(include_str!("../../../config/replay.yml")).unwrap();
        replay.validate().unwrap();
        assert!(matches!(replay.feed.source, DataSource::File { replay_delay_ms: 250, .. }));
    }

    #[tokio::test]
    async fn test_async_load_from_path() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "presentation:\n  page_size: 25\n").unwrap();

        let config = load_config_from_path(temp_file.path()).await.unwrap();
        assert_eq!(config.presentation.page_size, 25);

        let dir = tempfile::tempdir().unwrap();
        let missing = load_config_from_path(&dir.path().join("nope.yml"))
            .await
            .unwrap();
        assert_eq!(missing, EngineConfig::default());
    }
}
