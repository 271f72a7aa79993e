//! Scanner configuration: thresholds, pipeline knobs and logging.
//!
//! Every value has a default, so an empty TOML document (or no file at all)
//! yields the stock configuration:
//!
//! ```toml
//! [scan]
//! market = "listed"
//! backoff_secs = 60
//! max_passes = 2
//! concurrency = 1
//!
//! [scan.detection]
//! range_day = 10
//! stable_rate = 1.3333333333333333
//! min_volume = 500000.0
//!
//! [scan.liquidity]
//! min_trade_value = 40000000
//! min_trade_volume = 500000
//!
//! [log]
//! dir = "logs"
//! file_prefix = "scan"
//! retention_files = 7
//! ```
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`]. Both validate
//! the result with [`AppConfig::validate`].

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use market_data_ingestor::models::{market::Market, report::CombinedRecord};
use serde::{Deserialize, Serialize};
use shared_utils::env::env_var_or;

/// Overrides [`LogConfig::dir`] when set.
pub const LOG_DIR_ENV: &str = "BREAKOUT_SCAN_LOG_DIR";

/// Thresholds of the explosive-move detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Lookback window in trading days, also the window of the volume average
    /// the stability and breakout checks compare against.
    pub range_day: usize,
    /// Multiplier defining a "normal" day's volume ceiling relative to its own
    /// volume average.
    pub stable_rate: f64,
    /// Minimum `range_day` volume average on the day before the breakout.
    pub min_volume: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            range_day: 10,
            stable_rate: 4.0 / 3.0,
            min_volume: 500_000.0,
        }
    }
}

/// Coarse liquidity filter applied to the reconciled reports before any
/// history is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiquidityFilter {
    /// Minimum traded value on the report day.
    pub min_trade_value: i64,
    /// Minimum traded shares on the report day.
    pub min_trade_volume: i64,
}

impl Default for LiquidityFilter {
    fn default() -> Self {
        Self {
            min_trade_value: 40_000_000,
            min_trade_volume: 500_000,
        }
    }
}

impl LiquidityFilter {
    /// Whether a security trades enough to be worth fetching history for.
    /// Missing values never pass.
    pub fn admits(&self, record: &CombinedRecord) -> bool {
        matches!(record.trade.trade_value, Some(v) if v >= self.min_trade_value)
            && matches!(record.trade.trade_volume, Some(v) if v >= self.min_trade_volume)
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Detector thresholds.
    pub detection: DetectionConfig,
    /// Report-level liquidity filter.
    pub liquidity: LiquidityFilter,
    /// Board whose suffix the historical feed expects.
    pub market: Market,
    /// Suspension after the historical feed signals rate limiting.
    pub backoff_secs: u64,
    /// Passes over the universe; every pass after the first only revisits
    /// securities that were rate-limited in the previous one.
    pub max_passes: usize,
    /// Securities evaluated at the same time. Results keep input order.
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            liquidity: LiquidityFilter::default(),
            market: Market::Listed,
            backoff_secs: 60,
            max_passes: 2,
            concurrency: 1,
        }
    }
}

impl ScanConfig {
    /// [`backoff_secs`](Self::backoff_secs) as a duration.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Log file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Directory holding the rotated log files.
    pub dir: PathBuf,
    /// File name prefix; files are named `<prefix>.<date>.log`.
    pub file_prefix: String,
    /// Rotated files to keep (one per day).
    pub retention_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_prefix: "scan".to_string(),
            retention_files: 7,
        }
    }
}

impl LogConfig {
    /// The log directory, honouring [`LOG_DIR_ENV`].
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(env_var_or(LOG_DIR_ENV, &self.dir.to_string_lossy()))
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Pipeline settings.
    pub scan: ScanConfig,
    /// Logging settings.
    pub log: LogConfig,
}

impl AppConfig {
    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let d = &self.scan.detection;
        if d.range_day == 0 {
            bail!("scan.detection.range_day must be at least 1");
        }
        if !(d.stable_rate.is_finite() && d.stable_rate > 0.0) {
            bail!("scan.detection.stable_rate must be a positive number");
        }
        if !d.min_volume.is_finite() || d.min_volume < 0.0 {
            bail!("scan.detection.min_volume must be a non-negative number");
        }
        if self.scan.max_passes == 0 {
            bail!("scan.max_passes must be at least 1");
        }
        if self.scan.concurrency == 0 {
            bail!("scan.concurrency must be at least 1");
        }
        if self.log.file_prefix.trim().is_empty() {
            bail!("log.file_prefix cannot be empty");
        }
        if self.log.retention_files == 0 {
            bail!("log.retention_files must be at least 1");
        }
        Ok(())
    }
}

/// Parse and validate a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Read a configuration file from disk, parse and validate it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_data_ingestor::models::report::{DailyTradeRecord, ValuationRecord};
    use serial_test::serial;

    fn record(volume: Option<i64>, value: Option<i64>) -> CombinedRecord {
        CombinedRecord {
            trade: DailyTradeRecord {
                code: "2330".into(),
                name: "TSMC".into(),
                trade_volume: volume,
                trade_value: value,
                opening_price: None,
                highest_price: None,
                lowest_price: None,
                closing_price: None,
            },
            valuation: ValuationRecord {
                code: "2330".into(),
                name: "TSMC".into(),
                pe_ratio: None,
                dividend_yield: None,
                pb_ratio: None,
            },
        }
    }

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(load_config_str("").unwrap(), AppConfig::default());
        let d = DetectionConfig::default();
        assert_eq!(d.range_day, 10);
        assert_eq!(d.stable_rate, 4.0 / 3.0);
        assert_eq!(d.min_volume, 500_000.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = load_config_str(
            r#"
            [scan]
            market = "otc"
            [scan.detection]
            range_day = 15
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scan.market, Market::Otc);
        assert_eq!(cfg.scan.detection.range_day, 15);
        assert_eq!(cfg.scan.detection.min_volume, 500_000.0);
        assert_eq!(cfg.scan.backoff(), Duration::from_secs(60));
        assert_eq!(cfg.log.retention_files, 7);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        assert!(load_config_str("[scan]\nspeed = 3").is_err());
        let err = load_config_str("[scan.detection]\nrange_day = 0").unwrap_err();
        assert!(format!("{err:#}").contains("range_day"));
        assert!(load_config_str("[scan]\nconcurrency = 0").is_err());
    }

    #[test]
    fn reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "[log]\nfile_prefix = \"breakout\"\n").unwrap();
        assert_eq!(load_config_path(&path).unwrap().log.file_prefix, "breakout");
        assert!(load_config_path(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn liquidity_filter_requires_both_values() {
        let f = LiquidityFilter::default();
        assert!(f.admits(&record(Some(500_000), Some(40_000_000))));
        assert!(!f.admits(&record(Some(499_999), Some(40_000_000))));
        assert!(!f.admits(&record(Some(900_000), None)));
        assert!(!f.admits(&record(None, Some(90_000_000))));
    }

    #[test]
    #[serial]
    fn log_dir_env_override() {
        let cfg = LogConfig::default();
        // SAFETY: env mutation is serialized by `#[serial]`.
        unsafe { std::env::set_var(LOG_DIR_ENV, "/tmp/breakout-logs") };
        assert_eq!(cfg.resolved_dir(), PathBuf::from("/tmp/breakout-logs"));
        unsafe { std::env::remove_var(LOG_DIR_ENV) };
        assert_eq!(cfg.resolved_dir(), PathBuf::from("logs"));
    }
}
