//! Configuration management with validation and defaults
//!
//! Every game constant lives here so a deployment can retune stakes, odds and
//! timings from a TOML file or `CASINO_*` environment variables.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::cases::CaseConfig;
use crate::odds::OddsEntry;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub wallet: WalletConfig,
    pub crash: CrashConfig,
    pub mines: MinesConfig,
    pub coinflip: CoinflipConfig,
    pub tap: TapConfig,
    pub presentation: PresentationConfig,
    pub storage: StorageConfig,
    pub history: HistoryConfig,
    pub cases: Vec<CaseConfig>,
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            wallet: WalletConfig::default(),
            crash: CrashConfig::default(),
            mines: MinesConfig::default(),
            coinflip: CoinflipConfig::default(),
            tap: TapConfig::default(),
            presentation: PresentationConfig::default(),
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
            cases: default_cases(),
        }
    }
}

impl CasinoConfig {
    /// Look up a case by name
    pub fn case(&self, name: &str) -> Option<&CaseConfig> {
        self.cases.iter().find(|c| c.name == name)
    }
}

/// Balance owner defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub initial_balance: f64,
    pub initial_tap_power: u32,
    /// Balance spent on one upgrade, for both tap power and coin tap power
    pub tap_upgrade_cost: f64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100.0,
            initial_tap_power: 1,
            tap_upgrade_cost: 50.0,
        }
    }
}

/// Crash game tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub min_stake: f64,
    /// Multiplier added per tick
    pub step: f64,
    pub tick_interval_ms: u64,
    /// Chance of sampling the crash point from the wide range
    pub high_roll_probability: f64,
    /// Upper bound of the wide crash point range (lower bound is 1.0)
    pub high_roll_max: f64,
    /// Upper bound of the narrow crash point range
    pub low_roll_max: f64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            min_stake: 30.0,
            step: 0.1,
            tick_interval_ms: 100,
            high_roll_probability: 0.29,
            high_roll_max: 5.0,
            low_roll_max: 3.0,
        }
    }
}

impl CrashConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Mines game tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MinesConfig {
    pub min_stake: f64,
    pub grid_size: usize,
    pub mine_count: usize,
    /// Multiplier added per safe reveal
    pub step: f64,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            min_stake: 10.0,
            grid_size: 25,
            mine_count: 5,
            step: 0.3,
        }
    }
}

impl MinesConfig {
    pub fn safe_cells(&self) -> usize {
        self.grid_size - self.mine_count
    }
}

/// Coinflip tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinflipConfig {
    pub min_stake: f64,
    /// Gate applied after a matching call
    pub win_probability: f64,
    pub payout_multiplier: f64,
}

impl Default for CoinflipConfig {
    fn default() -> Self {
        Self {
            min_stake: 15.0,
            win_probability: 0.29,
            payout_multiplier: 2.0,
        }
    }
}

/// Coin tap game economy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    pub withdraw_threshold: u64,
    pub withdraw_amount: f64,
    pub subscribe_bonus: u64,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            withdraw_threshold: 3000,
            withdraw_amount: 200.0,
            subscribe_bonus: 30,
        }
    }
}

/// Cosmetic delays between a draw and its reveal
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub case_reveal_delay_ms: u64,
    pub coinflip_reveal_delay_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            case_reveal_delay_ms: 3000,
            coinflip_reveal_delay_ms: 2000,
        }
    }
}

impl PresentationConfig {
    pub fn case_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.case_reveal_delay_ms)
    }

    pub fn coinflip_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.coinflip_reveal_delay_ms)
    }
}

/// Where the CLI keeps persisted state
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: "casino_state.json".to_string(),
        }
    }
}

/// Settlement history retention
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Most recent records kept in memory; older ones are dropped but still
    /// counted in the stats
    pub max_records: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_records: 1000 }
    }
}

/// The three stock cases
pub fn default_cases() -> Vec<CaseConfig> {
    vec![
        CaseConfig::new(
            "Бомж",
            20.0,
            vec![
                OddsEntry::new(1.0, 30.0),
                OddsEntry::new(3.0, 30.0),
                OddsEntry::new(4.0, 30.0),
                OddsEntry::new(10.0, 22.0),
                OddsEntry::new(100.0, 2.0),
            ],
        ),
        CaseConfig::new(
            "Новичок",
            25.0,
            vec![
                OddsEntry::new(15.0, 50.0),
                OddsEntry::new(40.0, 20.0),
                OddsEntry::new(65.0, 19.0),
                OddsEntry::new(70.0, 18.0),
                OddsEntry::new(250.0, 15.0),
            ],
        ),
        CaseConfig::new(
            "Богатый",
            300.0,
            vec![
                OddsEntry::new(200.0, 30.0),
                OddsEntry::new(250.0, 27.0),
                OddsEntry::new(450.0, 20.0),
                OddsEntry::new(600.0, 13.0),
                OddsEntry::new(1500.0, 1.0),
                OddsEntry::new(2550.0, 0.1),
            ],
        ),
    ]
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        if config.cases.is_empty() {
            config.cases = default_cases();
        }

        Self::apply_env_overrides(&mut config)?;
        Self::validate(&config)?;

        tracing::debug!(cases = config.cases.len(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> CasinoResult<CasinoConfig> {
        toml::from_str(content).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
        })
    }

    fn apply_env_overrides(config: &mut CasinoConfig) -> CasinoResult<()> {
        if let Ok(balance) = env::var("CASINO_INITIAL_BALANCE") {
            config.wallet.initial_balance =
                balance.parse().map_err(|_| ConfigurationError::InvalidValue {
                    field: "CASINO_INITIAL_BALANCE".to_string(),
                    value: balance,
                    reason: "Not a number".to_string(),
                })?;
        }

        if let Ok(tick) = env::var("CASINO_CRASH_TICK_MS") {
            config.crash.tick_interval_ms =
                tick.parse().map_err(|_| ConfigurationError::InvalidValue {
                    field: "CASINO_CRASH_TICK_MS".to_string(),
                    value: tick,
                    reason: "Invalid tick interval".to_string(),
                })?;
        }

        if let Ok(path) = env::var("CASINO_STATE_PATH") {
            config.storage.state_path = path;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(config: &CasinoConfig) -> CasinoResult<()> {
        fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
            ConfigurationError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if config.wallet.initial_balance < 0.0 {
            return Err(invalid(
                "wallet.initial_balance",
                config.wallet.initial_balance,
                "Balance cannot be negative",
            )
            .into());
        }
        if config.wallet.tap_upgrade_cost <= 0.0 {
            return Err(invalid(
                "wallet.tap_upgrade_cost",
                config.wallet.tap_upgrade_cost,
                "Upgrade cost must be positive",
            )
            .into());
        }

        for (field, stake) in [
            ("crash.min_stake", config.crash.min_stake),
            ("mines.min_stake", config.mines.min_stake),
            ("coinflip.min_stake", config.coinflip.min_stake),
        ] {
            if stake <= 0.0 {
                return Err(invalid(field, stake, "Minimum stake must be positive").into());
            }
        }

        for (field, p) in [
            ("crash.high_roll_probability", config.crash.high_roll_probability),
            ("coinflip.win_probability", config.coinflip.win_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(field, p, "Probability must be within [0, 1]").into());
            }
        }

        if config.crash.step <= 0.0 {
            return Err(invalid("crash.step", config.crash.step, "Step must be positive").into());
        }
        if config.crash.tick_interval_ms == 0 {
            return Err(invalid("crash.tick_interval_ms", 0, "Tick interval cannot be zero").into());
        }
        if config.crash.low_roll_max <= 1.0 || config.crash.high_roll_max <= 1.0 {
            return Err(invalid(
                "crash.low_roll_max",
                config.crash.low_roll_max,
                "Crash ranges must end above 1.0",
            )
            .into());
        }

        if config.mines.mine_count == 0 || config.mines.mine_count >= config.mines.grid_size {
            return Err(invalid(
                "mines.mine_count",
                config.mines.mine_count,
                "Mine count must be between 1 and grid_size - 1",
            )
            .into());
        }
        if config.mines.step <= 0.0 {
            return Err(invalid("mines.step", config.mines.step, "Step must be positive").into());
        }

        if config.tap.withdraw_threshold == 0 {
            return Err(invalid("tap.withdraw_threshold", 0, "Threshold cannot be zero").into());
        }

        if config.history.max_records == 0 {
            let reason = "History must keep at least one record";
            return Err(invalid("history.max_records", 0, reason).into());
        }

        for case in &config.cases {
            case.validate()?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(config: &CasinoConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
