//! Serializable backtest configuration.
//!
//! Loaded from TOML; every field has a default so a partial file (or an empty
//! one) is valid:
//!
//! ```toml
//! [backtest]
//! symbol = "BTC-USD"
//! initial_capital = 10000.0
//! random_seed = 42
//!
//! [costs]
//! transaction_cost_rate = 0.001
//! slippage_factor = 0.0005
//!
//! [risk]
//! max_position_fraction = 0.95
//!
//! [ensemble]
//! buy_threshold = 0.3
//! sell_threshold = -0.3
//!
//! [ensemble.weights]
//! model = 0.4
//! technical = 0.35
//! sentiment = 0.25
//!
//! [strategy]
//! type = "ensemble"
//! ```

use std::path::{Path, PathBuf};

use fusionlab_core::ensemble::{EnsembleConfig, EnsembleError};
use fusionlab_core::providers::TechnicalConfig;
use fusionlab_core::risk::{RiskError, RiskPolicy};
use fusionlab_core::simulation::{CostError, CostModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid [backtest] section: {0}")]
    Backtest(String),
    #[error("invalid [costs] section: {0}")]
    Costs(#[from] CostError),
    #[error("invalid [risk] section: {0}")]
    Risk(#[from] RiskError),
    #[error("invalid [ensemble] section: {0}")]
    Ensemble(#[from] EnsembleError),
    #[error("invalid [strategy] section: {0}")]
    Strategy(String),
}

/// Top-level configuration for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub costs: CostModel,
    pub risk: RiskPolicy,
    pub ensemble: EnsembleConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    pub initial_capital: f64,
    /// Master seed for slippage jitter; combined with the symbol per run.
    pub random_seed: u64,
    /// Annual risk-free rate used by the Sharpe ratio.
    pub risk_free_rate: f64,
    /// Bars per year (252 for daily equities, 365 for daily crypto).
    pub annualization_periods: f64,
    /// Deadline per provider call. Unset runs providers inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_timeout_ms: Option<u64>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "UNKNOWN".to_string(),
            initial_capital: 10_000.0,
            random_seed: 42,
            risk_free_rate: 0.0,
            annualization_periods: 252.0,
            provider_timeout_ms: None,
        }
    }
}

/// Which built-in strategy drives the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Buy on the first decision bar and hold to the end.
    BuyAndHold,

    /// Technical indicator votes only.
    Technical {
        #[serde(default)]
        technical: TechnicalConfig,
    },

    /// Weighted fusion of model, technical and sentiment sources.
    Ensemble {
        #[serde(default)]
        technical: TechnicalConfig,
        #[serde(default)]
        model: ModelSettings,
        #[serde(default)]
        sentiment: SentimentSettings,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Ensemble {
            technical: TechnicalConfig::default(),
            model: ModelSettings::default(),
            sentiment: SentimentSettings::default(),
        }
    }
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::BuyAndHold => "buy_and_hold",
            StrategyConfig::Technical { .. } => "technical",
            StrategyConfig::Ensemble { .. } => "ensemble",
        }
    }
}

/// Model source settings. Precomputed probabilities, when supplied, take
/// precedence over the momentum model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub buy_above: f64,
    pub sell_below: f64,
    pub momentum_lookback: usize,
    pub momentum_sensitivity: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            buy_above: 0.6,
            sell_below: 0.4,
            momentum_lookback: 10,
            momentum_sensitivity: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    /// Polarity magnitudes at or below this read as Hold.
    pub neutral_band: f64,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self { neutral_band: 0.05 }
    }
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check every section. The runner calls this too, so configs built in
    /// code get the same checks as ones loaded from disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if !(b.initial_capital.is_finite() && b.initial_capital > 0.0) {
            return Err(ConfigError::Backtest(format!(
                "initial_capital must be positive, got {}",
                b.initial_capital
            )));
        }
        if !(b.annualization_periods.is_finite() && b.annualization_periods > 0.0) {
            return Err(ConfigError::Backtest(format!(
                "annualization_periods must be positive, got {}",
                b.annualization_periods
            )));
        }
        if !b.risk_free_rate.is_finite() {
            return Err(ConfigError::Backtest("risk_free_rate must be finite".into()));
        }
        if b.provider_timeout_ms == Some(0) {
            return Err(ConfigError::Backtest("provider_timeout_ms must be positive".into()));
        }
        self.costs.validate()?;
        self.risk.validate()?;
        self.ensemble.validate()?;

        let model_problems = |m: &ModelSettings| {
            let mut p = Vec::new();
            let cutoffs_ok = (0.0..=1.0).contains(&m.sell_below)
                && (0.0..=1.0).contains(&m.buy_above)
                && m.sell_below <= m.buy_above;
            if !cutoffs_ok {
                p.push("model cut-offs must satisfy 0 <= sell_below <= buy_above <= 1".to_string());
            }
            if m.momentum_lookback == 0 {
                p.push("momentum_lookback must be >= 1".to_string());
            }
            if !m.momentum_sensitivity.is_finite() {
                p.push("momentum_sensitivity must be finite".to_string());
            }
            p
        };
        let problems: Vec<String> = match &self.strategy {
            StrategyConfig::BuyAndHold => Vec::new(),
            StrategyConfig::Technical { technical } => technical.problems(),
            StrategyConfig::Ensemble {
                technical,
                model,
                sentiment,
            } => {
                let mut p = technical.problems();
                p.extend(model_problems(model));
                if !(0.0..1.0).contains(&sentiment.neutral_band) {
                    p.push("sentiment neutral_band must be in [0, 1)".to_string());
                }
                p
            }
        };
        if !problems.is_empty() {
            return Err(ConfigError::Strategy(problems.join("; ")));
        }
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }

    /// Copy of this config for another symbol.
    pub fn for_symbol(&self, symbol: &str) -> Self {
        let mut config = self.clone();
        config.backtest.symbol = symbol.to_string();
        config
    }
}
