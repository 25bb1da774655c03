use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::penalty::PenaltyConfig;

/// client configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RentalConfig {
    pub pricing: PricingConfig,
    pub limits: RentalLimits,
    pub api: ApiConfig,
}

/// prices used for previews; the backend keeps its own
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// fallback when the settings service has no rate
    pub daily_rate: Money,
    /// default per-day late fine offered on the return form
    pub fine_per_day: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            daily_rate: Money::from_major(2_500),
            fine_per_day: Money::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentalLimits {
    /// loans a borrower may hold at once
    pub max_active_loans: u32,
    /// rows per table page
    pub page_size: u32,
}

impl Default for RentalLimits {
    fn default() -> Self {
        Self {
            max_active_loans: 5,
            page_size: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// refresh the token when it expires sooner than this
    pub token_min_validity_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token_min_validity_secs: 30,
        }
    }
}

impl RentalLimits {
    /// number of pages needed for `rows` rows; at least one
    pub fn page_count(&self, rows: usize) -> usize {
        let size = self.page_size.max(1) as usize;
        rows.div_ceil(size).max(1)
    }

    /// rows shown on zero-based `page`; past the end yields an empty slice
    pub fn page<'a, T>(&self, rows: &'a [T], page: usize) -> &'a [T] {
        let size = self.page_size.max(1) as usize;
        let start = page.saturating_mul(size).min(rows.len());
        let end = start.saturating_add(size).min(rows.len());
        &rows[start..end]
    }
}

impl ApiConfig {
    pub fn token_min_validity(&self) -> Duration {
        Duration::seconds(i64::from(self.token_min_validity_secs))
    }
}

impl RentalConfig {
    /// defaults with a different daily rate
    pub fn with_daily_rate(daily_rate: Money) -> Self {
        Self {
            pricing: PricingConfig {
                daily_rate,
                ..PricingConfig::default()
            },
            ..Self::default()
        }
    }

    /// parse and validate; missing sections fall back to defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| RentalError::InvalidConfiguration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pricing.daily_rate.is_positive() {
            return Err(invalid("daily rate must be > 0"));
        }
        if self.pricing.fine_per_day.is_negative() {
            return Err(invalid("fine per day cannot be negative"));
        }
        if self.limits.max_active_loans == 0 {
            return Err(invalid("max active loans must be > 0"));
        }
        if self.limits.page_size == 0 {
            return Err(invalid("page size must be > 0"));
        }
        Ok(())
    }

    pub fn penalty_config(&self) -> PenaltyConfig {
        PenaltyConfig::new(self.pricing.fine_per_day)
    }
}

fn invalid(message: &str) -> RentalError {
    RentalError::InvalidConfiguration {
        message: message.to_string(),
    }
}
