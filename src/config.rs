use std::env;
use std::str::FromStr;

use serde::Serialize;

/// Whether rental prices are shown and summed on events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    None,
    /// Billing only applies to events flagged billable.
    #[default]
    Partial,
    All,
}

impl FromStr for BillingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BillingMode::None),
            "partial" => Ok(BillingMode::Partial),
            "all" => Ok(BillingMode::All),
            other => Err(format!("unknown billing mode '{}'", other)),
        }
    }
}

/// Read-only billing settings handed to the code computing event totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingSettings {
    pub mode: BillingMode,
    pub currency: String,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            mode: BillingMode::default(),
            currency: "EUR".to_string(),
        }
    }
}

impl BillingSettings {
    /// Rental totals are computed for billable events unless billing is off.
    pub fn applies_to(&self, is_billable: bool) -> bool {
        match self.mode {
            BillingMode::None => false,
            BillingMode::Partial => is_billable,
            BillingMode::All => true,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub billing: BillingSettings,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let billing_mode = match env::var("BILLING_MODE") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to 'partial'", e);
                BillingMode::default()
            }),
            Err(_) => BillingMode::default(),
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://robert2.db?mode=rwc".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            billing: BillingSettings {
                mode: billing_mode,
                currency: env::var("CURRENCY").unwrap_or_else(|_| "EUR".to_string()),
            },
            seed_demo: env::var("SEED_DEMO").is_ok_and(|v| is_enabled(&v)),
        }
    }
}

/// Boolean env flags: only `1` and `true` turn them on
fn is_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert!(is_enabled("1"));
        assert!(is_enabled(" TRUE "));
        assert!(!is_enabled("0"));
        assert!(!is_enabled("false"));
        assert!(!is_enabled(""));
    }

    #[test]
    fn test_billing_mode_parsing() {
        assert_eq!("none".parse::<BillingMode>(), Ok(BillingMode::None));
        assert_eq!(" ALL ".parse::<BillingMode>(), Ok(BillingMode::All));
        assert!("sometimes".parse::<BillingMode>().is_err());
    }

    #[test]
    fn test_billing_applies_to_billable_events() {
        let mut billing = BillingSettings::default();
        assert!(billing.applies_to(true));
        assert!(!billing.applies_to(false));

        billing.mode = BillingMode::None;
        assert!(!billing.applies_to(true));

        billing.mode = BillingMode::All;
        assert!(billing.applies_to(false));
    }
}
