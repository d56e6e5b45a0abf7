use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// A confirmed booking is cancellable only this many hours before departure
    #[serde(default = "default_cancellation_window")]
    pub cancellation_window_hours: i64,

    /// How long a pending booking holds its seats while payment is retried,
    /// measured from booking creation
    #[serde(default = "default_retry_window")]
    pub payment_retry_window_minutes: i64,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_seconds: u64,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_cancellation_window() -> i64 {
    24
}

fn default_retry_window() -> i64 {
    120
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            cancellation_window_hours: default_cancellation_window(),
            payment_retry_window_minutes: default_retry_window(),
            gateway_timeout_seconds: default_gateway_timeout(),
            currency: default_currency(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            // CORVIA_BUSINESS_RULES__CURRENCY=EUR etc.
            .add_source(config::Environment::with_prefix("CORVIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rules = BusinessRules::default();
        assert_eq!(rules.cancellation_window_hours, 24);
        assert_eq!(rules.payment_retry_window_minutes, 120);
        assert_eq!(rules.gateway_timeout_seconds, 10);
        assert_eq!(rules.currency, "USD");
    }
}
