//! Process configuration, read once at startup.

use chrono::Duration;
use thiserror::Error;

use storefront_core::{CustomerId, Money};
use storefront_gateways::{HostedConfig, WalletConfig};
use storefront_invoicing::BillingPolicy;
use storefront_orders::PricingPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid {
        key: &'static str,
        message: String,
    },
}

/// Everything the process needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres mode when set; in-memory stores otherwise.
    pub use_persistent_stores: bool,
    /// Required only in Postgres mode.
    pub database_url: Option<String>,
    pub hosted: HostedConfig,
    pub wallet: WalletConfig,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    /// Pending orders older than this are swept to Cancelled.
    pub checkout_expiry: Duration,
    pub pricing: PricingPolicy,
    pub billing: BillingPolicy,
    /// Staff accounts alerted about newly paid orders.
    pub staff_recipients: Vec<CustomerId>,
}

impl AppConfig {
    /// Build the configuration from the environment.
    ///
    /// Provider credentials are always required; `DATABASE_URL` only when
    /// `USE_PERSISTENT_STORES` selects Postgres.
    pub fn from_env() -> Result<Self, ConfigError> {
        let use_persistent_stores = flag("USE_PERSISTENT_STORES");
        let database_url = optional("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let hosted = HostedConfig {
            base_url: required("HOSTED_BASE_URL")?,
            api_key: required("HOSTED_API_KEY")?,
            signing_secret: required("HOSTED_SIGNING_SECRET")?,
            signature_tolerance_secs: parsed("HOSTED_SIGNATURE_TOLERANCE_SECS", 300)?,
        };
        let wallet = WalletConfig {
            base_url: required("WALLET_BASE_URL")?,
            client_id: required("WALLET_CLIENT_ID")?,
            client_secret: required("WALLET_CLIENT_SECRET")?,
        };

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            use_persistent_stores,
            database_url,
            hosted,
            wallet,
            checkout_success_url: optional("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|| "https://shop.example/checkout/success".to_string()),
            checkout_cancel_url: optional("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|| "https://shop.example/checkout/cancel".to_string()),
            checkout_expiry: Duration::minutes(parsed("CHECKOUT_EXPIRY_MINUTES", 60)?),
            pricing: PricingPolicy {
                epsilon: Money::from_cents(parsed("PRICING_EPSILON_CENTS", 1)?),
            },
            billing: BillingPolicy {
                tax_rate_bps: parsed("BILLING_TAX_RATE_BPS", 2000)?,
                due_days: parsed("BILLING_DUE_DAYS", 30)?,
            },
            staff_recipients: staff_recipients()?,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
    matches!(
        std::env::var(key).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}

/// `STAFF_RECIPIENTS` is a comma-separated list of customer ids.
fn staff_recipients() -> Result<Vec<CustomerId>, ConfigError> {
    let Some(raw) = optional("STAFF_RECIPIENTS") else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                key: "STAFF_RECIPIENTS",
                message: format!("{s} is not a valid customer id"),
            })
        })
        .collect()
}
