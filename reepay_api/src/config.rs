use log::*;
use rpg_common::{helpers::parse_boolean_flag, Secret};

pub const DEFAULT_API_BASE_URL: &str = "https://api.reepay.com";
pub const DEFAULT_CHECKOUT_BASE_URL: &str = "https://checkout-api.reepay.com";

#[derive(Debug, Clone)]
pub struct ReepayConfig {
    /// Base url for the core API (charges, invoices, account settings).
    pub api_base_url: String,
    /// Base url for the checkout API (hosted payment sessions).
    pub checkout_base_url: String,
    /// The live-mode merchant private key.
    pub private_key: Secret<String>,
    /// The test-mode merchant private key.
    pub private_key_test: Secret<String>,
    /// When true, the test key is used and customers are created as test customers.
    pub test_mode: bool,
}

impl Default for ReepayConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            checkout_base_url: DEFAULT_CHECKOUT_BASE_URL.to_string(),
            private_key: Secret::default(),
            private_key_test: Secret::default(),
            test_mode: true,
        }
    }
}

impl ReepayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base_url =
            std::env::var("REEPAY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let checkout_base_url =
            std::env::var("REEPAY_CHECKOUT_BASE_URL").unwrap_or_else(|_| DEFAULT_CHECKOUT_BASE_URL.to_string());
        let private_key = Secret::new(std::env::var("REEPAY_PRIVATE_KEY").unwrap_or_else(|_| {
            warn!("REEPAY_PRIVATE_KEY is not set. Live-mode API calls will be rejected by the processor.");
            String::default()
        }));
        let private_key_test = Secret::new(std::env::var("REEPAY_PRIVATE_KEY_TEST").unwrap_or_else(|_| {
            warn!("REEPAY_PRIVATE_KEY_TEST is not set. Test-mode API calls will be rejected by the processor.");
            String::default()
        }));
        let test_mode = parse_boolean_flag(std::env::var("REEPAY_TEST_MODE").ok(), true);
        if test_mode {
            info!("Reepay client is running in test mode.");
        }
        Self { api_base_url, checkout_base_url, private_key, private_key_test, test_mode }
    }

    /// The private key for the currently active mode (test or live).
    pub fn active_key(&self) -> &Secret<String> {
        if self.test_mode {
            &self.private_key_test
        } else {
            &self.private_key
        }
    }
}
