use std::env;

use log::*;
use reepay_api::ReepayConfig;
use rpg_common::helpers::parse_boolean_flag;
use rpg_engine::settlement::SettleConfig;

const DEFAULT_RPG_HOST: &str = "127.0.0.1";
const DEFAULT_RPG_PORT: u16 = 8380;
const DEFAULT_LOCALE: &str = "en_US";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The publicly reachable base url of this server. When set, the webhook url `<base>/webhook` is registered
    /// with the processor at startup.
    pub public_url: Option<String>,
    /// Which product categories are captured immediately at authorization time.
    pub settle_config: SettleConfig,
    /// Locale passed to hosted payment sessions.
    pub locale: String,
    /// Where the processor redirects the customer after a successful session.
    pub accept_url: String,
    /// Where the processor redirects the customer after an abandoned session.
    pub cancel_url: String,
    /// When true, sessions carry only the order total instead of itemized order lines.
    pub skip_order_lines: bool,
    /// Credentials and endpoints for the processor API.
    pub reepay: ReepayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPG_HOST.to_string(),
            port: DEFAULT_RPG_PORT,
            public_url: None,
            settle_config: SettleConfig::default(),
            locale: DEFAULT_LOCALE.to_string(),
            accept_url: String::default(),
            cancel_url: String::default(),
            skip_order_lines: false,
            reepay: ReepayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPG_HOST").ok().unwrap_or_else(|| DEFAULT_RPG_HOST.into());
        let port = env::var("RPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RPG_PORT. {e} Using the default, {DEFAULT_RPG_PORT}, instead."
                    );
                    DEFAULT_RPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RPG_PORT);
        let public_url = env::var("RPG_PUBLIC_URL").ok().map(|url| url.trim_end_matches('/').to_string());
        if public_url.is_none() {
            warn!("🪛️ RPG_PUBLIC_URL is not set. The webhook url will not be registered with the processor.");
        }
        let settle_config = env::var("RPG_INSTANT_SETTLE")
            .map(|list| SettleConfig::from_list(&list))
            .unwrap_or_else(|_| {
                info!("🪛️ RPG_INSTANT_SETTLE is not set. No order categories will be settled instantly.");
                SettleConfig::default()
            });
        let locale = env::var("RPG_LOCALE").ok().unwrap_or_else(|| DEFAULT_LOCALE.into());
        let accept_url = env::var("RPG_ACCEPT_URL").unwrap_or_else(|_| {
            warn!("🪛️ RPG_ACCEPT_URL is not set. Customers will not be redirected back after paying.");
            String::default()
        });
        let cancel_url = env::var("RPG_CANCEL_URL").unwrap_or_else(|_| {
            warn!("🪛️ RPG_CANCEL_URL is not set. Customers will not be redirected back after cancelling.");
            String::default()
        });
        let skip_order_lines = parse_boolean_flag(env::var("RPG_SKIP_ORDER_LINES").ok(), false);
        let reepay = ReepayConfig::new_from_env_or_default();
        Self { host, port, public_url, settle_config, locale, accept_url, cancel_url, skip_order_lines, reepay }
    }

    /// The webhook url to register with the processor, if a public url is configured.
    pub fn webhook_url(&self) -> Option<String> {
        self.public_url.as_ref().map(|base| format!("{base}/webhook"))
    }
}
