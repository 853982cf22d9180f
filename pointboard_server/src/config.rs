use std::env;

use log::*;
use pb_common::helpers::parse_boolean_flag;
use pointboard_engine::{
    helpers::{OrderNumberFormat, DEFAULT_ORDER_PREFIX},
    DEFAULT_VAT_RATE,
};

use crate::errors::ServerError;

const DEFAULT_PB_HOST: &str = "127.0.0.1";
const DEFAULT_PB_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/pointboard.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// The prefix of every order number this shop issues, e.g. `POINTBOARD`. Always upper case.
    pub order_prefix: String,
    /// The VAT rate applied to orders that include VAT but don't specify their own rate. Between 0 and 1.
    pub vat_rate: f64,
    /// If true, the embedded database migrations are run when the server starts.
    pub run_migrations: bool,
    /// The channel capacity for each event hook.
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PB_HOST.to_string(),
            port: DEFAULT_PB_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            vat_rate: DEFAULT_VAT_RATE,
            run_migrations: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PB_HOST").ok().unwrap_or_else(|| DEFAULT_PB_HOST.into());
        let port = env::var("PB_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PB_PORT. {e} Using the default, {DEFAULT_PB_PORT}, instead."
                    );
                    DEFAULT_PB_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PB_PORT);
        let database_url = env::var("PB_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PB_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections = env::var("PB_MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .or_else(|| {
                        warn!("🪛️ Invalid configuration value for PB_MAX_DB_CONNECTIONS: {s}");
                        None
                    })
            })
            .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS);
        let order_prefix = configure_order_prefix();
        let vat_rate = configure_vat_rate();
        let run_migrations = parse_boolean_flag(env::var("PB_RUN_MIGRATIONS").ok(), true);
        let event_buffer_size = env::var("PB_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .or_else(|| {
                        warn!("🪛️ Invalid configuration value for PB_EVENT_BUFFER_SIZE: {s}");
                        None
                    })
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            max_db_connections,
            order_prefix,
            vat_rate,
            run_migrations,
            event_buffer_size,
        }
    }

    /// The order-number format for the configured prefix.
    pub fn order_number_format(&self) -> Result<OrderNumberFormat, ServerError> {
        OrderNumberFormat::new(&self.order_prefix).map_err(|e| ServerError::ConfigurationError(e.to_string()))
    }
}

fn configure_order_prefix() -> String {
    match env::var("PB_ORDER_PREFIX") {
        Ok(s) => match OrderNumberFormat::new(&s) {
            Ok(format) => {
                info!("🪛️ Order numbers will use the prefix {}", format.prefix());
                format.prefix().to_string()
            },
            Err(e) => {
                warn!(
                    "🪛️ Invalid configuration value for PB_ORDER_PREFIX. {e}. Using {DEFAULT_ORDER_PREFIX} instead."
                );
                DEFAULT_ORDER_PREFIX.to_string()
            },
        },
        Err(_) => {
            info!("🪛️ PB_ORDER_PREFIX is not set. Using the default prefix, {DEFAULT_ORDER_PREFIX}.");
            DEFAULT_ORDER_PREFIX.to_string()
        },
    }
}

fn configure_vat_rate() -> f64 {
    env::var("PB_VAT_RATE")
        .map_err(|_| info!("🪛️ PB_VAT_RATE is not set. Using the default value of {DEFAULT_VAT_RATE}."))
        .and_then(|s| {
            s.parse::<f64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for PB_VAT_RATE. {e}"))
                .and_then(|rate| {
                    if (0.0..=1.0).contains(&rate) {
                        Ok(rate)
                    } else {
                        warn!("🪛️ PB_VAT_RATE must be between 0 and 1, but was {rate}");
                        Err(())
                    }
                })
        })
        .ok()
        .unwrap_or(DEFAULT_VAT_RATE)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers are allowed to see.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub order_prefix: String,
    pub vat_rate: f64,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { order_prefix: config.order_prefix.clone(), vat_rate: config.vat_rate }
    }
}
