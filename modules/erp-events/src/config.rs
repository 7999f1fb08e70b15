use event_outbox::DrainConfig;
use std::env;

/// Relay configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: BusType,
    pub nats_url: String,
    pub drain: DrainConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    InMemory,
    Nats,
}

impl std::str::FromStr for BusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmemory" => Ok(BusType::InMemory),
            "nats" => Ok(BusType::Nats),
            other => Err(format!(
                "Invalid BUS_TYPE: {other}. Must be 'inmemory' or 'nats'"
            )),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bus_type = env::var("BUS_TYPE")
            .unwrap_or_else(|_| "inmemory".to_string())
            .parse()?;

        let nats_url = env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let drain = DrainConfig::from_env()?;

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            drain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for var in ["DATABASE_URL", "BUS_TYPE", "NATS_URL"] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn database_url_is_required() {
        clear();
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn defaults_to_in_memory_bus() {
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/erp");

        let config = Config::from_env().unwrap();
        clear();

        assert_eq!(config.bus_type, BusType::InMemory);
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.drain.batch_size, 100);
    }

    #[test]
    #[serial]
    fn rejects_unknown_bus() {
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/erp");
        env::set_var("BUS_TYPE", "kafka");

        let err = Config::from_env().unwrap_err();
        clear();

        assert!(err.contains("kafka"));
    }

    #[test]
    fn bus_type_is_case_insensitive() {
        assert_eq!("NATS".parse::<BusType>(), Ok(BusType::Nats));
    }
}
