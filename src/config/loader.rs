use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use std::path::Path;

use super::schema::Config;
use crate::error::{ConfigError, Result};

pub fn load_from_env_or_file() -> Result<Config> {
    let config: Config = Figment::new()
        // Try to load from various config files
        .merge(Toml::file("mproxy.toml"))
        .merge(Json::file("mproxy.json"))
        .merge(Yaml::file("mproxy.yaml"))
        .merge(Yaml::file("mproxy.yml"))
        // Override with environment variables (MPROXY_ prefix)
        .merge(Env::prefixed("MPROXY_").split("_"))
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config)?;

    Ok(config)
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MPROXY_").split("_"))
            .extract(),
        Some("json") => Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("MPROXY_").split("_"))
            .extract(),
        Some("yaml") | Some("yml") => Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MPROXY_").split("_"))
            .extract(),
        _ => {
            return Err(ConfigError::Parse(
                "Unsupported config file format. Use .toml, .json, .yaml, or .yml".into(),
            )
            .into())
        }
    };

    let config = config.map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if let Some(next_hop) = &config.next_hop {
        let mut parts = next_hop.splitn(2, ':');
        let host = parts.next().unwrap_or_default();
        let port = parts.next().unwrap_or_default();
        if host.is_empty() || port.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Next hop '{next_hop}' is not of the form host:port"
            ))
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformMode;
    use std::io::Write;
    use std::sync::Mutex;

    // Every load merges MPROXY_ variables, so tests that set them must
    // not interleave with other loader tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn load_from_toml_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = write_config(
            "nextHop = \"127.0.0.1:9000\"\ntransform = \"encodeOnServerWrite\"\n\n[listen]\nport = 9090\n",
        );

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.listen.port, 9090);
        assert_eq!(config.next_hop.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.transform, TransformMode::EncodeOnServerWrite);
    }

    #[test]
    fn env_variable_overrides_file_value() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = write_config("[listen]\nport = 9090\n");

        std::env::set_var("MPROXY_LISTEN_PORT", "7777");
        let result = load_from_path(file.path());
        std::env::remove_var("MPROXY_LISTEN_PORT");

        assert_eq!(result.unwrap().listen.port, 7777);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let result = load_from_path("mproxy.ini");
        assert!(result.is_err());
    }

    #[test]
    fn next_hop_without_port_fails_validation() {
        let config = Config {
            next_hop: Some("localhost".to_string()),
            ..Config::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn next_hop_with_empty_port_fails_validation() {
        let config = Config {
            next_hop: Some("localhost:".to_string()),
            ..Config::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn well_formed_next_hop_passes_validation() {
        let config = Config {
            next_hop: Some("example.com:8081".to_string()),
            ..Config::default()
        };
        assert!(validate(&config).is_ok());
    }
}
