use anyhow::{Result, bail};
use clap::{ArgMatches, parser::ValueSource};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};

use andrew_server::{ServerConfig, TlsConfig};

pub const DEFAULT_CONFIG_FILE: &str = "./andrew.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AndrewConfig {
    pub server: ServeConfig,
    /// Site configuration (from andrew-core)
    #[serde(flatten)]
    pub site: andrew_core::config::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServeConfig {
    /// Directory served as the site root
    pub content_root: String,
    /// Address to listen on
    pub address: String,
    /// PEM certificate, enables https together with `private_key`
    pub cert: Option<String>,
    pub private_key: Option<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            content_root: ".".to_string(),
            address: ":8080".to_string(),
            cert: None,
            private_key: None,
        }
    }
}

/// `ANDREW_SERVER__ADDRESS`, `ANDREW_SITE__BASE_URL` and so on
pub fn environment() -> Environment {
    Environment::with_prefix("ANDREW")
        .prefix_separator("_")
        .separator("__")
}

impl AndrewConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (ANDREW_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        Self::load_with(args, environment())
    }

    pub fn load_with(args: &ArgMatches, env: Environment) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        // 2. Add the configuration file. The default location is optional,
        // one named on the command line is not.
        match given(args, "config") {
            Some(file) => {
                builder = builder.add_source(File::new(file, FileFormat::Toml));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml));
            }
            None => {}
        }

        // 3. Add environment variables with ANDREW_ prefix
        builder = builder.add_source(env);

        // 4. Override with CLI arguments (highest priority)
        let mut cli_overrides = HashMap::new();
        let flags = [
            ("content_root", "server.content_root"),
            ("address", "server.address"),
            ("base_url", "site.base_url"),
            ("cert", "server.cert"),
            ("private_key", "server.private_key"),
        ];
        for (arg, key) in flags {
            if let Some(value) = given(args, arg) {
                cli_overrides.insert(key.to_string(), value.to_string());
            }
        }

        if !cli_overrides.is_empty() {
            builder = builder.add_source(ConfigBuilder::try_from(&cli_overrides)?);
        }

        let config: AndrewConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Certificate and key come as a pair of existing files.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        match (&server.cert, &server.private_key) {
            (None, None) => Ok(()),
            (Some(_), None) | (None, Some(_)) => {
                bail!("a certificate and a private key must be given together")
            }
            (Some(cert), Some(key)) => {
                for file in [cert, key] {
                    if !Path::new(file).is_file() {
                        bail!("{file} does not exist");
                    }
                }
                Ok(())
            }
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        let tls = match (&self.server.cert, &self.server.private_key) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert: cert.into(),
                private_key: key.into(),
            }),
            _ => None,
        };

        ServerConfig {
            content_root: self.server.content_root.clone().into(),
            address: self.server.address.clone(),
            site: self.site.site.clone(),
            tls,
        }
    }
}

/// An argument's value, only when it was typed on the command line.
fn given<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a String> {
    match args.try_get_one::<String>(id) {
        Ok(Some(value)) if args.value_source(id) == Some(ValueSource::CommandLine) => Some(value),
        _ => None,
    }
}
