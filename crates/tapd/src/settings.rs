//! Startup settings: config file, environment and flags merged.
//!
//! Precedence, highest first: command-line flag, environment variable
//! (clap reads `BACKEND_URL` / `STUDENTTASK_URL` into the same flag),
//! config file, built-in default.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

use tap_core::config::{DEFAULT_SIMULATOR_PORT, RegistrationConfig};
use tap_core::{ControllerConfig, ServiceConfig};

/// Values taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub backend_url: Option<String>,
    pub studenttask_url: Option<String>,
    pub skip_registration: bool,
}

/// Simulator address and the address the simulator should call back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub simulator_url: String,
    pub studenttask_url: String,
}

/// Resolve both endpoints.
///
/// Without a simulator URL the service assumes a simulator on the local
/// host and a container reaching us through `host.docker.internal`.
pub fn resolve_endpoints(
    backend_url: Option<&str>,
    studenttask_url: Option<&str>,
    port: u16,
) -> Endpoints {
    match backend_url {
        Some(simulator_url) => Endpoints {
            simulator_url: simulator_url.to_string(),
            studenttask_url: studenttask_url
                .map(str::to_string)
                .unwrap_or_else(|| format!("http://localhost:{port}/")),
        },
        None => {
            warn!("no simulator url configured, using localhost and host.docker.internal");
            Endpoints {
                simulator_url: format!("http://localhost:{DEFAULT_SIMULATOR_PORT}/"),
                studenttask_url: studenttask_url
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("http://host.docker.internal:{port}/")),
            }
        }
    }
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub endpoints: Endpoints,
    pub registration: RegistrationConfig,
    pub controller: ControllerConfig,
}

impl Settings {
    pub fn resolve(config: ServiceConfig, overrides: Overrides) -> anyhow::Result<Self> {
        config.validate()?;

        let host: IpAddr = config
            .server
            .host
            .parse()
            .with_context(|| format!("invalid server.host {:?}", config.server.host))?;
        let port = overrides.port.unwrap_or(config.server.port);

        let backend_url = overrides.backend_url.or(config.simulator.url);
        let studenttask_url = overrides.studenttask_url.or(config.simulator.own_url);
        let endpoints = resolve_endpoints(backend_url.as_deref(), studenttask_url.as_deref(), port);

        let mut registration = config.registration;
        if overrides.skip_registration {
            registration.enabled = false;
        }

        Ok(Self {
            listen: SocketAddr::new(host, port),
            endpoints,
            registration,
            controller: config.controller,
        })
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration.timeout_ms)
    }

    pub fn registration_backoff(&self) -> Duration {
        Duration::from_millis(self.registration.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_backend_url() {
        let e = resolve_endpoints(None, None, 7777);
        assert_eq!(e.simulator_url, "http://localhost:3000/");
        assert_eq!(e.studenttask_url, "http://host.docker.internal:7777/");
    }

    #[test]
    fn backend_url_switches_own_default_to_localhost() {
        let e = resolve_endpoints(Some("http://simulator:3000/"), None, 7777);
        assert_eq!(e.simulator_url, "http://simulator:3000/");
        assert_eq!(e.studenttask_url, "http://localhost:7777/");
    }

    #[test]
    fn explicit_studenttask_url_wins() {
        let e = resolve_endpoints(Some("http://simulator:3000/"), Some("http://tap:9000/"), 7777);
        assert_eq!(e.studenttask_url, "http://tap:9000/");
    }

    #[test]
    fn own_url_follows_port() {
        let e = resolve_endpoints(None, None, 8123);
        assert_eq!(e.studenttask_url, "http://host.docker.internal:8123/");
    }

    #[test]
    fn flags_override_config_file() {
        let mut config = ServiceConfig::default();
        config.server.port = 9000;
        config.simulator.url = Some("http://from-file:3000/".to_string());

        let settings = Settings::resolve(
            config,
            Overrides {
                port: Some(7000),
                backend_url: Some("http://from-flag:3000/".to_string()),
                studenttask_url: None,
                skip_registration: true,
            },
        )
        .unwrap();

        assert_eq!(settings.listen.port(), 7000);
        assert_eq!(settings.endpoints.simulator_url, "http://from-flag:3000/");
        assert_eq!(settings.endpoints.studenttask_url, "http://localhost:7000/");
        assert!(!settings.registration.enabled);
    }

    #[test]
    fn config_file_used_without_flags() {
        let mut config = ServiceConfig::default();
        config.simulator.url = Some("http://from-file:3000/".to_string());
        config.simulator.own_url = Some("http://tap:7777/".to_string());

        let settings = Settings::resolve(config, Overrides::default()).unwrap();
        assert_eq!(settings.listen, "0.0.0.0:7777".parse().unwrap());
        assert_eq!(settings.endpoints.simulator_url, "http://from-file:3000/");
        assert_eq!(settings.endpoints.studenttask_url, "http://tap:7777/");
        assert!(settings.registration.enabled);
        assert_eq!(settings.registration_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn invalid_host_is_reported() {
        let mut config = ServiceConfig::default();
        config.server.host = "not-an-ip".to_string();
        let err = Settings::resolve(config, Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }
}
