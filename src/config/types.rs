use std::fmt;
use std::str::FromStr;

use anyhow::{Context, bail};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A TCP endpoint that must accept connections before startup proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .with_context(|| format!("expected host:port, got {s:?}"))?;
        if host.is_empty() {
            bail!("empty host in {s:?}");
        }
        let port = port
            .parse::<u16>()
            .with_context(|| format!("invalid port in {s:?}"))?;
        Ok(Self::new(host, port))
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EndpointVisitor;

        impl<'de> Visitor<'de> for EndpointVisitor {
            type Value = Endpoint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a \"host:port\" string or a {host, port} mapping")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Endpoint, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<Endpoint, A::Error> {
                #[derive(Deserialize)]
                struct Fields {
                    host: String,
                    port: u16,
                }

                let fields = Fields::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(Endpoint::new(fields.host, fields.port))
            }
        }

        deserializer.deserialize_any(EndpointVisitor)
    }
}

/// Escalation applied when a dependency exhausts its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTimeout {
    /// Log the timeout and start the mode anyway. Readiness stays advisory.
    Continue,
    /// Fail startup before any mode logic runs.
    Abort,
}

impl OnTimeout {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnTimeout::Continue => "continue",
            OnTimeout::Abort => "abort",
        }
    }
}

impl FromStr for OnTimeout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(OnTimeout::Continue),
            "abort" => Ok(OnTimeout::Abort),
            other => bail!("expected \"continue\" or \"abort\", got {other:?}"),
        }
    }
}

/// Whether dependencies are polled one at a time or concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    Sequential,
    Parallel,
}

impl WaitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStrategy::Sequential => "sequential",
            WaitStrategy::Parallel => "parallel",
        }
    }
}

impl FromStr for WaitStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(WaitStrategy::Sequential),
            "parallel" => Ok(WaitStrategy::Parallel),
            other => bail!("expected \"sequential\" or \"parallel\", got {other:?}"),
        }
    }
}

/// One immutable snapshot of everything the entrypoint needs.
///
/// Built once at startup from the optional dotfile plus environment
/// overrides, then passed by reference. No ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the serving modes bind to. `{port}` in a serve command expands
    /// to this value.
    pub port: u16,
    /// Seconds between readiness poll attempts. Fractions are accepted.
    pub sleep: f64,
    /// Maximum poll attempts per dependency.
    pub tries: u32,
    /// Dependencies that must accept a TCP connection in development.
    pub wait_for: Vec<Endpoint>,
    pub on_timeout: OnTimeout,
    pub wait_strategy: WaitStrategy,
    /// Development signal: enables the readiness phase.
    pub development: bool,
    /// CI signal: selects the machine-readable reporting branch in test mode.
    pub ci: bool,
    pub migrate_command: String,
    pub serve_command: String,
    pub serve_dev_command: String,
    pub worker_command: String,
    /// Monitoring wrapper prefixed to the worker command when non-empty.
    pub worker_wrapper: String,
    pub coverage_erase_command: String,
    pub test_command: String,
    pub coverage_report_command: String,
    pub coverage_xml_command: String,
    pub coverage_upload_command: String,
    /// Where test mode writes its JSON run summary, if anywhere.
    pub report_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            sleep: 1.0,
            tries: 60,
            wait_for: vec![
                Endpoint::new("db", 5432),
                Endpoint::new("redis-cache", 6379),
                Endpoint::new("redis-store", 6379),
            ],
            on_timeout: OnTimeout::Continue,
            wait_strategy: WaitStrategy::Sequential,
            development: false,
            ci: false,
            migrate_command: "python manage.py migrate --noinput".to_string(),
            serve_command:
                "gunicorn wsgi:application -b 0.0.0.0:{port} --workers 4 --access-logfile -"
                    .to_string(),
            serve_dev_command: "python manage.py runserver 0.0.0.0:{port}".to_string(),
            worker_command: "celery -A worker worker -l info".to_string(),
            worker_wrapper: String::new(),
            coverage_erase_command: "coverage erase".to_string(),
            test_command: "coverage run -m pytest".to_string(),
            coverage_report_command: "coverage report -m".to_string(),
            coverage_xml_command: "coverage xml".to_string(),
            coverage_upload_command: "codecov".to_string(),
            report_path: None,
        }
    }
}
