use std::{fmt, str::FromStr};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Protocol server settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct ServerConfig {
    /// Transport used by `npmpeek serve`: "stdio" or "http".
    /// Default: stdio
    pub transport: Option<Transport>,

    /// Address the HTTP transport listens on.
    /// Default: 127.0.0.1:3000
    pub bind: Option<String>,

    /// Bearer token required on every HTTP route when set.
    /// Default: unset (no authentication)
    pub auth_token: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}
