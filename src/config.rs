use serde::Deserialize;
use thiserror::Error;

/// Port Disque listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 7711;

/// Where to find the broker, and how to authenticate.
///
/// Missing keys take their defaults, so an empty YAML document is a valid
/// config for a broker on localhost.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub hostname: String,
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("expected a disque:// URL, got {0:?}")]
    Scheme(String),

    #[error("malformed host in {0:?}")]
    Host(String),

    #[error("invalid port {0:?}")]
    Port(String),

    #[error("password is not valid percent-encoded UTF-8: {0}")]
    Password(#[from] std::string::FromUtf8Error),
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_owned(),
            port: DEFAULT_PORT,
            password: None,
        }
    }
}

impl ClientConfig {
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// Parses `disque://[:password@]host[:port]`. A missing host or port
    /// takes its default. Only the password half of the user info is used,
    /// and anything after the authority is ignored.
    pub fn from_url(url: &str) -> Result<Self, UrlError> {
        let rest = url
            .strip_prefix("disque://")
            .ok_or_else(|| UrlError::Scheme(url.to_owned()))?;

        let authority = match rest.find(['/', '?', '#']) {
            Some(end) => &rest[..end],
            None => rest,
        };

        let (userinfo, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => (Some(userinfo), host_port),
            None => (None, authority),
        };

        let (host, port) = split_host_port(host_port)
            .ok_or_else(|| UrlError::Host(url.to_owned()))?;

        let mut config = Self::default();

        if !host.is_empty() {
            config.hostname = host.to_owned();
        }

        if let Some(port) = port.filter(|p| !p.is_empty()) {
            config.port =
                port.parse().map_err(|_| UrlError::Port(port.to_owned()))?;
        }

        if let Some((_, password)) = userinfo.and_then(|u| u.split_once(':')) {
            if !password.is_empty() {
                config.password =
                    Some(urlencoding::decode(password)?.into_owned());
            }
        }

        Ok(config)
    }
}

/// Splits `host[:port]`, taking the brackets off an IPv6 literal.
fn split_host_port(s: &str) -> Option<(&str, Option<&str>)> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        return match after {
            "" => Some((host, None)),
            _ => after.strip_prefix(':').map(|port| (host, Some(port))),
        };
    }

    Some(match s.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (s, None),
    })
}
