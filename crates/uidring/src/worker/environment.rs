use std::env;
use std::net::UdpSocket;

use crate::{Error, Result};

/// Environment variable naming the container host.
pub const ENV_KEY_HOST: &str = "UID_WORKER_HOST";
/// Environment variable naming the container port.
pub const ENV_KEY_PORT: &str = "UID_WORKER_PORT";

/// Resolved host identity for the worker-id registry.
///
/// Resolved once by the composition root and passed around as a value; there
/// is no hidden process-wide discovery state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEnvironment {
    /// Containerized process: identity is the injected host/port pair.
    Container { host: String, port: String },
    /// Bare host: identity is the primary non-loopback address.
    Actual { local_address: String },
}

impl HostEnvironment {
    /// Resolves the identity from the process environment, falling back to
    /// network discovery when the container variables are absent.
    ///
    /// # Errors
    ///
    /// - [`Error::ContainerEnvIncomplete`] when only one of
    ///   [`ENV_KEY_HOST`] / [`ENV_KEY_PORT`] is set.
    /// - [`Error::NoLocalAddress`] when no usable non-loopback address can be
    ///   discovered.
    pub fn resolve() -> Result<Self> {
        let host = env::var(ENV_KEY_HOST).ok().filter(|v| !v.is_empty());
        let port = env::var(ENV_KEY_PORT).ok().filter(|v| !v.is_empty());
        Self::classify(host, port)
    }

    fn classify(host: Option<String>, port: Option<String>) -> Result<Self> {
        match (host, port) {
            (Some(host), Some(port)) => Ok(Self::Container { host, port }),
            (None, None) => Ok(Self::Actual {
                local_address: local_inet_address()?,
            }),
            _ => Err(Error::ContainerEnvIncomplete),
        }
    }
}

/// Primary non-loopback address, discovered by routing a UDP socket toward a
/// public address. No packets are sent; `connect` on UDP only selects the
/// outbound interface.
fn local_inet_address() -> Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| Error::NoLocalAddress)?;
    socket
        .connect("8.8.8.8:80")
        .map_err(|_| Error::NoLocalAddress)?;
    let ip = socket
        .local_addr()
        .map_err(|_| Error::NoLocalAddress)?
        .ip();

    if ip.is_loopback() || ip.is_unspecified() {
        return Err(Error::NoLocalAddress);
    }
    Ok(ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_pair_wins() {
        let resolved = HostEnvironment::classify(
            Some("pod-17".to_owned()),
            Some("8080".to_owned()),
        )
        .unwrap();
        assert_eq!(
            resolved,
            HostEnvironment::Container {
                host: "pod-17".to_owned(),
                port: "8080".to_owned(),
            }
        );
    }

    #[test]
    fn half_set_pair_is_rejected() {
        assert_eq!(
            HostEnvironment::classify(Some("pod-17".to_owned()), None),
            Err(Error::ContainerEnvIncomplete)
        );
        assert_eq!(
            HostEnvironment::classify(None, Some("8080".to_owned())),
            Err(Error::ContainerEnvIncomplete)
        );
    }

    #[test]
    fn bare_host_discovers_an_address() {
        // Either outcome is legitimate on a sandboxed machine; what matters
        // is that a discovered address is never loopback.
        if let Ok(HostEnvironment::Actual { local_address }) =
            HostEnvironment::classify(None, None)
        {
            assert!(!local_address.starts_with("127."));
            assert_ne!(local_address, "::1");
        }
    }
}
