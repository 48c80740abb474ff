// src/auth/spn.rs

//! Service principal name derivation.
//!
//! The service a security context is created for is named after the host
//! being authenticated against, optionally canonicalized through a
//! reverse lookup and optionally qualified with the port.

use std::fmt;
use std::io;
use std::net::IpAddr;

use super::route::Host;

/// Service type prefixed to every derived host name.
pub const SERVICE_TYPE: &str = "HTTP";

/// The result of canonicalizing a host name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canonical {
    /// The address the host name resolved to.
    pub addr: IpAddr,
    /// The name the address maps back to, or its textual form when the
    /// reverse lookup produced no name.
    pub name: String,
}

/// Resolves host names to their canonical form.
///
/// Implementations may block; there is no timeout beyond the one the
/// implementation applies itself.
pub trait Canonicalize: Send + Sync {
    fn canonicalize(&self, host: &str) -> io::Result<Canonical>;
}

/// Canonicalizes through the system resolver: a forward lookup followed
/// by a reverse lookup of the first address.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCanonicalizer;

impl Canonicalize for SystemCanonicalizer {
    fn canonicalize(&self, host: &str) -> io::Result<Canonical> {
        let addr = dns_lookup::lookup_host(host)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("unknown host: {}", host))
            })?;

        let name = dns_lookup::lookup_addr(&addr)?;
        Ok(Canonical { addr, name })
    }
}

/// Derives the name of the service to authenticate against.
pub(crate) struct ServicePrincipalResolver<'a> {
    pub(crate) strip_port: bool,
    pub(crate) use_canonical_hostname: bool,
    pub(crate) canonicalizer: &'a dyn Canonicalize,
}

impl<'a> ServicePrincipalResolver<'a> {
    /// The authentication server name: `hostname` or `hostname:port`.
    pub(crate) fn resolve(&self, host: &Host) -> String {
        let hostname = if self.use_canonical_hostname {
            canonical_hostname(self.canonicalizer, host.name())
        } else {
            host.name().to_owned()
        };

        if self.strip_port {
            hostname
        } else {
            format!("{}:{}", hostname, host.port())
        }
    }

    /// The full host-based service name, e.g. `HTTP@www.example.com`.
    pub(crate) fn service_name(&self, host: &Host) -> ServiceName {
        ServiceName {
            server: self.resolve(host),
        }
    }
}

/// A host-based service name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ServiceName {
    server: String,
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", SERVICE_TYPE, self.server)
    }
}

fn canonical_hostname(canonicalizer: &dyn Canonicalize, host: &str) -> String {
    match canonicalizer.canonicalize(host) {
        // A reverse lookup that yields the bare address found no name.
        Ok(canonical) if canonical.addr.to_string() == canonical.name => host.to_owned(),
        Ok(canonical) => {
            log::trace!("canonical name of {} is {}", host, canonical.name);
            canonical.name
        }
        Err(e) => {
            log::debug!("canonicalization of {} failed, keeping it: {}", host, e);
            host.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct Fixed(Canonical);

    impl Canonicalize for Fixed {
        fn canonicalize(&self, _host: &str) -> io::Result<Canonical> {
            Ok(self.0.clone())
        }
    }

    struct Unknown;

    impl Canonicalize for Unknown {
        fn canonicalize(&self, host: &str) -> io::Result<Canonical> {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown host: {}", host),
            ))
        }
    }

    fn resolver(
        strip_port: bool,
        use_canonical_hostname: bool,
        canonicalizer: &dyn Canonicalize,
    ) -> ServicePrincipalResolver<'_> {
        ServicePrincipalResolver {
            strip_port,
            use_canonical_hostname,
            canonicalizer,
        }
    }

    #[test]
    fn test_strip_port() {
        let host = Host::new("EXAMPLE.com", 88);

        assert_eq!(resolver(true, false, &Unknown).resolve(&host), "EXAMPLE.com");
        assert_eq!(resolver(false, false, &Unknown).resolve(&host), "EXAMPLE.com:88");
    }

    #[test]
    fn test_canonical_name_substituted() {
        let host = Host::new("www", 80);
        let canon = Fixed(Canonical {
            addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            name: "web01.corp.example.com".into(),
        });

        assert_eq!(resolver(true, true, &canon).resolve(&host), "web01.corp.example.com");
        assert_eq!(resolver(false, true, &canon).resolve(&host), "web01.corp.example.com:80");
    }

    #[test]
    fn test_numeric_canonical_name_ignored() {
        let host = Host::new("www", 80);
        let canon = Fixed(Canonical {
            addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            name: "10.0.0.7".into(),
        });

        assert_eq!(resolver(true, true, &canon).resolve(&host), "www");
    }

    #[test]
    fn test_unknown_host_falls_back() {
        let host = Host::new("nowhere.invalid", 8080);

        for strip_port in [true, false] {
            assert_eq!(
                resolver(strip_port, true, &Unknown).resolve(&host),
                resolver(strip_port, false, &Unknown).resolve(&host),
            );
        }
    }

    #[test]
    fn test_service_name() {
        let host = Host::new("EXAMPLE.com", 88);
        let name = resolver(true, false, &Unknown).service_name(&host);
        assert_eq!(name.to_string(), "HTTP@EXAMPLE.com");
    }

    #[test]
    fn test_system_canonicalizer_ip_literal() {
        // Whatever the reverse lookup yields, the address is the literal.
        let canonical = SystemCanonicalizer.canonicalize("127.0.0.1").unwrap();
        assert_eq!(canonical.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(!canonical.name.is_empty());
    }

    #[test]
    fn test_system_canonicalizer_unknown_host_keeps_port() {
        let host = Host::new("nowhere.invalid", 88);
        assert!(SystemCanonicalizer.canonicalize(host.name()).is_err());
        assert_eq!(
            resolver(false, true, &SystemCanonicalizer).resolve(&host),
            "nowhere.invalid:88"
        );
    }
}
