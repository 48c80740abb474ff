// src/auth/mod.rs

//! Authentication module for HTTP Negotiate (SPNEGO/Kerberos) support.
//!
//! A [`NegotiateScheme`] answers one server challenge with one token. The
//! token itself comes from a [`SecurityContextProvider`]; with the `gssapi`
//! feature enabled, [`GssapiProvider`] supplies one backed by the system
//! Kerberos libraries.

use std::fmt;
use std::sync::Arc;

mod challenge;
mod classify;
#[cfg(feature = "gssapi")]
mod gssapi;
mod negotiate;
mod provider;
mod route;
mod scheme;
mod spn;

pub use self::challenge::{decode, encode, AuthHeader, Challenge, ChallengeType, SCHEME};
#[cfg(feature = "gssapi")]
pub use self::gssapi::{GssapiContext, GssapiCredential, GssapiProvider};
pub use self::negotiate::execute_with_negotiate;
pub use self::provider::{Mechanism, ProviderError, ProviderFailure, SecurityContextProvider};
pub use self::route::{Host, Route};
pub use self::scheme::{NegotiateScheme, State};
pub use self::spn::{Canonical, Canonicalize, SystemCanonicalizer, SERVICE_TYPE};

/// Credentials for Negotiate authentication.
///
/// `C` is the provider's credential handle type.
#[derive(Clone)]
pub enum Credentials<C> {
    /// Use the current user's default credentials, as found by the provider
    /// (for instance the Kerberos ticket cache).
    CurrentUser,

    /// A credential handle the service may act with on the user's behalf.
    Delegated(C),

    /// Explicit username and password.
    ///
    /// Security-context providers cannot use these; the provider falls back
    /// to its default credentials.
    Explicit {
        username: String,
        password: String,
    },
}

impl<C> Credentials<C> {
    /// The delegatable handle, if these credentials carry one.
    pub fn delegated(&self) -> Option<&C> {
        match self {
            Credentials::Delegated(cred) => Some(cred),
            Credentials::CurrentUser | Credentials::Explicit { .. } => None,
        }
    }
}

impl<C> Default for Credentials<C> {
    fn default() -> Self {
        Credentials::CurrentUser
    }
}

impl<C: fmt::Debug> fmt::Debug for Credentials<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::CurrentUser => f.write_str("CurrentUser"),
            Credentials::Delegated(cred) => f.debug_tuple("Delegated").field(cred).finish(),
            Credentials::Explicit { username, .. } => f
                .debug_struct("Explicit")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
        }
    }
}

/// Configuration for Negotiate authentication.
///
/// Fixed for the lifetime of each scheme built from it.
#[derive(Clone)]
pub struct NegotiateConfig {
    pub(crate) strip_port: bool,
    pub(crate) use_canonical_hostname: bool,
    pub(crate) proxy: bool,
    pub(crate) mechanism: Mechanism,
    pub(crate) canonicalizer: Arc<dyn Canonicalize>,
}

impl NegotiateConfig {
    /// Creates a `NegotiateConfigBuilder` to configure a `NegotiateConfig`.
    pub fn builder() -> NegotiateConfigBuilder {
        NegotiateConfigBuilder::new()
    }

    /// Origin authentication with the default settings.
    pub fn target() -> Self {
        NegotiateConfigBuilder::new().build()
    }

    /// Proxy authentication with the default settings.
    pub fn proxy() -> Self {
        NegotiateConfigBuilder::new().proxy(true).build()
    }

    pub fn strip_port(&self) -> bool {
        self.strip_port
    }

    pub fn use_canonical_hostname(&self) -> bool {
        self.use_canonical_hostname
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    pub(crate) fn challenge_type(&self) -> ChallengeType {
        if self.proxy {
            ChallengeType::Proxy
        } else {
            ChallengeType::Target
        }
    }
}

impl Default for NegotiateConfig {
    fn default() -> Self {
        NegotiateConfig::target()
    }
}

impl fmt::Debug for NegotiateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiateConfig")
            .field("strip_port", &self.strip_port)
            .field("use_canonical_hostname", &self.use_canonical_hostname)
            .field("proxy", &self.proxy)
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

/// A `NegotiateConfigBuilder` can be used to create a `NegotiateConfig`.
#[must_use]
#[derive(Debug)]
pub struct NegotiateConfigBuilder {
    config: NegotiateConfig,
}

impl NegotiateConfigBuilder {
    /// Constructs a new `NegotiateConfigBuilder`.
    ///
    /// The port is stripped from service names, host names are
    /// canonicalized, the origin server is authenticated against and
    /// SPNEGO is used.
    pub fn new() -> Self {
        NegotiateConfigBuilder {
            config: NegotiateConfig {
                strip_port: true,
                use_canonical_hostname: true,
                proxy: false,
                mechanism: Mechanism::Spnego,
                canonicalizer: Arc::new(SystemCanonicalizer),
            },
        }
    }

    /// Whether the port is left out of the service name.
    pub fn strip_port(mut self, enable: bool) -> Self {
        self.config.strip_port = enable;
        self
    }

    /// Whether host names are canonicalized by reverse lookup before
    /// naming the service.
    pub fn use_canonical_hostname(mut self, enable: bool) -> Self {
        self.config.use_canonical_hostname = enable;
        self
    }

    /// Whether the proxy, rather than the origin server, is authenticated
    /// against.
    pub fn proxy(mut self, enable: bool) -> Self {
        self.config.proxy = enable;
        self
    }

    pub fn mechanism(mut self, mechanism: Mechanism) -> Self {
        self.config.mechanism = mechanism;
        self
    }

    /// Overrides the canonicalizer used when `use_canonical_hostname` is set.
    pub fn canonicalizer<C: Canonicalize + 'static>(mut self, canonicalizer: Arc<C>) -> Self {
        self.config.canonicalizer = canonicalizer as Arc<dyn Canonicalize>;
        self
    }

    pub fn build(self) -> NegotiateConfig {
        self.config
    }
}

impl Default for NegotiateConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
