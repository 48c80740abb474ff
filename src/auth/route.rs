// src/auth/route.rs

//! Connection route information needed to name the target service.

use std::fmt;

use http::Uri;

/// A host and port a connection is made to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Host {
    name: String,
    port: u16,
}

impl Host {
    pub fn new(name: impl Into<String>, port: u16) -> Host {
        Host {
            name: name.into(),
            port,
        }
    }

    /// The host from an `http::Uri`, with the port defaulted from its scheme.
    pub fn from_uri(uri: &Uri) -> Option<Host> {
        let name = uri.host()?;
        let port = uri.port_u16().unwrap_or_else(|| {
            if uri.scheme() == Some(&http::uri::Scheme::HTTPS) {
                443
            } else {
                80
            }
        });
        Some(Host::new(strip_brackets(name), port))
    }

    /// The host from a `url::Url`, with the port defaulted from its scheme.
    pub fn from_url(url: &url::Url) -> Option<Host> {
        let name = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Host::new(strip_brackets(name), port))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.port)
    }
}

// IPv6 literals arrive bracketed from URIs.
fn strip_brackets(name: &str) -> &str {
    name.strip_prefix('[')
        .and_then(|name| name.strip_suffix(']'))
        .unwrap_or(name)
}

/// The route of the connection a request travels over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    target: Host,
    proxy: Option<Host>,
}

impl Route {
    /// A direct route to `target`.
    pub fn direct(target: Host) -> Route {
        Route {
            target,
            proxy: None,
        }
    }

    /// A route to `target` through `proxy`.
    pub fn via_proxy(target: Host, proxy: Host) -> Route {
        Route {
            target,
            proxy: Some(proxy),
        }
    }

    /// A direct route to the host of `uri`.
    pub fn from_uri(uri: &Uri) -> Option<Route> {
        Host::from_uri(uri).map(Route::direct)
    }

    /// A direct route to the host of `url`.
    pub fn from_url(url: &url::Url) -> Option<Route> {
        Host::from_url(url).map(Route::direct)
    }

    /// Routes the connection through `proxy`.
    pub fn with_proxy(mut self, proxy: Host) -> Route {
        self.proxy = Some(proxy);
        self
    }

    pub fn target(&self) -> &Host {
        &self.target
    }

    pub fn proxy(&self) -> Option<&Host> {
        self.proxy.as_ref()
    }

    /// The host authenticated against.
    ///
    /// For proxy authentication this is the proxy, or the target when the
    /// route has no proxy.
    pub fn auth_host(&self, proxy: bool) -> &Host {
        if proxy {
            self.proxy.as_ref().unwrap_or(&self.target)
        } else {
            &self.target
        }
    }
}
