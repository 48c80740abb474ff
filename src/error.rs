use std::error::Error as StdError;
use std::fmt;

/// A `Result` alias where the `Err` case is `http_negotiate::Error`.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur while answering a Negotiate challenge.
///
/// Use the `is_*` predicates to decide how to react: invalid credentials
/// call for new credentials, protocol errors for a fresh handshake, and
/// everything else for giving up on this scheme.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the server's challenge could not be decoded.
    pub fn is_malformed_challenge(&self) -> bool {
        matches!(self.inner.kind, Kind::MalformedChallenge)
    }

    /// Returns true if `authenticate` was called before any challenge.
    pub fn is_not_initiated(&self) -> bool {
        matches!(self.inner.kind, Kind::NotInitiated)
    }

    /// Returns true if the handshake failed for a reason other than
    /// credentials or token validity.
    pub fn is_failed(&self) -> bool {
        matches!(self.inner.kind, Kind::Failed)
    }

    /// Returns true if the credential was missing, defective or expired.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidCredentials)
    }

    /// Returns true if a token was defective, duplicated or stale.
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    /// Returns true if no connection route was available.
    pub fn is_route_unavailable(&self) -> bool {
        matches!(self.inner.kind, Kind::RouteUnavailable)
    }

    /// Returns true if sending the request failed.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("http_negotiate::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::MalformedChallenge => f.write_str("malformed Negotiate challenge")?,
            Kind::NotInitiated => f.write_str("Negotiate authentication has not been initiated")?,
            Kind::Failed => f.write_str("Negotiate authentication has failed")?,
            Kind::InvalidCredentials => f.write_str("invalid credentials")?,
            Kind::Protocol => f.write_str("Negotiate protocol error")?,
            Kind::RouteUnavailable => f.write_str("connection route is not available")?,
            Kind::Request => f.write_str("error sending request")?,
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {}", source)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    MalformedChallenge,
    NotInitiated,
    Failed,
    InvalidCredentials,
    Protocol,
    RouteUnavailable,
    Request,
}

// constructors

pub(crate) fn malformed_challenge<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::MalformedChallenge, Some(e))
}

pub(crate) fn not_initiated() -> Error {
    Error::new(Kind::NotInitiated, None::<Error>)
}

pub(crate) fn failed() -> Error {
    Error::new(Kind::Failed, None::<Error>)
}

pub(crate) fn failed_with<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Failed, Some(e))
}

pub(crate) fn invalid_credentials<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::InvalidCredentials, Some(e))
}

pub(crate) fn protocol<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Protocol, Some(e))
}

pub(crate) fn route_unavailable() -> Error {
    Error::new(Kind::RouteUnavailable, None::<Error>)
}

pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request, Some(e))
}
