// src/auth/provider.rs

//! The security-context capability consumed by the Negotiate scheme.
//!
//! The scheme never produces tokens itself. It names the target service,
//! hands the provider the server's challenge, and forwards whatever token
//! comes back. Kerberos, SPNEGO or a test double all plug in here.

use std::error::Error as StdError;
use std::fmt;

use crate::error::BoxError;

/// The mechanism a security context is established with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Mechanism {
    /// SPNEGO (RFC 4178), which negotiates the underlying mechanism.
    #[default]
    Spnego,
    /// Kerberos V5 used directly.
    Kerberos,
}

impl Mechanism {
    /// Dotted-decimal object identifier of the mechanism.
    pub fn oid(&self) -> &'static str {
        match self {
            Mechanism::Spnego => "1.3.6.1.5.5.2",
            Mechanism::Kerberos => "1.2.840.113554.1.2.2",
        }
    }

    /// DER-encoded object identifier, without tag and length.
    pub fn oid_der(&self) -> &'static [u8] {
        match self {
            Mechanism::Spnego => &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x02],
            Mechanism::Kerberos => &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x12, 0x01, 0x02, 0x02],
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Spnego => f.write_str("SPNEGO"),
            Mechanism::Kerberos => f.write_str("Kerberos"),
        }
    }
}

/// Why a security-context provider refused to produce a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderFailure {
    /// The credential is malformed or otherwise unusable.
    DefectiveCredential,
    /// The credential has expired.
    CredentialsExpired,
    /// No credential could be found.
    NoCredential,
    /// The input token failed consistency checks.
    DefectiveToken,
    /// The input token was already processed.
    DuplicateToken,
    /// The input token is too old.
    OldToken,
    /// The requested mechanism is not supported.
    BadMechanism,
    /// The service name could not be used.
    BadName,
    /// A failure with a provider-specific code.
    Other(u32),
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::DefectiveCredential => f.write_str("defective credential"),
            ProviderFailure::CredentialsExpired => f.write_str("credentials expired"),
            ProviderFailure::NoCredential => f.write_str("no credential available"),
            ProviderFailure::DefectiveToken => f.write_str("defective token"),
            ProviderFailure::DuplicateToken => f.write_str("duplicate token"),
            ProviderFailure::OldToken => f.write_str("old token"),
            ProviderFailure::BadMechanism => f.write_str("unsupported mechanism"),
            ProviderFailure::BadName => f.write_str("bad service name"),
            ProviderFailure::Other(code) => write!(f, "provider failure 0x{:08X}", code),
        }
    }
}

/// A failure reported by a [`SecurityContextProvider`].
pub struct ProviderError {
    failure: ProviderFailure,
    message: String,
    source: Option<BoxError>,
}

impl ProviderError {
    /// Creates an error of the given category.
    pub fn new(failure: ProviderFailure, message: impl Into<String>) -> ProviderError {
        ProviderError {
            failure,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying library error.
    pub fn with_source<E>(mut self, source: E) -> ProviderError
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.source = Some(source.into());
        self
    }

    /// The failure category.
    pub fn failure(&self) -> ProviderFailure {
        self.failure
    }

    /// The provider's description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("ProviderError");
        builder.field("failure", &self.failure);
        builder.field("message", &self.message);
        if let Some(ref source) = self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.failure)
        } else {
            write!(f, "{} ({})", self.message, self.failure)
        }
    }
}

impl StdError for ProviderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// Creates and advances security contexts for named services.
///
/// Contexts are requested with mutual authentication and credential
/// delegation. A provider may block, for instance while contacting a
/// ticket-granting service; the scheme makes exactly one call per token
/// and never retries.
pub trait SecurityContextProvider {
    /// A credential handle that may be delegated to the service.
    type Credential;

    /// An in-progress security context.
    type Context;

    /// Creates a context for `service`, a host-based service name such as
    /// `HTTP@www.example.com`.
    ///
    /// Without a `credential` the provider uses its default credential.
    fn create_context(
        &self,
        service: &str,
        mechanism: Mechanism,
        credential: Option<&Self::Credential>,
    ) -> Result<Self::Context, ProviderError>;

    /// Feeds `input` to the context and returns the next token to send.
    fn advance(&self, context: &mut Self::Context, input: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

impl<'a, P> SecurityContextProvider for &'a P
where
    P: SecurityContextProvider + ?Sized,
{
    type Credential = P::Credential;
    type Context = P::Context;

    fn create_context(
        &self,
        service: &str,
        mechanism: Mechanism,
        credential: Option<&Self::Credential>,
    ) -> Result<Self::Context, ProviderError> {
        (**self).create_context(service, mechanism, credential)
    }

    fn advance(&self, context: &mut Self::Context, input: &[u8]) -> Result<Vec<u8>, ProviderError> {
        (**self).advance(context, input)
    }
}
