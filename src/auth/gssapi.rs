// src/auth/gssapi.rs

//! GSSAPI security contexts (MIT Kerberos or Heimdal) for Negotiate.

use std::fmt;
use std::time::Duration;

use libgssapi::context::{ClientCtx, CtxFlags};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::name::Name;
use libgssapi::oid::{Oid, OidSet, GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE, GSS_NT_KRB5_PRINCIPAL};

use super::provider::{Mechanism, ProviderError, ProviderFailure, SecurityContextProvider};

// 1.3.6.1.5.5.2
static GSS_MECH_SPNEGO: Oid = Oid::from_slice(&[0x2b, 0x06, 0x01, 0x05, 0x05, 0x02]);

// Routine errors live in bits 16..24 of the major status (RFC 2744).
const GSS_S_BAD_MECH: u32 = 1;
const GSS_S_BAD_NAME: u32 = 2;
const GSS_S_BAD_NAMETYPE: u32 = 3;
const GSS_S_NO_CRED: u32 = 7;
const GSS_S_DEFECTIVE_TOKEN: u32 = 9;
const GSS_S_DEFECTIVE_CREDENTIAL: u32 = 10;
const GSS_S_CREDENTIALS_EXPIRED: u32 = 11;

// Supplementary status bits.
const GSS_S_DUPLICATE_TOKEN: u32 = 1 << 1;
const GSS_S_OLD_TOKEN: u32 = 1 << 2;

/// A Kerberos principal whose credentials are acquired and delegated
/// instead of the default ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GssapiCredential {
    principal: String,
    lifetime: Option<Duration>,
}

impl GssapiCredential {
    /// Credentials of `principal`, e.g. `alice@EXAMPLE.COM`.
    pub fn principal(principal: impl Into<String>) -> Self {
        GssapiCredential {
            principal: principal.into(),
            lifetime: None,
        }
    }

    /// Requests credentials valid for at least `lifetime`.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }
}

/// A client security context in progress.
pub struct GssapiContext {
    inner: ClientCtx,
}

impl fmt::Debug for GssapiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GssapiContext").finish_non_exhaustive()
    }
}

/// [`SecurityContextProvider`] backed by the system GSSAPI library.
///
/// Contexts request mutual authentication and credential delegation.
#[derive(Clone, Copy, Debug, Default)]
pub struct GssapiProvider {
    _priv: (),
}

impl GssapiProvider {
    pub fn new() -> Self {
        GssapiProvider::default()
    }

    fn acquire(
        &self,
        credential: &GssapiCredential,
        mech: &'static Oid,
    ) -> Result<Cred, libgssapi::error::Error> {
        let mut mechs = OidSet::new()?;
        mechs.add(mech)?;

        let name = Name::new(credential.principal.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL))?;
        let name = name.canonicalize(Some(&GSS_MECH_KRB5))?;

        Cred::acquire(
            Some(&name),
            credential.lifetime,
            CredUsage::Initiate,
            Some(&mechs),
        )
    }
}

impl SecurityContextProvider for GssapiProvider {
    type Credential = GssapiCredential;
    type Context = GssapiContext;

    fn create_context(
        &self,
        service: &str,
        mechanism: Mechanism,
        credential: Option<&GssapiCredential>,
    ) -> Result<GssapiContext, ProviderError> {
        let mech = mech_oid(mechanism);

        let cred = match credential {
            Some(credential) => {
                log::debug!("acquiring credentials for {}", credential.principal);
                Some(self.acquire(credential, mech).map_err(translate)?)
            }
            None => None,
        };

        let name = Name::new(service.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .and_then(|name| name.canonicalize(Some(mech)))
            .map_err(translate)?;

        Ok(GssapiContext {
            inner: ClientCtx::new(
                cred,
                name,
                CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_DELEG_FLAG,
                Some(mech),
            ),
        })
    }

    fn advance(&self, context: &mut GssapiContext, input: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let input = if input.is_empty() { None } else { Some(input) };

        match context.inner.step(input, None).map_err(translate)? {
            Some(token) => Ok(token.to_vec()),
            // established with nothing left to send
            None => Ok(Vec::new()),
        }
    }
}

fn mech_oid(mechanism: Mechanism) -> &'static Oid {
    match mechanism {
        Mechanism::Spnego => &GSS_MECH_SPNEGO,
        Mechanism::Kerberos => &GSS_MECH_KRB5,
    }
}

fn translate(err: libgssapi::error::Error) -> ProviderError {
    let failure = failure_of(err.major.bits());
    ProviderError::new(failure, err.to_string()).with_source(err)
}

fn failure_of(major: u32) -> ProviderFailure {
    let routine = (major >> 16) & 0xff;
    let supplementary = major & 0xffff;

    match routine {
        GSS_S_DEFECTIVE_CREDENTIAL => ProviderFailure::DefectiveCredential,
        GSS_S_CREDENTIALS_EXPIRED => ProviderFailure::CredentialsExpired,
        GSS_S_NO_CRED => ProviderFailure::NoCredential,
        GSS_S_DEFECTIVE_TOKEN => ProviderFailure::DefectiveToken,
        GSS_S_BAD_MECH => ProviderFailure::BadMechanism,
        GSS_S_BAD_NAME | GSS_S_BAD_NAMETYPE => ProviderFailure::BadName,
        0 if supplementary & GSS_S_DUPLICATE_TOKEN != 0 => ProviderFailure::DuplicateToken,
        0 if supplementary & GSS_S_OLD_TOKEN != 0 => ProviderFailure::OldToken,
        _ => ProviderFailure::Other(major),
    }
}
