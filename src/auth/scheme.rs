// src/auth/scheme.rs

//! The Negotiate handshake state machine.
//!
//! A scheme instance covers one authentication attempt against one host.
//! It receives a single challenge, generates a single token through the
//! security-context provider and then keeps answering with that token.
//! Once failed it stays failed; a retry needs a new instance.

use std::fmt;

use super::challenge::{AuthHeader, Challenge, ChallengeType};
use super::classify::classify;
use super::provider::{ProviderError, SecurityContextProvider};
use super::route::Route;
use super::spn::ServicePrincipalResolver;
use super::{Credentials, NegotiateConfig};
use crate::error::{self, Result};

/// Where a [`NegotiateScheme`] is in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No challenge has been processed yet.
    Uninitiated,
    /// A challenge was received and awaits a token.
    ChallengeReceived,
    /// A token was generated and is sent with every attempt.
    TokenGenerated,
    /// The attempt failed; nothing more will be sent.
    Failed,
}

// Each phase owns exactly the bytes meaningful to it.
enum Phase {
    Uninitiated,
    ChallengeReceived { challenge: Vec<u8> },
    TokenGenerated { token: Vec<u8> },
    Failed,
}

/// Client side of the HTTP Negotiate authentication scheme.
///
/// Not meant to be shared between concurrent requests; each request that
/// needs to authenticate gets its own instance.
///
/// # Example
///
/// ```ignore
/// let mut scheme = NegotiateScheme::new(NegotiateConfig::target(), provider);
/// scheme.process_challenge(ChallengeType::Target, &challenge)?;
/// let header = scheme.authenticate(&Credentials::CurrentUser, Some(&route))?;
/// header.apply(request.headers_mut());
/// ```
pub struct NegotiateScheme<P: SecurityContextProvider> {
    config: NegotiateConfig,
    provider: P,
    phase: Phase,
}

impl<P: SecurityContextProvider> NegotiateScheme<P> {
    pub fn new(config: NegotiateConfig, provider: P) -> Self {
        NegotiateScheme {
            config,
            provider,
            phase: Phase::Uninitiated,
        }
    }

    pub fn config(&self) -> &NegotiateConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        match self.phase {
            Phase::Uninitiated => State::Uninitiated,
            Phase::ChallengeReceived { .. } => State::ChallengeReceived,
            Phase::TokenGenerated { .. } => State::TokenGenerated,
            Phase::Failed => State::Failed,
        }
    }

    /// Whether the handshake has ended, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::TokenGenerated { .. } | Phase::Failed)
    }

    /// Records the server's challenge.
    ///
    /// The header name and the authenticated host follow the configuration;
    /// a `challenge_type` that disagrees with it is logged and otherwise
    /// ignored.
    ///
    /// Only the first challenge is accepted. Any later one means the server
    /// rejected the token, and the scheme fails without returning an error;
    /// `is_complete` and `authenticate` report the outcome.
    ///
    /// # Errors
    ///
    /// Fails if the challenge token is not valid base64. The scheme is
    /// failed as well.
    pub fn process_challenge(
        &mut self,
        challenge_type: ChallengeType,
        challenge: &Challenge,
    ) -> Result<()> {
        if !matches!(self.phase, Phase::Uninitiated) {
            log::debug!("Negotiate authentication already attempted");
            self.phase = Phase::Failed;
            return Ok(());
        }

        let decoded = match challenge.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                self.phase = Phase::Failed;
                return Err(e);
            }
        };

        log::debug!(
            "received {:?} Negotiate challenge ({} bytes)",
            challenge_type,
            decoded.len()
        );
        if challenge_type != self.config.challenge_type() {
            log::debug!(
                "{:?} challenge answered as configured for {:?}",
                challenge_type,
                self.config.challenge_type()
            );
        }
        log::trace!("challenge token: {:?}", challenge.token());

        self.phase = Phase::ChallengeReceived { challenge: decoded };
        Ok(())
    }

    /// Produces the header answering the challenge.
    ///
    /// The first call after a challenge generates the token; later calls
    /// send the same token again.
    ///
    /// # Errors
    ///
    /// - not initiated, when no challenge was processed,
    /// - failed, when the scheme has failed,
    /// - route unavailable, when `route` is `None` and a token is needed,
    /// - invalid credentials, protocol or failed, when the provider refuses
    ///   to produce a token. The scheme is failed afterwards.
    pub fn authenticate(
        &mut self,
        credentials: &Credentials<P::Credential>,
        route: Option<&Route>,
    ) -> Result<AuthHeader> {
        match self.phase {
            Phase::Uninitiated => Err(error::not_initiated()),
            Phase::Failed => Err(error::failed()),
            Phase::ChallengeReceived { ref challenge } => {
                let route = route.ok_or_else(error::route_unavailable)?;

                match self.respond(challenge, credentials, route) {
                    Ok(token) => {
                        let header = AuthHeader::negotiate(self.config.challenge_type(), &token);
                        self.phase = Phase::TokenGenerated { token };
                        header
                    }
                    Err(err) => {
                        log::debug!("Negotiate token generation failed: {}", err);
                        self.phase = Phase::Failed;
                        Err(classify(err))
                    }
                }
            }
            Phase::TokenGenerated { ref token } => {
                AuthHeader::negotiate(self.config.challenge_type(), token)
            }
        }
    }

    // resolve the service, then have the provider answer the challenge
    fn respond(
        &self,
        challenge: &[u8],
        credentials: &Credentials<P::Credential>,
        route: &Route,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let resolver = ServicePrincipalResolver {
            strip_port: self.config.strip_port,
            use_canonical_hostname: self.config.use_canonical_hostname,
            canonicalizer: &*self.config.canonicalizer,
        };
        let service = resolver
            .service_name(route.auth_host(self.config.proxy))
            .to_string();

        log::debug!("init {} ({})", service, self.config.mechanism);

        let mut context = self.provider.create_context(
            &service,
            self.config.mechanism,
            credentials.delegated(),
        )?;
        let token = self.provider.advance(&mut context, challenge)?;

        log::trace!("generated {} byte Negotiate token", token.len());
        Ok(token)
    }
}

impl<P: SecurityContextProvider> fmt::Debug for NegotiateScheme<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiateScheme")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Host, Mechanism, ProviderFailure};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        service: String,
        mechanism: Mechanism,
        credential: Option<u32>,
        input: Vec<u8>,
    }

    struct StubProvider {
        output: std::result::Result<Vec<u8>, ProviderFailure>,
        calls: RefCell<Vec<Call>>,
    }

    impl StubProvider {
        fn returning(token: &[u8]) -> Self {
            StubProvider {
                output: Ok(token.to_vec()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(failure: ProviderFailure) -> Self {
            StubProvider {
                output: Err(failure),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl SecurityContextProvider for StubProvider {
        type Credential = u32;
        type Context = Call;

        fn create_context(
            &self,
            service: &str,
            mechanism: Mechanism,
            credential: Option<&u32>,
        ) -> std::result::Result<Call, ProviderError> {
            Ok(Call {
                service: service.to_owned(),
                mechanism,
                credential: credential.copied(),
                input: Vec::new(),
            })
        }

        fn advance(
            &self,
            context: &mut Call,
            input: &[u8],
        ) -> std::result::Result<Vec<u8>, ProviderError> {
            context.input = input.to_vec();
            self.calls.borrow_mut().push(context.clone());
            match self.output {
                Ok(ref token) => Ok(token.clone()),
                Err(failure) => Err(ProviderError::new(failure, "stub failure")),
            }
        }
    }

    fn config() -> NegotiateConfig {
        NegotiateConfig::builder()
            .strip_port(true)
            .use_canonical_hostname(false)
            .build()
    }

    fn route() -> Route {
        Route::direct(Host::new("www.example.com", 443))
    }

    fn bare() -> Challenge {
        Challenge::new("")
    }

    #[test]
    fn test_single_round_trip() {
        let provider = StubProvider::returning(&[0x01, 0x02]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        assert_eq!(scheme.state(), State::ChallengeReceived);
        assert!(!scheme.is_complete());

        let header = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();
        assert_eq!(*header.name(), http::header::AUTHORIZATION);
        assert_eq!(header.value(), "Negotiate AQI=");
        assert_eq!(scheme.state(), State::TokenGenerated);
        assert!(scheme.is_complete());

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].service, "HTTP@www.example.com");
        assert_eq!(calls[0].mechanism, Mechanism::Spnego);
        assert_eq!(calls[0].credential, None);
        assert!(calls[0].input.is_empty());
    }

    #[test]
    fn test_challenge_bytes_reach_provider() {
        let provider = StubProvider::returning(b"out");
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme
            .process_challenge(ChallengeType::Target, &Challenge::new("AQI="))
            .unwrap();
        scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();

        assert_eq!(provider.calls()[0].input, vec![0x01, 0x02]);
    }

    #[test]
    fn test_token_generated_reemits_without_provider() {
        let provider = StubProvider::returning(&[0xff]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        let first = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();
        let second = scheme.authenticate(&Credentials::CurrentUser, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn test_not_initiated() {
        let provider = StubProvider::returning(&[0x01]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        let err = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err();
        assert!(err.is_not_initiated());
        assert_eq!(scheme.state(), State::Uninitiated);
        assert!(!scheme.is_complete());
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_second_challenge_fails_scheme() {
        // Multi-leg handshakes are not continued: a second challenge ends
        // the attempt whatever it carries.
        for second in ["", "AQI=", "%%% not base64"] {
            let provider = StubProvider::returning(&[0x01]);
            let mut scheme = NegotiateScheme::new(config(), &provider);

            scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
            scheme
                .process_challenge(ChallengeType::Target, &Challenge::new(second))
                .unwrap();
            assert_eq!(scheme.state(), State::Failed);
            assert!(scheme.is_complete());

            let err = scheme
                .authenticate(&Credentials::CurrentUser, Some(&route()))
                .unwrap_err();
            assert!(err.is_failed());
            assert!(provider.calls().is_empty());
        }
    }

    #[test]
    fn test_second_challenge_after_token_fails_scheme() {
        let provider = StubProvider::returning(&[0x01]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();
        scheme
            .process_challenge(ChallengeType::Target, &Challenge::new("oYGg"))
            .unwrap();

        assert_eq!(scheme.state(), State::Failed);
        assert!(scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err()
            .is_failed());
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn test_malformed_challenge() {
        let provider = StubProvider::returning(&[0x01]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        let err = scheme
            .process_challenge(ChallengeType::Target, &Challenge::new("not*base64"))
            .unwrap_err();
        assert!(err.is_malformed_challenge());
        assert_eq!(scheme.state(), State::Failed);
    }

    #[test]
    fn test_route_unavailable_keeps_challenge() {
        let provider = StubProvider::returning(&[0x01, 0x02]);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        let err = scheme
            .authenticate(&Credentials::CurrentUser, None)
            .unwrap_err();
        assert!(err.is_route_unavailable());
        assert_eq!(scheme.state(), State::ChallengeReceived);
        assert!(provider.calls().is_empty());

        let header = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();
        assert_eq!(header.value(), "Negotiate AQI=");
    }

    #[test]
    fn test_expired_credentials() {
        let provider = StubProvider::failing(ProviderFailure::CredentialsExpired);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        let err = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err();
        assert!(err.is_invalid_credentials());
        assert_eq!(scheme.state(), State::Failed);
        assert!(scheme.is_complete());

        // failure is permanent and the provider is not asked again
        let err = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err();
        assert!(err.is_failed());
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn test_duplicate_token() {
        let provider = StubProvider::failing(ProviderFailure::DuplicateToken);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        let err = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(scheme.state(), State::Failed);
    }

    #[test]
    fn test_other_provider_failure() {
        let provider = StubProvider::failing(ProviderFailure::BadMechanism);
        let mut scheme = NegotiateScheme::new(config(), &provider);

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        let err = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap_err();
        assert!(err.is_failed());
    }

    #[test]
    fn test_proxy_authentication() {
        let provider = StubProvider::returning(&[0x01, 0x02]);
        let config = NegotiateConfig::builder()
            .proxy(true)
            .strip_port(false)
            .use_canonical_hostname(false)
            .mechanism(Mechanism::Kerberos)
            .build();
        let mut scheme = NegotiateScheme::new(config, &provider);
        let route = route().with_proxy(Host::new("proxy.corp.com", 3128));

        scheme.process_challenge(ChallengeType::Proxy, &bare()).unwrap();
        let header = scheme
            .authenticate(&Credentials::Delegated(42), Some(&route))
            .unwrap();

        assert_eq!(*header.name(), http::header::PROXY_AUTHORIZATION);
        assert_eq!(header.value(), "Negotiate AQI=");

        let calls = provider.calls();
        assert_eq!(calls[0].service, "HTTP@proxy.corp.com:3128");
        assert_eq!(calls[0].mechanism, Mechanism::Kerberos);
        assert_eq!(calls[0].credential, Some(42));
    }

    #[test]
    fn test_proxy_without_proxy_host_uses_target() {
        let provider = StubProvider::returning(&[0x01]);
        let config = NegotiateConfig::builder()
            .proxy(true)
            .use_canonical_hostname(false)
            .build();
        let mut scheme = NegotiateScheme::new(config, &provider);

        scheme.process_challenge(ChallengeType::Proxy, &bare()).unwrap();
        scheme
            .authenticate(&Credentials::CurrentUser, Some(&route()))
            .unwrap();

        assert_eq!(provider.calls()[0].service, "HTTP@www.example.com");
    }

    #[test]
    fn test_mismatched_challenge_type_follows_config() {
        let provider = StubProvider::returning(&[0x01, 0x02]);
        let mut scheme = NegotiateScheme::new(config(), &provider);
        let route = route().with_proxy(Host::new("proxy.corp.com", 3128));

        scheme.process_challenge(ChallengeType::Proxy, &bare()).unwrap();
        assert_eq!(scheme.state(), State::ChallengeReceived);

        let header = scheme
            .authenticate(&Credentials::CurrentUser, Some(&route))
            .unwrap();
        assert_eq!(*header.name(), http::header::AUTHORIZATION);
        assert_eq!(provider.calls()[0].service, "HTTP@www.example.com");
    }

    #[test]
    fn test_explicit_credentials_not_passed() {
        let provider = StubProvider::returning(&[0x01]);
        let mut scheme = NegotiateScheme::new(config(), &provider);
        let creds = Credentials::Explicit {
            username: "alice".into(),
            password: "secret".into(),
        };

        scheme.process_challenge(ChallengeType::Target, &bare()).unwrap();
        scheme.authenticate(&creds, Some(&route())).unwrap();

        assert_eq!(provider.calls()[0].credential, None);
    }
}
