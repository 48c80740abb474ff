// src/auth/negotiate.rs

//! Driving a request through a Negotiate handshake.
//!
//! Implements the client side of RFC 4559: send the request, answer a
//! `Negotiate` challenge once, and send it again with the token.

use std::future::Future;

use http::{Request, Response};

use super::challenge::{Challenge, ChallengeType};
use super::provider::SecurityContextProvider;
use super::route::{Host, Route};
use super::scheme::NegotiateScheme;
use super::{Credentials, NegotiateConfig};
use crate::error::{self, BoxError, Result};

/// Execute a request with HTTP Negotiate authentication.
///
/// 1. Send the request without authentication.
/// 2. On `401` (or `407` for proxy configurations) carrying a `Negotiate`
///    challenge, generate a token and send the request again with it.
///
/// Any other response, including a challenge response offering only other
/// schemes, is returned unchanged. The handshake is a single round trip: a
/// response that challenges the token again is returned to the caller.
///
/// # Arguments
/// * `config` - Negotiate settings; `proxy` selects which challenge is answered
/// * `provider` - Produces the security token
/// * `credentials` - Credentials passed on to the provider
/// * `proxy` - The proxy the request travels through, if any
/// * `request` - The request to execute; its body is cloned for the retry
/// * `send` - Function to send HTTP requests
pub async fn execute_with_negotiate<P, B, R, E, F, Fut>(
    config: NegotiateConfig,
    provider: P,
    credentials: &Credentials<P::Credential>,
    proxy: Option<Host>,
    request: Request<B>,
    mut send: F,
) -> Result<Response<R>>
where
    P: SecurityContextProvider,
    B: Clone,
    F: FnMut(Request<B>) -> Fut,
    Fut: Future<Output = std::result::Result<Response<R>, E>>,
    E: Into<BoxError>,
{
    let mut retry = replay(&request);

    // Send initial request without authentication
    let response = send(request).await.map_err(error::request)?;

    let challenge_type = config.challenge_type();
    if ChallengeType::from_status(response.status()) != Some(challenge_type) {
        return Ok(response);
    }

    let challenge = match Challenge::from_headers(response.headers(), challenge_type) {
        Some(challenge) => challenge,
        None => {
            log::debug!("{} without a Negotiate challenge", response.status());
            return Ok(response);
        }
    };

    let mut scheme = NegotiateScheme::new(config, provider);
    scheme.process_challenge(challenge_type, &challenge)?;

    let route = Route::from_uri(retry.uri()).map(|route| match proxy {
        Some(proxy) => route.with_proxy(proxy),
        None => route,
    });
    let header = scheme.authenticate(credentials, route.as_ref())?;
    header.apply(retry.headers_mut());

    let response = send(retry).await.map_err(error::request)?;

    if ChallengeType::from_status(response.status()) == Some(challenge_type) {
        log::debug!("Negotiate token rejected with {}", response.status());
    } else if response.status().is_success() {
        if let Some(token) = Challenge::from_headers(response.headers(), ChallengeType::Target)
            .as_ref()
            .and_then(Challenge::token)
        {
            log::debug!("mutual authentication token received from server");
            log::trace!("server token: {}", token);
        }
    }

    Ok(response)
}

// Extensions are not carried over.
fn replay<B: Clone>(request: &Request<B>) -> Request<B> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}
