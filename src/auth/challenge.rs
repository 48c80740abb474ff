// src/auth/challenge.rs

//! Negotiate challenge parsing and response header construction.

use base64::Engine as _;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

use crate::error::{self, Result};

/// The authentication scheme label used in both directions.
pub const SCHEME: &str = "Negotiate";

/// Who issued a challenge: the origin server or a proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeType {
    /// `401 Unauthorized` with `WWW-Authenticate`.
    Target,
    /// `407 Proxy Authentication Required` with `Proxy-Authenticate`.
    Proxy,
}

impl ChallengeType {
    /// The challenge type implied by a response status, if any.
    pub fn from_status(status: StatusCode) -> Option<ChallengeType> {
        match status {
            StatusCode::UNAUTHORIZED => Some(ChallengeType::Target),
            StatusCode::PROXY_AUTHENTICATION_REQUIRED => Some(ChallengeType::Proxy),
            _ => None,
        }
    }

    /// The response header carrying challenges of this type.
    pub fn challenge_header(&self) -> HeaderName {
        match self {
            ChallengeType::Target => http::header::WWW_AUTHENTICATE,
            ChallengeType::Proxy => http::header::PROXY_AUTHENTICATE,
        }
    }

    /// The request header answering challenges of this type.
    pub fn response_header(&self) -> HeaderName {
        match self {
            ChallengeType::Target => http::header::AUTHORIZATION,
            ChallengeType::Proxy => http::header::PROXY_AUTHORIZATION,
        }
    }
}

/// A `Negotiate` challenge as received from the server.
///
/// The token is kept in its textual form; it is decoded when the challenge
/// is processed by a scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    token: Option<String>,
}

impl Challenge {
    /// A challenge carrying `token`, or a bare one when `token` is empty.
    pub fn new(token: impl Into<String>) -> Challenge {
        let token = token.into();
        let token = token.trim();
        Challenge {
            token: if token.is_empty() {
                None
            } else {
                Some(token.to_owned())
            },
        }
    }

    /// Parses a single challenge such as `Negotiate` or `Negotiate YII...`.
    ///
    /// Returns `None` for any other scheme.
    pub fn parse(value: &str) -> Option<Challenge> {
        let trimmed = value.trim();
        let (scheme, rest) = match trimmed.find(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, ""),
        };

        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return None;
        }

        Some(Challenge::new(rest))
    }

    /// Finds the `Negotiate` challenge among the response's challenge headers.
    pub fn from_headers(headers: &HeaderMap, challenge_type: ChallengeType) -> Option<Challenge> {
        headers
            .get_all(challenge_type.challenge_header())
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .find_map(Challenge::parse)
    }

    /// The base64 token, if the server sent one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Decodes the token; a bare challenge decodes to no bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self.token {
            Some(ref token) => decode(token),
            None => Ok(Vec::new()),
        }
    }
}

/// Decodes a base64 challenge payload.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(error::malformed_challenge)
}

/// Encodes a token as a single unbroken base64 string.
pub fn encode(token: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(token)
}

/// The header answering a challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AuthHeader {
    pub(crate) fn negotiate(challenge_type: ChallengeType, token: &[u8]) -> Result<AuthHeader> {
        let mut value = HeaderValue::from_str(&format!("{} {}", SCHEME, encode(token)))
            .map_err(error::failed_with)?;
        value.set_sensitive(true);

        Ok(AuthHeader {
            name: challenge_type.response_header(),
            value,
        })
    }

    /// `Authorization` or `Proxy-Authorization`.
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    /// `Negotiate <base64 token>`.
    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    /// Inserts the header into `headers`, replacing any previous value.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(self.name.clone(), self.value.clone());
    }

    pub fn into_parts(self) -> (HeaderName, HeaderValue) {
        (self.name, self.value)
    }
}
