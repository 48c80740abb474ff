#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # http-negotiate
//!
//! The client side of the HTTP `Negotiate` authentication scheme
//! ([RFC 4559]), as used with Kerberos and SPNEGO.
//!
//! The crate does not speak Kerberos itself. Tokens are produced by a
//! [`SecurityContextProvider`](auth::SecurityContextProvider); enable the
//! `gssapi` feature for one backed by the system GSSAPI library, or plug in
//! your own.
//!
//! ## Answering a challenge
//!
//! ```ignore
//! use http_negotiate::auth::{
//!     Challenge, ChallengeType, Credentials, GssapiProvider, NegotiateConfig, NegotiateScheme,
//!     Route,
//! };
//!
//! let challenge = Challenge::from_headers(response.headers(), ChallengeType::Target)
//!     .expect("server offers Negotiate");
//!
//! let mut scheme = NegotiateScheme::new(NegotiateConfig::target(), GssapiProvider::new());
//! scheme.process_challenge(ChallengeType::Target, &challenge)?;
//!
//! let route = Route::from_uri(request.uri());
//! let header = scheme.authenticate(&Credentials::CurrentUser, route.as_ref())?;
//! header.apply(request.headers_mut());
//! ```
//!
//! [`execute_with_negotiate`](auth::execute_with_negotiate) runs the whole
//! exchange around any function that sends an `http::Request`.
//!
//! ## Optional Features
//!
//! - **gssapi**: Provides security contexts through `libgssapi`.
//!
//! [RFC 4559]: https://www.rfc-editor.org/rfc/rfc4559

pub use self::error::{Error, Result};

pub mod auth;
mod error;
