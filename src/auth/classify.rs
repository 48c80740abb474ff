// src/auth/classify.rs

//! Translation of provider failures into authentication errors.

use super::provider::{ProviderError, ProviderFailure};
use crate::error::{self, Error};

/// Maps a provider failure onto the crate's error taxonomy.
///
/// Credential problems become `InvalidCredentials`, token problems become
/// protocol errors, and every other category is a generic failure.
pub(crate) fn classify(err: ProviderError) -> Error {
    match err.failure() {
        ProviderFailure::DefectiveCredential
        | ProviderFailure::CredentialsExpired
        | ProviderFailure::NoCredential => error::invalid_credentials(err),
        ProviderFailure::DefectiveToken
        | ProviderFailure::DuplicateToken
        | ProviderFailure::OldToken => error::protocol(err),
        _ => error::failed_with(err),
    }
}
