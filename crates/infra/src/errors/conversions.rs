//! Conversions from external infrastructure errors into domain errors.

use pms_domain::PmsError;
use reqwest::{Error as HttpError, Response};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PmsError);

impl From<InfraError> for PmsError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PmsError> for InfraError {
    fn from(value: PmsError) -> Self {
        InfraError(value)
    }
}

trait IntoPmsError {
    fn into_pms(self) -> PmsError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → PmsError */
/* -------------------------------------------------------------------------- */

impl IntoPmsError for HttpError {
    fn into_pms(self) -> PmsError {
        if self.is_timeout() {
            return PmsError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return PmsError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return PmsError::Serialization(format!("malformed HTTP response body: {self}"));
        }

        if self.is_builder() {
            return PmsError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return match code {
                404 => PmsError::NotFound(message),
                _ => PmsError::Remote { status: code, message },
            };
        }

        PmsError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_pms())
    }
}

/// Turn a non-2xx response into [`PmsError::Remote`], keeping a bounded
/// excerpt of the body for diagnostics. Successful responses pass through.
pub async fn error_for_response(response: Response) -> Result<Response, PmsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(MAX_BODY_EXCERPT).collect();
    let message = if excerpt.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        excerpt
    };

    Err(PmsError::Remote { status: status.as_u16(), message })
}

const MAX_BODY_EXCERPT: usize = 512;

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
