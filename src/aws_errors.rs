//! Classification of AWS SDK failures into costdash error kinds
//!
//! Every SDK client (S3, EC2, Cost Explorer, Lambda) reports failures as
//! `SdkError<E, HttpResponse>`. The service error code and HTTP status decide
//! which `CostdashError` the caller sees.

use crate::error::CostdashError;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::debug;

/// Broad category of an AWS failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Access,
    Auth,
    Transient,
    Other,
}

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound", "ResourceNotFoundException"];

const ACCESS_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "Forbidden",
    "AllAccessDisabled",
];

const AUTH_CODES: &[&str] = &[
    "AuthFailure",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidAccessKeyId",
    "InvalidClientTokenId",
    "InvalidToken",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
    "MissingAuthenticationToken",
];

const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "LimitExceededException",
    "TooManyRequestsException",
    "SlowDown",
    "RequestTimeout",
    "RequestTimeoutException",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "InternalError",
    "InternalFailure",
];

/// Classify a service error from its error code and HTTP status.
///
/// The error code wins when present; the status is the fallback for services
/// that answer with a bare status (S3 `HeadObject`, for instance).
pub fn classify(code: Option<&str>, status: Option<u16>) -> ErrorClass {
    if let Some(code) = code {
        if NOT_FOUND_CODES.contains(&code) {
            return ErrorClass::NotFound;
        }
        if ACCESS_CODES.contains(&code) {
            return ErrorClass::Access;
        }
        if AUTH_CODES.contains(&code) {
            return ErrorClass::Auth;
        }
        if TRANSIENT_CODES.contains(&code) {
            return ErrorClass::Transient;
        }
    }

    match status {
        Some(404) => ErrorClass::NotFound,
        Some(401) => ErrorClass::Auth,
        Some(403) => ErrorClass::Access,
        Some(429) => ErrorClass::Transient,
        Some(s) if s >= 500 => ErrorClass::Transient,
        _ => ErrorClass::Other,
    }
}

/// Convert an SDK failure into a `CostdashError`.
///
/// `resource` names what was being read (e.g. `s3://bucket/key`) and is used
/// for `NotFound` messages.
pub fn from_sdk_error<E>(
    operation: &str,
    resource: &str,
    err: SdkError<E, HttpResponse>,
) -> CostdashError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = format!("{}", DisplayErrorContext(&err));
    debug!("{} failed: {}", operation, message);

    let class = match &err {
        SdkError::TimeoutError(_) => ErrorClass::Transient,
        SdkError::DispatchFailure(_) => {
            // Credential resolution failures surface as dispatch failures
            if mentions_credentials(&message) {
                ErrorClass::Auth
            } else {
                ErrorClass::Transient
            }
        }
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            classify(service.err().code(), Some(status))
        }
        SdkError::ResponseError(_) => {
            // The service answered but the body could not be read
            return CostdashError::parse(format!("{} response", operation), message);
        }
        _ => {
            if mentions_credentials(&message) {
                ErrorClass::Auth
            } else {
                ErrorClass::Other
            }
        }
    };

    into_error(class, operation, resource, message)
}

fn mentions_credentials(message: &str) -> bool {
    message.to_lowercase().contains("credentials")
}

pub(crate) fn into_error(
    class: ErrorClass,
    operation: &str,
    resource: &str,
    message: String,
) -> CostdashError {
    let operation = operation.to_string();
    match class {
        ErrorClass::NotFound => CostdashError::NotFound {
            operation,
            resource: resource.to_string(),
        },
        ErrorClass::Access => CostdashError::Access { operation, message },
        ErrorClass::Auth => CostdashError::Auth { operation, message },
        ErrorClass::Transient => CostdashError::Transient { operation, message },
        ErrorClass::Other => CostdashError::Aws { operation, message },
    }
}
