/*!
 * Tests for error display and classification
 */

use anyhow::anyhow;
use srtai::errors::{AppError, ProviderError};

#[test]
fn test_providerError_display_shouldIncludeDetails() {
    let err = ProviderError::ApiError {
        status_code: 500,
        message: "boom".to_string(),
    };
    assert_eq!(err.to_string(), "API responded with error: 500 - boom");
    assert_eq!(ProviderError::Timeout(30).to_string(), "Request timed out after 30 seconds");
}

#[test]
fn test_isTransient_shouldOnlyCoverRateLimitsAndServerErrors() {
    assert!(ProviderError::RateLimitExceeded("slow down".to_string()).is_transient());
    assert!(ProviderError::ApiError { status_code: 503, message: String::new() }.is_transient());
    assert!(!ProviderError::ApiError { status_code: 400, message: String::new() }.is_transient());
    assert!(!ProviderError::AuthenticationError("bad key".to_string()).is_transient());
    assert!(!ProviderError::ConnectionError("refused".to_string()).is_transient());
    assert!(!ProviderError::Timeout(1).is_transient());
}

#[test]
fn test_appError_fromProviderError_shouldBeTransport() {
    let err: AppError = ProviderError::ModelNotFound("gpt-x".to_string()).into();
    assert!(matches!(err, AppError::Provider(ProviderError::ModelNotFound(_))));
    assert!(err.to_string().starts_with("Transport error:"));
}

#[test]
fn test_appErrorConfig_shouldKeepTheContextChain() {
    let err = AppError::config(anyhow!("inner cause").context("outer step"));
    match err {
        AppError::Config(message) => assert_eq!(message, "outer step: inner cause"),
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: AppError = io.into();
    assert!(matches!(err, AppError::File(_)));
}
