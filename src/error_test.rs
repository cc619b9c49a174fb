use super::*;

// =============================================================================
// from_status
// =============================================================================

#[test]
fn unauthorized_maps_to_authentication() {
    let err = ApiError::from_status(401, r#"{"message":"Bad credentials"}"#);
    assert_eq!(err, ApiError::Authentication { message: "Bad credentials".into() });
}

#[test]
fn client_error_maps_to_validation_with_message() {
    let err = ApiError::from_status(409, r#"{"message":"Email already registered"}"#);
    assert_eq!(err, ApiError::Validation { status: 409, message: "Email already registered".into() });
}

#[test]
fn server_error_maps_to_server() {
    let err = ApiError::from_status(503, "");
    assert_eq!(err, ApiError::Server { status: 503, message: "Service Unavailable".into() });
}

#[test]
fn wrapped_error_message_is_extracted() {
    let err = ApiError::from_status(400, r#"{"error":{"status":"BAD_REQUEST","message":"Invalid OTP"}}"#);
    assert_eq!(err.user_message(), "Invalid OTP");
}

#[test]
fn json_without_message_falls_back_to_reason() {
    let err = ApiError::from_status(404, r#"{"timestamp":"2024-01-01"}"#);
    assert_eq!(err.user_message(), "Not Found");
}

#[test]
fn plain_text_body_is_used_verbatim() {
    let err = ApiError::from_status(400, "rating out of range");
    assert_eq!(err.user_message(), "rating out of range");
}

#[test]
fn html_body_is_ignored() {
    let err = ApiError::from_status(502, "<html><body>Bad Gateway</body></html>");
    assert_eq!(err.user_message(), "Bad Gateway");
}

// =============================================================================
// codes / retryable
// =============================================================================

#[test]
fn error_codes_are_stable() {
    assert_eq!(ApiError::Network("x".into()).error_code(), "E_NETWORK");
    assert_eq!(ApiError::ProfileFetch("x".into()).error_code(), "E_PROFILE_FETCH");
    assert_eq!(ApiError::invalid_input("x").error_code(), "E_VALIDATION");
}

#[test]
fn only_network_and_server_errors_are_retryable() {
    assert!(ApiError::Network("down".into()).retryable());
    assert!(ApiError::Server { status: 500, message: String::new() }.retryable());
    assert!(!ApiError::Authentication { message: String::new() }.retryable());
    assert!(!ApiError::invalid_input("bad").retryable());
}

#[test]
fn display_includes_status() {
    let err = ApiError::Validation { status: 422, message: "nope".into() };
    assert_eq!(err.to_string(), "request rejected (422): nope");
}
