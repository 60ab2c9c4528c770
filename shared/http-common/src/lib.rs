//! Shared HTTP utilities for the mock-store workspace.
//!
//! Provides the response envelope and structured error bodies used by
//! api-server.

// ============================================================================
// Response Envelope
// ============================================================================

/// Wrap a successful payload for the client.
///
/// Returns: `{"data": <payload>}`
pub fn wrap(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "data": data })
}

// ============================================================================
// JSON Error Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        let wrapped = wrap(serde_json::json!({"id": "MOCK_food_0_ID"}));
        assert_eq!(wrapped, serde_json::json!({"data": {"id": "MOCK_food_0_ID"}}));

        let wrapped = wrap(serde_json::json!([]));
        assert_eq!(wrapped, serde_json::json!({"data": []}));
    }

    #[test]
    fn test_json_err() {
        let err = json_err("not_found");
        assert_eq!(err, serde_json::json!({"error": {"code": "not_found", "message": "Resource not found"}}));

        // Unknown code falls back to code as message
        let err = json_err("custom_error");
        assert_eq!(err, serde_json::json!({"error": {"code": "custom_error", "message": "custom_error"}}));
    }

    #[test]
    fn test_json_error_with_message() {
        let err = json_error_with_message("bad_request", "Food name must be specified");
        assert_eq!(
            err,
            serde_json::json!({"error": {"code": "bad_request", "message": "Food name must be specified"}})
        );
    }
}
