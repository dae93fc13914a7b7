//! Request and response shapes of the backend credential exchange.
//!
//! The backend speaks GraphQL; each mutation returns its payload under
//! `data.<operation>` and may additionally report top-level `errors`.

use serde::{Deserialize, Serialize};

/// Variables of the `tokenCreate` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCreateVariables {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl TokenCreateVariables {
    /// Creates sign-in credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Variables of the `setPassword` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetVariables {
    /// Account email.
    pub email: String,
    /// The new password.
    pub password: String,
    /// One-time reset token delivered out of band.
    pub token: String,
}

/// Variables of the `tokenRefresh` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshVariables {
    /// The durable refresh token.
    pub refresh_token: String,
}

/// A top-level GraphQL error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Error message.
    pub message: String,
}

/// A field-level error reported inside a mutation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountError {
    /// Offending input field, if any.
    #[serde(default)]
    pub field: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
}

/// GraphQL response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    /// Operation data.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Top-level errors.
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// Payload of `tokenCreate` and `setPassword`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    /// New access token.
    #[serde(default)]
    pub token: Option<String>,
    /// New refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Field errors.
    #[serde(default)]
    pub errors: Vec<AccountError>,
}

/// Payload of `tokenRefresh`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefreshPayload {
    /// New access token.
    #[serde(default)]
    pub token: Option<String>,
    /// Field errors.
    #[serde(default)]
    pub errors: Vec<AccountError>,
}

/// `data` of a `tokenCreate` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreateData {
    /// The mutation payload.
    pub token_create: Option<TokenPayload>,
}

/// `data` of a `setPassword` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordData {
    /// The mutation payload.
    pub set_password: Option<TokenPayload>,
}

/// `data` of a `tokenRefresh` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshData {
    /// The mutation payload.
    pub token_refresh: Option<TokenRefreshPayload>,
}

/// Response of `tokenCreate`.
pub type TokenCreateResponse = GraphqlResponse<TokenCreateData>;
/// Response of `setPassword`.
pub type PasswordResetResponse = GraphqlResponse<SetPasswordData>;
/// Response of `tokenRefresh`.
pub type TokenRefreshResponse = GraphqlResponse<TokenRefreshData>;

/// Responses that establish a session (sign-in and password reset).
pub trait SignInResponse {
    /// The token payload, if the backend returned one.
    fn payload(&self) -> Option<&TokenPayload>;
}

impl SignInResponse for TokenCreateResponse {
    fn payload(&self) -> Option<&TokenPayload> {
        self.data.as_ref()?.token_create.as_ref()
    }
}

impl SignInResponse for PasswordResetResponse {
    fn payload(&self) -> Option<&TokenPayload> {
        self.data.as_ref()?.set_password.as_ref()
    }
}

impl TokenRefreshResponse {
    /// Returns the refreshed access token when the backend reported no
    /// errors of any kind and the token is non-empty.
    #[must_use]
    pub fn refreshed_token(&self) -> Option<&str> {
        if !self.errors.is_empty() {
            return None;
        }
        let payload = self.data.as_ref()?.token_refresh.as_ref()?;
        if !payload.errors.is_empty() {
            return None;
        }
        payload.token.as_deref().filter(|token| !token.is_empty())
    }

    /// Builds a successful refresh response.
    #[must_use]
    pub fn success(token: impl Into<String>) -> Self {
        Self {
            data: Some(TokenRefreshData {
                token_refresh: Some(TokenRefreshPayload {
                    token: Some(token.into()),
                    errors: Vec::new(),
                }),
            }),
            errors: Vec::new(),
        }
    }

    /// Builds a rejected refresh response carrying one field error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            data: Some(TokenRefreshData {
                token_refresh: Some(TokenRefreshPayload {
                    token: None,
                    errors: vec![AccountError {
                        field: Some("refreshToken".to_string()),
                        message: Some(message.into()),
                        code: Some("JWT_INVALID_TOKEN".to_string()),
                    }],
                }),
            }),
            errors: Vec::new(),
        }
    }
}

impl TokenPayload {
    /// Returns the access token when no errors were reported.
    #[must_use]
    pub fn accepted_token(&self) -> Option<&str> {
        if !self.errors.is_empty() {
            return None;
        }
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}
