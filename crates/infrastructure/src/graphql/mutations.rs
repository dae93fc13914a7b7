//! GraphQL documents of the credential exchanges.

/// Exchanges email and password for an access and refresh token.
pub const TOKEN_CREATE: &str = "mutation tokenCreate($email: String!, $password: String!) {
  tokenCreate(email: $email, password: $password) {
    token
    refreshToken
    errors {
      field
      message
      code
    }
  }
}";

/// Exchanges a refresh token for a new access token.
pub const TOKEN_REFRESH: &str = "mutation refreshToken($refreshToken: String!) {
  tokenRefresh(refreshToken: $refreshToken) {
    token
    errors {
      field
      message
      code
    }
  }
}";

/// Sets a new password with a reset token and signs in.
pub const PASSWORD_RESET: &str = "mutation passwordReset($email: String!, $password: String!, $token: String!) {
  setPassword(email: $email, password: $password, token: $token) {
    token
    refreshToken
    errors {
      field
      message
      code
    }
  }
}";
