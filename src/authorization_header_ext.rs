use crate::error::ApiError;

const BEARER_SCHEME: &str = "bearer";

pub trait AuthorizationHeaderExt {
    /// Split an `Authorization` value into scheme and credentials, accepting only
    /// the bearer scheme (case-insensitive).
    fn bearer_token(&self) -> Result<&str, ApiError>;
}

impl AuthorizationHeaderExt for str {
    fn bearer_token(&self) -> Result<&str, ApiError> {
        let mut fields = self.split_whitespace();

        let (scheme, token) = match (fields.next(), fields.next()) {
            (Some(scheme), Some(token)) => (scheme, token),
            _ => return Err(ApiError::MalformedHeader),
        };

        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(ApiError::UnsupportedScheme(scheme.to_ascii_lowercase()));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        assert_eq!("Bearer abc.def.ghi".bearer_token().unwrap(), "abc.def.ghi");
        assert_eq!("BEARER  abc".bearer_token().unwrap(), "abc");
        assert_eq!("bearer\tabc".bearer_token().unwrap(), "abc");
    }

    #[test]
    fn rejects_missing_token() {
        for header in ["", "   ", "Bearer", "Bearer   ", "abc"] {
            assert!(matches!(
                header.bearer_token(),
                Err(ApiError::MalformedHeader)
            ));
        }
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            "Basic abc123".bearer_token(),
            Err(ApiError::UnsupportedScheme(scheme)) if scheme == "basic"
        ));
    }
}
