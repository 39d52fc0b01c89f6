//! Bearer-token sources for outgoing requests
//!
//! An empty token means "send no Authorization header".

/// Supplies the bearer token attached to each request
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> String;
}

/// No credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn token(&self) -> String {
        String::new()
    }
}

/// A fixed token
#[derive(Debug, Clone, Default)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> String {
        self.0.clone()
    }
}

/// Reads the token from an environment variable on every request
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub const DEFAULT_VAR: &'static str = "STUDY_API_TOKEN";

    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl CredentialProvider for EnvToken {
    fn token(&self) -> String {
        std::env::var(&self.var).unwrap_or_default()
    }
}

impl<F> CredentialProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn token(&self) -> String {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_anonymous() {
        assert_eq!(StaticToken::new("abc").token(), "abc");
        assert_eq!(Anonymous.token(), "");
    }

    #[test]
    fn test_env_token_reads_each_time() {
        let provider = EnvToken::new("STUDY_STREAM_TEST_TOKEN_ENV");
        std::env::remove_var(provider.var());
        assert_eq!(provider.token(), "");

        std::env::set_var(provider.var(), "from-env");
        assert_eq!(provider.token(), "from-env");
        std::env::remove_var(provider.var());
    }

    #[test]
    fn test_closure_provider() {
        let provider = || "closure".to_string();
        assert_eq!(CredentialProvider::token(&provider), "closure");
    }
}
