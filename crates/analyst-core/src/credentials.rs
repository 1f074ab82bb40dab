//! Environment-sourced Snowflake credentials.
//!
//! The account/user/password triple is used once at startup to open the
//! warehouse connection. The token authenticates calls to the analyst REST
//! endpoint. Values are usually placed in a `.env` file next to the binary.

use std::fmt;

use crate::error::{CoreError, Result};

pub const ACCOUNT_VAR: &str = "SNOWFLAKE_ACCOUNT";
pub const USER_VAR: &str = "SNOWFLAKE_USER";
pub const PASSWORD_VAR: &str = "SNOWFLAKE_PASSWORD";
pub const TOKEN_VAR: &str = "SNOWFLAKE_TOKEN";

#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub user: String,
    pub password: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Read all four variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the variables through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            account: require(&lookup, ACCOUNT_VAR)?,
            user: require(&lookup, USER_VAR)?,
            password: require(&lookup, PASSWORD_VAR)?,
            token: require(&lookup, TOKEN_VAR)?,
        })
    }

    /// Only the analyst token, for setups whose SQL runs somewhere other than
    /// Snowflake.
    pub fn token_from_env() -> Result<String> {
        Self::token_from_lookup(|name| std::env::var(name).ok())
    }

    pub fn token_from_lookup<F>(lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        require(&lookup, TOKEN_VAR)
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(CoreError::MissingCredential(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_lookup_all_present() {
        let vars = env(&[
            (ACCOUNT_VAR, "acme-prod"),
            (USER_VAR, "analyst"),
            (PASSWORD_VAR, "hunter2"),
            (TOKEN_VAR, "tok-123"),
        ]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.account, "acme-prod");
        assert_eq!(creds.user, "analyst");
        assert_eq!(creds.password, "hunter2");
        assert_eq!(creds.token, "tok-123");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let vars = env(&[(ACCOUNT_VAR, "acme-prod"), (USER_VAR, "analyst")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CoreError::MissingCredential(PASSWORD_VAR)));
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let vars = env(&[
            (ACCOUNT_VAR, "acme-prod"),
            (USER_VAR, "   "),
            (PASSWORD_VAR, "hunter2"),
            (TOKEN_VAR, "tok-123"),
        ]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CoreError::MissingCredential(USER_VAR)));
    }

    #[test]
    fn test_token_only_lookup() {
        let vars = env(&[(TOKEN_VAR, " tok-9 ")]);
        let token = Credentials::token_from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(token, "tok-9");

        let err = Credentials::token_from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, CoreError::MissingCredential(TOKEN_VAR)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            account: "acme".into(),
            user: "analyst".into(),
            password: "hunter2".into(),
            token: "tok-123".into(),
        };
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("acme"));
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("tok-123"));
    }
}
