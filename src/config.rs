use std::{collections::BTreeSet, env};

use thiserror::Error;

use crate::{
    gate::{GatePaths, default_exempt_roles},
    models::{Role, UnknownRole},
    routes,
};

/// AppConfig
///
/// Holds the portal's configuration. Loaded once at startup and shared immutably
/// through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // Secret used to sign and validate session tokens.
    pub jwt_secret: String,
    pub bind_addr: String,
    // Lifetime of an issued session token, in seconds.
    pub session_ttl_secs: u64,
    // Roles that skip the approval check on routes that require approval.
    pub approval_exempt_roles: BTreeSet<Role>,
    pub gate_paths: GatePaths,
}

/// Env
///
/// Defines the runtime context: local development utilities vs. hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingSecret(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("GATE_APPROVAL_EXEMPT_ROLES: {0}")]
    ExemptRoles(#[from] UnknownRole),
}

const LOCAL_JWT_SECRET: &str = "local-portal-secret-do-not-use-in-prod";

/// Upper bound of `SESSION_TTL_SECS`: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl Default for AppConfig {
    /// Safe values for tests and local scaffolding; no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            session_ttl_secs: 3600,
            approval_exempt_roles: default_exempt_roles(),
            gate_paths: GatePaths::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Fails fast in production
    /// when `PORTAL_JWT_SECRET` is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").unwrap_or_default().as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match (env::var("PORTAL_JWT_SECRET"), &env) {
            (Ok(secret), _) if !secret.is_empty() => secret,
            (_, Env::Production) => return Err(ConfigError::MissingSecret("PORTAL_JWT_SECRET")),
            (_, Env::Local) => LOCAL_JWT_SECRET.to_string(),
        };

        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => parse_ttl(&raw)?,
            Err(_) => 3600,
        };

        let approval_exempt_roles = match env::var("GATE_APPROVAL_EXEMPT_ROLES") {
            Ok(raw) => parse_roles(&raw)?,
            Err(_) => default_exempt_roles(),
        };

        let defaults = GatePaths::default();
        let gate_paths = GatePaths {
            sign_in: path_var("GATE_SIGN_IN_PATH", defaults.sign_in)?,
            pending: path_var("GATE_PENDING_PATH", defaults.pending)?,
            home: path_var("GATE_HOME_PATH", defaults.home)?,
        };
        validate_gate_paths(&gate_paths)?;

        Ok(Self {
            env,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            session_ttl_secs,
            approval_exempt_roles,
            gate_paths,
        })
    }
}

/// Parses a comma separated role list. An empty string means no role is exempt.
pub fn parse_roles(raw: &str) -> Result<BTreeSet<Role>, UnknownRole> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<Role>)
        .collect()
}

fn parse_ttl(raw: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "SESSION_TTL_SECS",
        reason,
    };
    let secs: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    if secs == 0 || secs > MAX_SESSION_TTL_SECS {
        return Err(invalid(format!(
            "{secs} is outside 1..={MAX_SESSION_TTL_SECS} seconds"
        )));
    }
    Ok(secs)
}

fn path_var(var: &'static str, default: String) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(path) if !path.starts_with('/') => Err(ConfigError::Invalid {
            var,
            reason: format!("'{path}' is not an absolute path"),
        }),
        // Route syntax characters would turn the page into a pattern.
        Ok(path) if path.contains(['{', '}', '*', '?', '#']) => Err(ConfigError::Invalid {
            var,
            reason: format!("'{path}' contains route syntax"),
        }),
        Ok(path) => Ok(path),
        Err(_) => Ok(default),
    }
}

/// validate_gate_paths
///
/// The three gate destinations are public pages: they must be distinct and must not
/// overlap any path the portal mounts itself.
pub fn validate_gate_paths(paths: &GatePaths) -> Result<(), ConfigError> {
    let named = [
        ("GATE_SIGN_IN_PATH", &paths.sign_in),
        ("GATE_PENDING_PATH", &paths.pending),
        ("GATE_HOME_PATH", &paths.home),
    ];

    for (i, &(var, path)) in named.iter().enumerate() {
        if routes::is_reserved(path) {
            return Err(ConfigError::Invalid {
                var,
                reason: format!("'{path}' collides with a portal route"),
            });
        }
        if let Some(&(other, _)) = named[..i].iter().find(|&&(_, earlier)| earlier == path) {
            return Err(ConfigError::Invalid {
                var,
                reason: format!("'{path}' is already used by {other}"),
            });
        }
    }
    Ok(())
}
