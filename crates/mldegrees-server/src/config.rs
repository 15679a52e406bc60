use serde::Serialize;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub max_body_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
    pub enable_local_auth: bool,
    pub enable_request_log: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_body_bytes: 64 * 1024,
            cors_allowed_origins: Vec::new(),
            enable_local_auth: false,
            enable_request_log: true,
        }
    }
}

/// Checked once at startup, before the listener binds. A bad value here is
/// an operator error and must stop the process rather than surface later
/// as per-request failures.
pub fn validate_startup_config_contract(api: &ApiConfig) -> Result<(), String> {
    if api.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind address: {}", api.bind_addr));
    }
    if api.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    if api
        .cors_allowed_origins
        .iter()
        .any(|origin| origin.trim().is_empty())
    {
        return Err("cors_allowed_origins must not contain empty entries".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_config_validation_accepts_defaults() {
        validate_startup_config_contract(&ApiConfig::default()).expect("defaults valid");
    }

    #[test]
    fn startup_config_validation_rejects_bad_bind_addr() {
        let api = ApiConfig {
            bind_addr: "localhost-no-port".to_string(),
            ..ApiConfig::default()
        };
        let err = validate_startup_config_contract(&api).expect_err("missing port");
        assert!(err.contains("bind address"));

        let api = ApiConfig {
            bind_addr: "127.0.0.1:99999".to_string(),
            ..ApiConfig::default()
        };
        assert!(validate_startup_config_contract(&api).is_err());
    }

    #[test]
    fn startup_config_validation_rejects_zero_body_limit() {
        let api = ApiConfig {
            max_body_bytes: 0,
            ..ApiConfig::default()
        };
        let err = validate_startup_config_contract(&api).expect_err("zero body limit");
        assert!(err.contains("max_body_bytes"));
    }

    #[test]
    fn startup_config_validation_rejects_blank_origins() {
        let api = ApiConfig {
            cors_allowed_origins: vec!["http://localhost:5173".to_string(), "  ".to_string()],
            ..ApiConfig::default()
        };
        let err = validate_startup_config_contract(&api).expect_err("blank origin");
        assert!(err.contains("cors_allowed_origins"));
    }
}
