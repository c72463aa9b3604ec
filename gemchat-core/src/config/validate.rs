//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.api_key.trim().is_empty() {
        errors.push("provider.api_key is not set (export GEMINI_API_KEY)".to_string());
    }
    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if config.provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }
    if let Some(temperature) = config.provider.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
        }
    }
    if config.provider.max_output_tokens == Some(0) {
        errors.push("provider.max_output_tokens must be > 0".to_string());
    }

    if config.chat.sessions_dir.trim().is_empty() {
        errors.push("chat.sessions_dir must not be empty".to_string());
    }
    for (field, ext) in [
        ("chat.session_extension", &config.chat.session_extension),
        ("chat.export_extension", &config.chat.export_extension),
    ] {
        if ext.trim().is_empty() || ext.contains(['.', '/', '\\']) {
            errors.push(format!("{field} must be a bare extension such as `cht`"));
        }
    }
    if config.chat.session_extension == config.chat.export_extension {
        errors.push("chat.session_extension and chat.export_extension must differ".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}
