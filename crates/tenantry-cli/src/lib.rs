use anyhow::Context;
use tenantry_core::models::OrganizationConfig;
use tenantry_core::{ErrorMetadata, ProvisionError};

/// Initialize tracing for the operator binary.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// one JSON object per line.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tenantry=debug,info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Parse an Organization Config document.
pub fn parse_org_config(json: &str) -> anyhow::Result<OrganizationConfig> {
    serde_json::from_str(json).context("Organization config is not valid JSON")
}

/// Operator-facing rendering of a provisioning error: code, message and cause chain.
pub fn operator_error(err: ProvisionError) -> anyhow::Error {
    match err.suggested_action() {
        Some(action) => anyhow::anyhow!(
            "[{}] {}\nHint: {}",
            err.error_code(),
            err.detailed_message(),
            action
        ),
        None => anyhow::anyhow!("[{}] {}", err.error_code(), err.detailed_message()),
    }
}

/// Truncate to `max_chars` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
