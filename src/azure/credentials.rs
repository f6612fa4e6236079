//! Access token resolution for Azure Resource Manager
//!
//! Uses `AZURE_ACCESS_TOKEN` when set, otherwise asks the Azure CLI for a token
//! issued to the management endpoint.

use super::error::{AzureApiError, Result};
use crate::common::command_utils::{execute_command, successful_stdout};
use log::debug;

pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Resolve a bearer token for `resource` (e.g. `https://management.azure.com/`)
pub fn resolve_access_token(resource: &str) -> Result<String> {
    if let Some(token) = token_from_env() {
        debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(token);
    }
    token_from_azure_cli(resource)
}

fn token_from_env() -> Option<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn token_from_azure_cli(resource: &str) -> Result<String> {
    debug!("Requesting access token for {} from the Azure CLI", resource);
    let output = execute_command(
        "az",
        &[
            "account",
            "get-access-token",
            "--resource",
            resource,
            "--query",
            "accessToken",
            "-o",
            "tsv",
        ],
    )
    .map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AzureApiError::Credentials(
            "Azure CLI (`az`) not found and AZURE_ACCESS_TOKEN is not set".to_string(),
        ),
        _ => AzureApiError::Credentials(e.to_string()),
    })?;

    if let Some(token) = successful_stdout(&output) {
        return Ok(token);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("az login") {
        return Err(AzureApiError::Unauthorized);
    }
    Err(AzureApiError::Credentials(format!(
        "az account get-access-token failed: {}",
        stderr.trim()
    )))
}

/// Token audience for a management endpoint (always ends with `/`)
pub fn resource_for_endpoint(endpoint: &str) -> String {
    format!("{}/", endpoint.trim_end_matches('/'))
}
