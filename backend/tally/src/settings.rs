use std::{env, fmt::Display, fs::read_to_string, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

pub const SECRETS_DIR: &str = "/run/secrets";

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parses `key` from the environment, falling back to `default` when unset.
pub fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

pub fn load_required(key: &str) -> Result<String> {
    var(key).with_context(|| format!("Environment variable {key} is required"))
}

/// Secrets come from the environment first, then from the docker secret file.
pub fn read_optional_secret(secret_name: &str) -> Result<Option<String>> {
    if let Some(value) = var(secret_name) {
        return Ok(Some(value.trim().to_string()));
    }

    let path = Path::new(SECRETS_DIR).join(secret_name);
    if !path.exists() {
        return Ok(None);
    }

    let secret = read_to_string(&path)
        .with_context(|| format!("Failed to read {secret_name} from {}", path.display()))?;
    let secret = secret.trim();

    if secret.is_empty() {
        warn!("Secret file for {secret_name} is empty");
        return Ok(None);
    }

    Ok(Some(secret.to_string()))
}

pub fn read_secret(secret_name: &str) -> Result<String> {
    read_optional_secret(secret_name)?
        .with_context(|| format!("Secret {secret_name} is missing from env and {SECRETS_DIR}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let port: u16 = try_load("TALLY_TEST_UNSET_PORT", "3000").unwrap();

        assert_eq!(port, 3000);
    }

    #[test]
    fn rejects_unparsable_default() {
        let result: Result<u16> = try_load("TALLY_TEST_UNSET_PORT_2", "not-a-port");

        assert!(result.is_err());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(read_secret("TALLY_TEST_MISSING_SECRET").is_err());
        assert!(
            read_optional_secret("TALLY_TEST_MISSING_SECRET")
                .unwrap()
                .is_none()
        );
    }
}
