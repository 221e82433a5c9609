//! INI → `ConfigFile`.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};

pub(super) const PROVIDERS: [&str; 5] = ["google", "tianditu", "tencent", "baidu", "xyz"];

/// Starts from defaults and overlays every value present in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = section.get("type") {
            let v = v.trim().to_lowercase();
            if !PROVIDERS.contains(&v.as_str()) {
                return Err(invalid(
                    "provider",
                    "type",
                    &v,
                    "must be one of: google, tianditu, tencent, baidu, xyz",
                ));
            }
            config.provider.provider_type = v;
        }
        if let Some(v) = non_empty(section.get("layer")) {
            config.provider.layer = Some(v.to_string());
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("expiry_days")) {
            config.cache.expiry_days = Some(parse_number("cache", "expiry_days", v)?);
        }
    }

    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = non_empty(section.get("timeout")) {
            config.download.timeout = parse_positive("download", "timeout", v)?;
        }
        if let Some(v) = non_empty(section.get("parallel")) {
            config.download.parallel = parse_positive("download", "parallel", v)?;
        }
    }

    if let Some(section) = ini.section(Some("bulk")) {
        if let Some(v) = non_empty(section.get("max_tiles_per_region")) {
            config.bulk.max_tiles_per_region = parse_positive("bulk", "max_tiles_per_region", v)?;
        }
        if let Some(v) = non_empty(section.get("poll_interval_ms")) {
            config.bulk.poll_interval_ms = parse_positive("bulk", "poll_interval_ms", v)?;
        }
        if let Some(v) = non_empty(section.get("progress_samples")) {
            config.bulk.progress_samples = parse_number("bulk", "progress_samples", v)?;
        }
        if let Some(v) = non_empty(section.get("seed")) {
            config.bulk.seed = Some(parse_number("bulk", "seed", v)?);
        }
        if let Some(v) = non_empty(section.get("watchdog_secs")) {
            config.bulk.watchdog_secs = parse_number("bulk", "watchdog_secs", v)?;
        }
        if let Some(v) = non_empty(section.get("max_restarts")) {
            config.bulk.max_restarts = parse_number("bulk", "max_restarts", v)?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialEq + Default,
{
    let parsed: T = parse_number(section, key, value)?;
    if parsed == T::default() {
        return Err(invalid(section, key, value, "must be greater than zero"));
    }
    Ok(parsed)
}

/// Expands a leading `~` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
