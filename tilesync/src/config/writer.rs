//! `ConfigFile` → commented INI text.

use std::path::Path;

use super::file::ConfigFile;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let layer = config.provider.layer.as_deref().unwrap_or("");
    let expiry_days = optional(config.cache.expiry_days);
    let seed = optional(config.bulk.seed);

    format!(
        r#"[provider]
; Tile vendor: google, tianditu, tencent, baidu or xyz
type = {}
; Vendor layer (google: satellite, hybrid, roadmap, terrain; tianditu: img, vec, ter)
; For xyz, the URL template with {{z}}, {{x}}, {{y}} and optional {{s}} placeholders
layer = {}

[cache]
directory = {}
; Re-fetch tiles older than this many days (empty = never)
expiry_days = {}

[download]
; Request timeout in seconds
timeout = {}
; Concurrent requests
parallel = {}

[bulk]
max_tiles_per_region = {}
poll_interval_ms = {}
; Regions sampled to estimate the work before a run
progress_samples = {}
; Fixed sampling seed (empty = random)
seed = {}
; Restart a run after this many seconds without progress (0 = disabled)
watchdog_secs = {}
max_restarts = {}

[logging]
file = {}
"#,
        config.provider.provider_type,
        layer,
        path_to_string(&config.cache.directory),
        expiry_days,
        config.download.timeout,
        config.download.parallel,
        config.bulk.max_tiles_per_region,
        config.bulk.poll_interval_ms,
        config.bulk.progress_samples,
        seed,
        config.bulk.watchdog_secs,
        config.bulk.max_restarts,
        path_to_string(&config.logging.file),
    )
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
