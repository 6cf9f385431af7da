//! Serde default values for config fields.

pub(super) fn default_name() -> String {
    "twobot".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.twobot".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_prefix() -> String {
    "!".to_string()
}
pub(super) fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}
pub(super) fn default_max_retries() -> u32 {
    3
}
pub(super) fn default_timeout_secs() -> u64 {
    30
}
pub(super) fn default_max_count() -> usize {
    1000
}
pub(super) fn default_servers_path() -> String {
    "servers.json".to_string()
}
