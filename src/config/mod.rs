use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inventory_path: String,
    pub templates_dir: String,
    pub push_backend: String,
    pub dry_run: bool,
    pub ssh_timeout_secs: u64,
    pub doc_addresses: Vec<String>,
    pub users_per_address: u32,
    pub start_port: u32,
    pub doc_info_url: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            inventory_path: get_env("INVENTORY_PATH", "inventory/hosts.json"),
            templates_dir: get_env("TEMPLATES_DIR", ""),
            push_backend: get_env("PUSH_BACKEND", "ssh"),
            dry_run: parse_bool(&get_env("DRY_RUN", "false")).unwrap_or(false),
            ssh_timeout_secs: get_env("SSH_TIMEOUT_SECS", "30")
                .parse()
                .unwrap_or(30),
            doc_addresses: split_list(&get_env(
                "DOC_ADDRESSES",
                "1.1.1.1,1.1.1.2,1.1.1.3,1.1.1.4",
            )),
            users_per_address: get_env("USERS_PER_ADDRESS", "14")
                .parse()
                .unwrap_or(14),
            start_port: get_env("START_PORT", "12000")
                .parse()
                .unwrap_or(12000),
            doc_info_url: get_env(
                "DOC_INFO_URL",
                "https://github.com/chadell/nornir-playground",
            ),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, dropping empty entries
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("1.1.1.1, 1.1.1.2,,"),
            vec!["1.1.1.1".to_string(), "1.1.1.2".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
