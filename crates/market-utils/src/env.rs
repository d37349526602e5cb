//! Environment variable helpers for configuration loading

/// Read an environment variable, treating unset and blank values alike.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a comma-separated environment variable into its non-empty items.
pub fn env_list(name: &str) -> Option<Vec<String>> {
    env_var(name).map(|raw| split_list(&raw))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mask a secret for display, keeping only its first `visible` characters.
///
/// ```
/// assert_eq!(market_utils::mask_secret("abcdef123456", 5), "abcde...");
/// assert_eq!(market_utils::mask_secret("abc", 5), "***");
/// ```
pub fn mask_secret(secret: &str, visible: usize) -> String {
    if secret.chars().count() <= visible {
        return "*".repeat(secret.chars().count());
    }
    let prefix: String = secret.chars().take(visible).collect();
    format!("{prefix}...")
}
