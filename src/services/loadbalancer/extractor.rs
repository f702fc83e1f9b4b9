use reqwest::Url;

use super::error::LoadBalancerError;

// 从 URL 中解析逻辑服务名，例如 "http://simple/path" -> "simple"
pub fn extract_service_name(url: &str) -> Result<(Url, String), LoadBalancerError> {
    let parsed =
        Url::parse(url).map_err(|e| LoadBalancerError::InvalidUrl(format!("{url}: {e}")))?;

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(LoadBalancerError::InvalidHostname(url.to_string())),
    };

    // 服务名只允许字母、数字、'-' 和 '.'
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LoadBalancerError::InvalidHostname(url.to_string()));
    }

    Ok((parsed, host))
}
