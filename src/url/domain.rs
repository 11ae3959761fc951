use url::Url;

/// Extracts the host from a URL, without port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the politeness key of a URL: host plus effective port
///
/// Two servers on the same machine but different ports are different hosts
/// for rate limiting purposes.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest::url::extract_host;
///
/// let url = Url::parse("http://127.0.0.1:9000/a").unwrap();
/// assert_eq!(extract_host(&url), Some("127.0.0.1:9000".to_string()));
///
/// let url = Url::parse("https://example.com/a").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com:443".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port_or_known_default() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Checks whether a domain equals an allowed domain or is one of its subdomains
pub fn domain_allowed(domain: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    allowed.iter().any(|entry| {
        let entry = entry.to_lowercase();
        domain == entry || domain.ends_with(&format!(".{}", entry))
    })
}
