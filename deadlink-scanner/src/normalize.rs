use url::Url;

/// Schemes that never point at a crawlable page.
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "ftp:"];

/// Resolve `href` against `base` into an absolute, fragment-free http(s) URL.
///
/// Returns `None` for empty hrefs, fragment-only references and anything that
/// does not end up as an `http`/`https` URL.
pub fn resolve(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if NON_NAVIGABLE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved.to_string())
}

/// True when `url` and `base` share a host. Scheme and port are ignored; any
/// parse failure counts as a different domain.
pub fn is_same_domain(url: &str, base: &Url) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    match (parsed.host_str(), base.host_str()) {
        (Some(host), Some(base_host)) => host.eq_ignore_ascii_case(base_host),
        _ => false,
    }
}

/// Parse a seed into an absolute http(s) URL with a host.
pub fn parse_seed(seed: &str) -> Result<Url, String> {
    let url = Url::parse(seed.trim()).map_err(|e| format!("{}: {}", seed, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{}: unsupported scheme '{}'", seed, url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("{}: missing host", seed));
    }

    Ok(url)
}
