use crate::error::Error;

/// Normalize the ingestion endpoint base URL.
///
/// Endpoints without a scheme are assumed to be HTTPS. Returns an error for:
///   - Empty endpoints
///   - Schemes other than `http` and `https`
///   - URLs without a host
///
/// A trailing `/` is removed so the API path can be appended directly.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, Error> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(Error::InvalidEndpoint("endpoint is required".to_string()));
    }

    let normalized = match endpoint.split_once("://") {
        Some((scheme, rest)) => {
            let scheme = scheme.to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(Error::InvalidEndpoint(format!(
                    "unsupported scheme '{scheme}': {endpoint}"
                )));
            }
            format!("{scheme}://{rest}")
        }
        None => format!("https://{endpoint}"),
    };

    if host(&normalized).is_empty() {
        return Err(Error::InvalidEndpoint(format!("missing host: {endpoint}")));
    }

    Ok(normalized.trim_end_matches('/').to_string())
}

/// Join a normalized endpoint base and an API path into the delivery URL.
pub fn delivery_url(base: &str, api_path: &str) -> String {
    let api_path = api_path.trim();
    if api_path.is_empty() {
        base.to_string()
    } else if api_path.starts_with('/') {
        format!("{base}{api_path}")
    } else {
        format!("{base}/{api_path}")
    }
}

fn host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);

    // Strip credentials
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    if let Some(v6) = host_port.strip_prefix('[') {
        // IPv6: [::1]:8080
        v6.split(']').next().unwrap_or(v6)
    } else {
        host_port.split(':').next().unwrap_or(host_port)
    }
}
