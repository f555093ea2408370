//! Consul address normalisation.
//!
//! HTTP calls need a scheme; `consul-template -consul` wants a bare
//! `host:port`. Scheme comparison is ASCII case-insensitive.

const SCHEMES: [&str; 2] = ["http://", "https://"];

fn scheme_len(address: &str) -> Option<usize> {
    SCHEMES.iter().find_map(|scheme| {
        address
            .get(..scheme.len())
            .filter(|head| head.eq_ignore_ascii_case(scheme))
            .map(|_| scheme.len())
    })
}

/// Prefix `http://` unless the address already carries a scheme.
pub fn with_scheme(address: &str) -> String {
    if scheme_len(address).is_some() {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Remove a leading `http://` or `https://` in any letter case.
pub fn strip_scheme(address: &str) -> String {
    match scheme_len(address) {
        Some(len) => address[len..].to_string(),
        None => address.to_string(),
    }
}
