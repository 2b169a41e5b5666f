//! Trader display tags

/// Maps wallet addresses to the tag shown in alerts
///
/// Always answers. A name-service URL can be configured, but no lookup is
/// wired up yet, so every address renders in shortened form.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    name_service_url: Option<String>,
}

impl IdentityResolver {
    pub fn new(name_service_url: Option<String>) -> Self {
        if let Some(url) = &name_service_url {
            tracing::info!(url = %url, "Name service configured; using short addresses until lookups are supported");
        }
        Self { name_service_url }
    }

    pub fn name_service_url(&self) -> Option<&str> {
        self.name_service_url.as_deref()
    }

    /// Display tag for `address`
    pub async fn resolve_tag(&self, address: Option<&str>) -> String {
        short_address(address)
    }
}

/// `0x1234...cdef` form of an address; short inputs pass through
pub fn short_address(address: Option<&str>) -> String {
    let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        return "Unknown".to_string();
    };

    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }

    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
