use regex::Regex;

use crate::error::PatternError;

/// Default page fetched for the external address.
pub const DEFAULT_URL: &str = "http://checkip.dyndns.org";

/// Name of the capture group that narrows the reply to part of the match.
pub const ADDRESS_GROUP: &str = "ip";

/// Matches the dotted quad printed after the `Current IP Address:` label,
/// with the address alone in the `ip` group.
pub const DEFAULT_PATTERN: &str = r"Current IP Address: \b(?P<ip>(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?))\b";

/// Find the first match of `pattern` in `text`.
///
/// The pattern is compiled on every call since it can change between
/// requests. The whole leftmost match is returned, unless the pattern has a
/// group named `ip` that took part in the match, in which case only that
/// group's text is returned. Unnamed groups never narrow the result.
pub fn extract(pattern: &str, text: &str) -> Result<Option<String>, PatternError> {
    let re = Regex::new(pattern).map_err(|e| PatternError {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    tracing::debug!(pattern, len = text.len(), "searching for a match");

    let Some(caps) = re.captures(text) else {
        return Ok(None);
    };
    let found = caps
        .name(ADDRESS_GROUP)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string());

    if let Some(ref m) = found {
        tracing::debug!(found = %m, "found match");
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_extracts_bare_address() {
        let body = "<html><body>Current IP Address: 203.0.113.7</body></html>";
        assert_eq!(
            extract(DEFAULT_PATTERN, body).unwrap(),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn default_pattern_rejects_out_of_range_octets() {
        let body = "Current IP Address: 999.1.1.1";
        assert_eq!(extract(DEFAULT_PATTERN, body).unwrap(), None);
    }

    #[test]
    fn default_pattern_requires_label() {
        assert_eq!(extract(DEFAULT_PATTERN, "203.0.113.7").unwrap(), None);
    }

    #[test]
    fn pattern_without_groups_returns_whole_match() {
        let found = extract(r"\d+\.\d+", "v 1.2 and 3.4").unwrap();
        assert_eq!(found, Some("1.2".to_string()));
    }

    #[test]
    fn leftmost_match_wins() {
        let found = extract(r"ip=(?P<ip>\S+)", "ip=10.0.0.1 ip=10.0.0.2").unwrap();
        assert_eq!(found, Some("10.0.0.1".to_string()));
    }

    #[test]
    fn repeated_group_returns_whole_address() {
        let found = extract(r"(\d{1,3}\.){3}\d{1,3}", "Current IP Address: 203.0.113.7").unwrap();
        assert_eq!(found, Some("203.0.113.7".to_string()));
    }

    #[test]
    fn alternation_group_returns_whole_match() {
        assert_eq!(extract(r"(a|b)c", "xbc").unwrap(), Some("bc".to_string()));
    }

    #[test]
    fn other_named_groups_do_not_narrow() {
        let found = extract(r"addr=(?P<addr>\S+)", "addr=10.0.0.1").unwrap();
        assert_eq!(found, Some("addr=10.0.0.1".to_string()));
    }

    #[test]
    fn ip_group_that_did_not_participate_falls_back_to_whole_match() {
        let found = extract(r"host|(?P<ip>\d+\.\d+)", "host 1.2").unwrap();
        assert_eq!(found, Some("host".to_string()));
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(extract(r"\d", "no digits here").unwrap(), None);
    }

    #[test]
    fn invalid_pattern_is_error() {
        let err = extract("(unclosed", "anything").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
    }
}
