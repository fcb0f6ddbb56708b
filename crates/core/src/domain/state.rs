// State engine domain model (§3 State row / State item, §4.2)

use super::error::DomainError;

/// A scalar (namespace, key) -> value row with an optional absolute expiry.
#[derive(Debug, Clone)]
pub struct StateEntry {
    pub namespace: String,
    pub key: String,
    pub value: Option<String>,
    pub expires_at: Option<i64>,
    pub updated_at: i64,
}

impl StateEntry {
    pub fn is_live(&self, now_millis: i64) -> bool {
        match self.expires_at {
            Some(exp) => now_millis < exp,
            None => true,
        }
    }
}

/// A member of a grouped collection under a parent state row.
#[derive(Debug, Clone)]
pub struct StateItem {
    pub namespace: String,
    pub key: String,
    pub item_key: String,
    pub value: Option<String>,
    pub updated_at: i64,
}

/// Parse a TTL token like `30m`, `2h`, `7d` into milliseconds (§4.2).
pub fn parse_ttl_millis(ttl: &str) -> Result<i64, DomainError> {
    let ttl = ttl.trim();
    if ttl.is_empty() {
        return Err(DomainError::ValidationError("empty ttl".to_string()));
    }
    let (digits, unit) = ttl.split_at(ttl.len() - 1);
    let amount: i64 = digits
        .parse()
        .map_err(|_| DomainError::ValidationError(format!("invalid ttl: {ttl}")))?;
    if amount <= 0 {
        return Err(DomainError::ValidationError(format!(
            "ttl must be positive: {ttl}"
        )));
    }
    let unit_ms = match unit {
        "d" => 24 * 60 * 60 * 1000,
        "h" => 60 * 60 * 1000,
        "m" => 60 * 1000,
        other => {
            return Err(DomainError::ValidationError(format!(
                "unknown ttl unit: {other}"
            )))
        }
    };
    Ok(amount * unit_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_ttl_tokens() {
        assert_eq!(parse_ttl_millis("30m").unwrap(), 30 * 60 * 1000);
        assert_eq!(parse_ttl_millis("2h").unwrap(), 2 * 60 * 60 * 1000);
        assert_eq!(parse_ttl_millis("7d").unwrap(), 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn rejects_malformed_ttl() {
        assert!(parse_ttl_millis("30").is_err());
        assert!(parse_ttl_millis("-5m").is_err());
        assert!(parse_ttl_millis("5w").is_err());
        assert!(parse_ttl_millis("").is_err());
    }

    #[test]
    fn state_entry_honors_expiry() {
        let live = StateEntry {
            namespace: "ns".into(),
            key: "k".into(),
            value: Some("v".into()),
            expires_at: Some(1_000),
            updated_at: 0,
        };
        assert!(live.is_live(500));
        assert!(!live.is_live(1_000));
    }
}
