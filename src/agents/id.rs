//! Opaque, URL-safe, time-ordered agent ids.

use ulid::Ulid;

/// Generate a new agent id. ULIDs are lexically sortable by creation time
/// and URL-safe without encoding, matching the teacher's use of `ulid` for
/// session/message identifiers.
pub fn generate_agent_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_agent_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ids_are_url_safe() {
        let id = generate_agent_id();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
