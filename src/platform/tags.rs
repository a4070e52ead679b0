//! Default resource tags.

use std::collections::BTreeMap;

use crate::VERSION;

/// Tag key identifying the keelson release that rendered a resource.
pub const VERSION_TAG: &str = "keelson-version";

/// Tags attached to every tagged resource.
pub fn default_tags() -> BTreeMap<String, String> {
    BTreeMap::from([(VERSION_TAG.to_string(), VERSION.to_string())])
}

/// Overlay `explicit` on the default tags. Explicit tags win on collision.
pub fn merge_default_tags(explicit: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut tags = default_tags();
    tags.extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_added() {
        let explicit = BTreeMap::from([("team".to_string(), "infra".to_string())]);
        let tags = merge_default_tags(&explicit);

        assert_eq!(tags.get("team").map(String::as_str), Some("infra"));
        assert_eq!(tags.get(VERSION_TAG).map(String::as_str), Some(VERSION));
        assert_eq!(explicit.len(), 1);
    }

    #[test]
    fn test_explicit_tags_win() {
        let explicit = BTreeMap::from([(VERSION_TAG.to_string(), "pinned".to_string())]);

        assert_eq!(
            merge_default_tags(&explicit).get(VERSION_TAG).map(String::as_str),
            Some("pinned")
        );
    }
}
