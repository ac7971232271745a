//! Feature-order registry: the canonical index to feature-name mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::tokenizer::Entry;

/// Feature names in their canonical positions.
pub const DEFAULT_FEATURE_NAMES: [&str; 21] = [
    "success",
    "failure",
    "connect_time",
    "latency",
    "upload_mb",
    "download_mb",
    "duration_minutes",
    "last_used_seconds",
    "is_udp",
    "is_tcp",
    "asn_feature",
    "country_feature",
    "address_feature",
    "port_feature",
    "traffic_ratio",
    "traffic_density",
    "connection_type_feature",
    "asn_hash",
    "host_hash",
    "ip_hash",
    "geoip_hash",
];

/// Number of entries a complete order is expected to have.
pub const DEFAULT_FEATURE_COUNT: usize = DEFAULT_FEATURE_NAMES.len();

/// Index to name mapping. Sparse input is tolerated and back-filled from
/// [`DEFAULT_FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureOrder {
    names: BTreeMap<usize, String>,
}

impl Default for FeatureOrder {
    fn default() -> Self {
        let names = DEFAULT_FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx, (*name).to_string()))
            .collect();
        Self { names }
    }
}

impl FeatureOrder {
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Build from `[order]` entries.
    ///
    /// Lines whose key is not an integer in `[0, max_feature_size)` are dropped
    /// with a diagnostic. An empty result falls back to the full default; a
    /// partial one has its missing default indices filled in.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a Entry>,
        max_feature_size: usize,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut order = Self::empty();

        for entry in entries {
            let idx: i64 = match entry.key.parse() {
                Ok(idx) => idx,
                Err(_) => {
                    diags.push(format!(
                        "invalid feature index '{}' at line {}",
                        entry.key, entry.line
                    ));
                    continue;
                }
            };
            if idx < 0 || idx as u64 >= max_feature_size as u64 {
                diags.push(format!(
                    "feature index {idx} out of range [0, {max_feature_size}) at line {}",
                    entry.line
                ));
                continue;
            }
            order.names.insert(idx as usize, entry.value.clone());
        }

        if order.names.is_empty() {
            return Self::default();
        }
        if order.names.len() != DEFAULT_FEATURE_COUNT {
            order.backfill_defaults();
        }
        order
    }

    fn backfill_defaults(&mut self) {
        for (idx, name) in DEFAULT_FEATURE_NAMES.iter().enumerate() {
            self.names
                .entry(idx)
                .or_insert_with(|| (*name).to_string());
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.names.contains_key(&index)
    }

    /// Index of the first feature called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(idx, _)| *idx)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(|(idx, name)| (*idx, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Section, tokenize};

    fn order_entries(text: &str) -> Vec<Entry> {
        tokenize(text)
            .into_iter()
            .filter(|e| e.section == Section::Order)
            .collect()
    }

    #[test]
    fn test_default_order() {
        let order = FeatureOrder::default();
        assert_eq!(order.len(), 21);
        assert_eq!(order.get(0), Some("success"));
        assert_eq!(order.get(5), Some("download_mb"));
        assert_eq!(order.get(20), Some("geoip_hash"));
        assert_eq!(order.index_of("traffic_density"), Some(15));
    }

    #[test]
    fn test_empty_input_uses_default() {
        let mut diags = Diagnostics::new();
        let order = FeatureOrder::from_entries(&[], 21, &mut diags);
        assert_eq!(order, FeatureOrder::default());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_backfill_keeps_parsed_names() {
        let mut text = String::from("[order]\n");
        for idx in (0..21).filter(|i| *i != 5) {
            text.push_str(&format!("{idx}=custom_{idx}\n"));
        }
        let entries = order_entries(&text);
        let mut diags = Diagnostics::new();
        let order = FeatureOrder::from_entries(&entries, 21, &mut diags);

        assert_eq!(order.len(), 21);
        assert_eq!(order.get(5), Some("download_mb"));
        assert_eq!(order.get(4), Some("custom_4"));
        assert_eq!(order.get(6), Some("custom_6"));
    }

    #[test]
    fn test_complete_custom_order_is_not_touched() {
        let text: String = (0..21).map(|i| format!("{i}=f{i}\n")).collect();
        let entries = order_entries(&format!("[order]\n{text}"));
        let mut diags = Diagnostics::new();
        let order = FeatureOrder::from_entries(&entries, 21, &mut diags);
        assert!(order.iter().all(|(idx, name)| name == format!("f{idx}")));
    }

    #[test]
    fn test_bad_lines_are_dropped_with_diagnostics() {
        let entries = order_entries("[order]\nabc=oops\n-1=neg\n99=far\n2=connect_time\n");
        let mut diags = Diagnostics::new();
        let order = FeatureOrder::from_entries(&entries, 21, &mut diags);

        assert_eq!(diags.len(), 3);
        assert!(diags.contains("invalid feature index 'abc' at line 2"));
        assert!(diags.contains("feature index -1 out of range [0, 21)"));
        assert!(diags.contains("feature index 99 out of range"));
        assert_eq!(order.get(2), Some("connect_time"));
        assert_eq!(order.len(), 21);
    }
}
