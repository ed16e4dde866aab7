use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display names for the numeric activity codes of the recorded
/// training data.
pub const FRIENDLY_NAMES: [(&str, &str); 6] = [
    ("1", "walking"),
    ("2", "running"),
    ("3", "sitting"),
    ("4", "standing"),
    ("5", "upstairs"),
    ("6", "downstairs"),
];

/// Map a numeric activity code to its display name; other labels pass
/// through unchanged.
pub fn friendly_label(label: &str) -> &str {
    FRIENDLY_NAMES
        .iter()
        .find(|(code, _)| *code == label)
        .map(|(_, name)| *name)
        .unwrap_or(label)
}

/// Total seconds per predicted activity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivitySummary {
    seconds: BTreeMap<String, u64>,
}

impl ActivitySummary {
    pub fn get(&self, label: &str) -> Option<u64> {
        self.seconds.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    /// An empty summary means no windows were classified.
    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    pub fn total_seconds(&self) -> u64 {
        self.seconds.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.seconds.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.seconds
    }

    /// Relabel through [`friendly_label`]. Codes that collapse onto the same
    /// name are added together.
    pub fn with_friendly_names(&self) -> Self {
        let mut seconds = BTreeMap::new();
        for (label, secs) in &self.seconds {
            *seconds.entry(friendly_label(label).to_string()).or_insert(0) += secs;
        }
        Self { seconds }
    }
}

/// Count predicted windows per label and credit each with `window_duration`
/// seconds. No predictions give an empty summary, not an error.
pub fn summarize<S: AsRef<str>>(predictions: &[S], window_duration: u64) -> ActivitySummary {
    let mut seconds = BTreeMap::new();
    for label in predictions {
        *seconds.entry(label.as_ref().to_string()).or_insert(0) += window_duration;
    }
    ActivitySummary { seconds }
}
