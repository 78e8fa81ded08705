use serde::{Deserialize, Serialize};

/// Mapper configuration
///
/// Connection settings belong to the session; this only covers how the mapper
/// itself behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Relation hops a read follows below the root before failing
    pub max_relation_depth: usize,

    /// Whether reads record a snapshot for later update diffs
    pub track_reads: bool,
}

impl MapperConfig {
    pub fn new() -> Self {
        Self {
            max_relation_depth: 32,
            track_reads: true,
        }
    }

    /// Set the relation depth limit
    pub fn max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    /// Enable or disable read snapshots
    pub fn track_reads(mut self, enabled: bool) -> Self {
        self.track_reads = enabled;
        self
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = MapperConfig::new().max_relation_depth(4).track_reads(false);
        assert_eq!(config.max_relation_depth, 4);
        assert!(!config.track_reads);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: MapperConfig = serde_json::from_str(r#"{"max_relation_depth": 8}"#).unwrap();
        assert_eq!(config.max_relation_depth, 8);
        assert!(config.track_reads);
    }
}
