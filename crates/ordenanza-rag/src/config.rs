use crate::query::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub computation: ComputationConfig,
    pub vocabulary: Vocabulary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub k1: f64,
    pub b: f64,
    /// How many times title terms are repeated in the indexed stream.
    pub title_weight: usize,
    pub expand_synonyms: bool,
    pub default_limit: usize,
    pub filtered_limit: usize,
    pub listing_limit: usize,
    pub unfiltered_listing_limit: usize,
    pub excerpt_chars: usize,
    pub metadata_excerpt_chars: usize,
    pub full_excerpt_chars: usize,
    pub provision_excerpt_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub table_cache_size: usize,
    /// Most recent documents per jurisdiction whose tables feed a computation.
    pub max_docs_per_jurisdiction: usize,
    pub load_concurrency: usize,
}

/// Values outside `[min, max]` are treated as codes, not amounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plausibility {
    pub min: f64,
    pub max: f64,
}

impl Plausibility {
    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

impl Default for Plausibility {
    fn default() -> Self {
        Self {
            min: 10.0,
            max: 1_000_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputationConfig {
    pub plausibility: Plausibility,
    /// Rows rendered in markdown answers before truncating.
    pub max_rows_shown: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            title_weight: 3,
            expand_synonyms: true,
            default_limit: 5,
            filtered_limit: 10,
            listing_limit: 100,
            unfiltered_listing_limit: 10,
            excerpt_chars: 500,
            metadata_excerpt_chars: 200,
            full_excerpt_chars: 2000,
            provision_excerpt_chars: 5000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            table_cache_size: 256,
            max_docs_per_jurisdiction: 3,
            load_concurrency: 8,
        }
    }
}

impl Default for ComputationConfig {
    fn default() -> Self {
        Self {
            plausibility: Plausibility::default(),
            max_rows_shown: 20,
        }
    }
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.search.k1.is_nan() || self.search.k1 <= 0.0 {
            return Err("search.k1 must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.search.b) {
            return Err("search.b must be in [0.0, 1.0]".into());
        }
        if self.search.title_weight == 0 {
            return Err("search.title_weight must be > 0".into());
        }
        if self.search.default_limit == 0 || self.search.listing_limit == 0 {
            return Err("search limits must be > 0".into());
        }
        if self.cache.table_cache_size == 0 {
            return Err("cache.table_cache_size must be > 0".into());
        }
        if self.cache.load_concurrency == 0 {
            return Err("cache.load_concurrency must be > 0".into());
        }
        if self.cache.max_docs_per_jurisdiction == 0 {
            return Err("cache.max_docs_per_jurisdiction must be > 0".into());
        }
        let p = self.computation.plausibility;
        if !(p.min.is_finite() && p.max.is_finite()) || p.min >= p.max {
            return Err("computation.plausibility must satisfy min < max".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
