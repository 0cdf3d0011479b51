use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration for the title composition engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard ceiling on final title length (grapheme clusters).
    pub max_title_chars: usize,

    /// Soft floor; below it Zone C is extended with spare candidates.
    pub min_title_chars: usize,

    /// Zone budget shares; must sum to 100.
    pub zone_a_pct: u8,
    pub zone_b_pct: u8,
    pub zone_c_pct: u8,

    /// Cosine threshold for semantic grouping.
    pub similarity_threshold: f32,

    /// A challenger must score at least `champion * margin` to replace it.
    pub replacement_margin: f32,

    /// Cap on planned retrieval queries.
    pub max_queries: usize,

    /// Cap on externally suggested queries merged into the plan.
    pub suggested_query_quota: usize,

    /// Results fetched per query.
    pub k_per_query: usize,

    /// Cap on merged candidates entering curation.
    pub max_total_candidates: usize,

    /// Promotional / banned terms stripped from the output.
    pub banned_terms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_title_chars: 200,
            min_title_chars: 120,
            zone_a_pct: 45,
            zone_b_pct: 35,
            zone_c_pct: 20,
            similarity_threshold: 0.84,
            replacement_margin: 1.15,
            max_queries: 25,
            suggested_query_quota: 5,
            k_per_query: 10,
            max_total_candidates: 80,
            banned_terms: default_banned_terms(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration before a run.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_title_chars == 0 {
            return Err("max_title_chars must be > 0".to_string());
        }

        if self.min_title_chars > self.max_title_chars {
            return Err(format!(
                "min_title_chars ({}) cannot exceed max_title_chars ({})",
                self.min_title_chars, self.max_title_chars
            ));
        }

        let pct_sum =
            u16::from(self.zone_a_pct) + u16::from(self.zone_b_pct) + u16::from(self.zone_c_pct);
        if pct_sum != 100 {
            return Err(format!("zone percentages must sum to 100, got {pct_sum}"));
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            ));
        }

        if self.replacement_margin < 1.0 {
            return Err(format!(
                "replacement_margin must be >= 1.0, got {}",
                self.replacement_margin
            ));
        }

        if self.max_queries == 0 || self.k_per_query == 0 {
            return Err("max_queries and k_per_query must be > 0".to_string());
        }

        Ok(())
    }

    /// Per-zone character budgets derived from the global ceiling. Rounding
    /// remainder goes to Zone A so the primary zone never loses characters.
    #[must_use]
    pub fn zone_budgets(&self) -> (usize, usize, usize) {
        let b = self.max_title_chars * usize::from(self.zone_b_pct) / 100;
        let c = self.max_title_chars * usize::from(self.zone_c_pct) / 100;
        let a = self.max_title_chars - b - c;
        (a, b, c)
    }
}

fn default_banned_terms() -> Vec<String> {
    [
        "best",
        "cheap",
        "sale",
        "offer",
        "discount",
        "free shipping",
        "hot deal",
        "lowest price",
        "100% original",
        "no. 1",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zone_budgets_cover_the_ceiling() {
        let config = EngineConfig::default();
        let (a, b, c) = config.zone_budgets();
        assert_eq!(a + b + c, config.max_title_chars);
        assert!(a >= b && b >= c);
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let mut config = EngineConfig {
            zone_a_pct: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.zone_a_pct = 45;
        config.replacement_margin = 0.9;
        assert!(config.validate().is_err());

        config.replacement_margin = 1.15;
        config.similarity_threshold = 1.3;
        assert!(config.validate().is_err());

        config.similarity_threshold = 0.84;
        config.min_title_chars = 300;
        assert!(config.validate().is_err());

        config.min_title_chars = 120;
        assert!(config.validate().is_ok());
    }
}
