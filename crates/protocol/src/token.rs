use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Stable identity of a concept token within one engine run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct TokenId(pub u32);

/// Identity of a semantic exclusivity group within one engine run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct GroupId(pub u32);

/// Semantic category of a concept token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Brand,
    Product,
    Size,
    Color,
    Count,
    Dimension,
    Capacity,
    Fragrance,
    Material,
    Feature,
    UseCase,
    QualityMarker,
    Other,
}

impl TokenType {
    /// Types that may carry an authoritative truth attribute.
    #[must_use]
    pub const fn is_truth_bearing(self) -> bool {
        matches!(
            self,
            Self::Brand
                | Self::Product
                | Self::Size
                | Self::Color
                | Self::Count
                | Self::Dimension
                | Self::Capacity
                | Self::Fragrance
                | Self::Material
        )
    }

    /// Truth-critical types never cluster with retrieved candidates and are
    /// always represented by the normalizer's token.
    #[must_use]
    pub const fn is_truth_critical(self) -> bool {
        matches!(self, Self::Size | Self::Color | Self::Count | Self::Dimension)
    }

    /// Canonical seeding order for Zone A: brand, product, size, dimension,
    /// count, color, then everything else.
    #[must_use]
    pub const fn seed_rank(self) -> u8 {
        match self {
            Self::Brand => 0,
            Self::Product => 1,
            Self::Size => 2,
            Self::Dimension => 3,
            Self::Count => 4,
            Self::Color => 5,
            Self::Capacity => 6,
            Self::Fragrance => 7,
            Self::Material => 8,
            Self::Feature => 9,
            Self::UseCase => 10,
            Self::QualityMarker => 11,
            Self::Other => 12,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Product => "product",
            Self::Size => "size",
            Self::Color => "color",
            Self::Count => "count",
            Self::Dimension => "dimension",
            Self::Capacity => "capacity",
            Self::Fragrance => "fragrance",
            Self::Material => "material",
            Self::Feature => "feature",
            Self::UseCase => "use_case",
            Self::QualityMarker => "quality_marker",
            Self::Other => "other",
        }
    }
}

/// Where a token entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrigin {
    BaseTitle,
    Truth,
    RetrievedKeyword,
}

/// Ordered output region of the composed title.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ZoneId {
    A,
    B,
    C,
}

impl ZoneId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

/// A typed, scored unit of title content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConceptToken {
    pub id: TokenId,

    /// Text exactly as it will appear in the output.
    pub surface_text: String,

    /// Normalized value used for comparisons (lowercased, trimmed).
    pub canonical_value: String,

    pub token_type: TokenType,

    /// Eviction tier: 0 is never evictable, 3 goes first.
    pub tier: u8,

    /// Locked tokens must survive byte-identical in the output.
    pub locked: bool,

    pub value_score: f32,

    /// Output cost in grapheme clusters.
    pub cost_chars: usize,

    pub origin: TokenOrigin,

    pub semantic_group: Option<GroupId>,

    pub zone: Option<ZoneId>,

    /// Set when extraction could not classify the span.
    #[serde(default)]
    pub unparsed: bool,
}

impl ConceptToken {
    pub fn new(
        id: TokenId,
        surface_text: impl Into<String>,
        token_type: TokenType,
        origin: TokenOrigin,
    ) -> Self {
        let surface_text = surface_text.into();
        let canonical_value = canonicalize(&surface_text);
        let cost_chars = grapheme_len(&surface_text);
        Self {
            id,
            surface_text,
            canonical_value,
            token_type,
            tier: 2,
            locked: false,
            value_score: 0.0,
            cost_chars,
            origin,
            semantic_group: None,
            zone: None,
            unparsed: false,
        }
    }

    /// Builder: set eviction tier.
    #[must_use]
    pub const fn tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    /// Builder: mark as locked.
    #[must_use]
    pub const fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Builder: set value score.
    #[must_use]
    pub const fn value_score(mut self, score: f32) -> Self {
        self.value_score = score;
        self
    }

    /// Builder: mark as unparsed.
    #[must_use]
    pub const fn unparsed(mut self, unparsed: bool) -> Self {
        self.unparsed = unparsed;
        self
    }

    /// Replace the surface form, keeping tier and lock status.
    ///
    /// Canonical value and character cost follow the new surface.
    pub fn replace_surface(&mut self, surface_text: impl Into<String>, value_score: f32) {
        self.surface_text = surface_text.into();
        self.canonical_value = canonicalize(&self.surface_text);
        self.cost_chars = grapheme_len(&self.surface_text);
        self.value_score = value_score;
    }

    /// Value per output character, the knapsack ordering key.
    #[must_use]
    pub fn value_density(&self) -> f32 {
        self.value_score / self.cost_chars.max(1) as f32
    }

    /// Tier-0 locked tokens must never be evicted.
    #[must_use]
    pub const fn is_evictable(&self) -> bool {
        !(self.locked || self.tier == 0)
    }
}

/// Lowercased, whitespace-collapsed comparison form.
#[must_use]
pub(crate) fn canonicalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[must_use]
pub(crate) fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}
