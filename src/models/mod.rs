use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod criteria;

pub use criteria::{GoalWeight, PriceSensitivity, PriceTier, UserCriteria, UserPatterns};

/// A product as seen by the shopper
///
/// Owned by the presentation layer / preference store and passed into the
/// pipeline by value; the pipeline never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    /// Display price as rendered on the product page (e.g. "$89.99")
    pub price_display: String,
    /// Numeric price, always >= 0
    pub price: f64,
    pub category: String,
    /// Star rating in 0..=5, when the page carries one
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Product {
    /// Checks the structural invariants (price >= 0, rating in 0..=5).
    ///
    /// Products arrive from outside the pipeline, so the API surface
    /// validates them once on entry.
    pub fn validate(&self) -> Result<(), String> {
        if self.price < 0.0 || !self.price.is_finite() {
            return Err(format!("product {} has invalid price {}", self.id, self.price));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(format!(
                    "product {} has rating {} outside 0..=5",
                    self.id, rating
                ));
            }
        }
        Ok(())
    }
}

/// A candidate product returned by the alternative-search collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateProduct {
    #[serde(flatten)]
    pub product: Product,
    /// Free-text annotation from the search collaborator
    #[serde(default)]
    pub why: Option<String>,
}

/// Buy / consider / skip verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Consider,
    Skip,
}

impl Recommendation {
    /// Monotonic bucketing of a match score.
    ///
    /// This mapping holds for both AI-derived and rule-derived analyses:
    /// the AI's own verdict string is never trusted, the bucket is always
    /// recomputed from the validated score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Recommendation::Buy
        } else if score >= 0.4 {
            Recommendation::Consider
        } else {
            Recommendation::Skip
        }
    }
}

/// One scoring factor with its rationale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factor {
    pub score: f64,
    pub reason: String,
}

/// Per-factor breakdown of a match score
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FactorBreakdown {
    #[serde(default)]
    pub price: Option<Factor>,
    #[serde(default)]
    pub quality: Option<Factor>,
    #[serde(default)]
    pub goals: Option<Factor>,
    #[serde(default)]
    pub category: Option<Factor>,
}

/// How well the product under consideration matches the shopper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchScoreAnalysis {
    /// Match score in 0..=1
    pub score: f64,
    pub recommendation: Recommendation,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub factors: Option<FactorBreakdown>,
}

/// A ranked alternative to the product under consideration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationAnalysis {
    pub product: Product,
    /// Ranking score in 0..=1
    pub score: f64,
    pub reasons: Vec<String>,
    /// target price - candidate price, present only when positive
    #[serde(default)]
    pub savings: Option<f64>,
}

/// Which path produced the final recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Ai,
    Heuristic,
}

/// The combined analysis handed to the presentation layer
///
/// Core contract of the pipeline: this is never null and never omits the
/// recommendation field. Absent insights are a normal, displayable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAnalysis {
    pub recommendation: MatchScoreAnalysis,
    pub source: AnalysisSource,
    pub alternatives: Vec<RecommendationAnalysis>,
    #[serde(default)]
    pub insights: Option<Vec<String>>,
}

/// Telemetry record for one analysis / purchase decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionEvent {
    pub product_id: String,
    pub recommendation: Recommendation,
    pub score: f64,
    pub source: AnalysisSource,
    /// Alternative the user later selected, if any
    #[serde(default)]
    pub chosen_alternative: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price: f64, category: &str, rating: Option<f64>) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            price_display: format!("${:.2}", price),
            price,
            category: category.to_string(),
            rating,
            features: None,
            url: None,
        }
    }

    #[test]
    fn test_recommendation_buckets() {
        assert_eq!(Recommendation::from_score(1.0), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(0.7), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(0.69), Recommendation::Consider);
        assert_eq!(Recommendation::from_score(0.4), Recommendation::Consider);
        assert_eq!(Recommendation::from_score(0.39), Recommendation::Skip);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::Skip);
    }

    #[test]
    fn test_recommendation_serde_lowercase() {
        let json = serde_json::to_string(&Recommendation::Buy).unwrap();
        assert_eq!(json, r#""buy""#);

        let parsed: Recommendation = serde_json::from_str(r#""skip""#).unwrap();
        assert_eq!(parsed, Recommendation::Skip);
    }

    #[test]
    fn test_product_validate_ok() {
        let product = test_product("p1", 19.99, "Kitchen", Some(4.2));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_product_validate_negative_price() {
        let product = test_product("p1", -1.0, "Kitchen", None);
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_product_validate_rating_out_of_range() {
        let product = test_product("p1", 10.0, "Kitchen", Some(5.5));
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_candidate_product_flattens_product_fields() {
        let json = r#"{
            "id": "alt-1",
            "title": "Cheaper Kettle",
            "price_display": "$24.99",
            "price": 24.99,
            "category": "Kitchen",
            "why": "same wattage, lower price"
        }"#;

        let candidate: CandidateProduct = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.product.id, "alt-1");
        assert_eq!(candidate.why.as_deref(), Some("same wattage, lower price"));
    }

    #[test]
    fn test_product_analysis_always_carries_recommendation() {
        let analysis = ProductAnalysis {
            recommendation: MatchScoreAnalysis {
                score: 0.5,
                recommendation: Recommendation::Consider,
                reasons: vec![],
                confidence: None,
                factors: None,
            },
            source: AnalysisSource::Heuristic,
            alternatives: vec![],
            insights: None,
        };

        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("recommendation").is_some());
        assert_eq!(json["source"], "heuristic");
    }
}
