use serde::{Deserialize, Serialize};

use super::Product;

/// Ordered budget postures, from most to least price-sensitive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Budget,
    Moderate,
    Premium,
    Luxury,
}

/// How the shopper reacts to price differences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSensitivity {
    pub tier: PriceTier,
    /// Hard ceiling the shopper set during onboarding, if any
    #[serde(default)]
    pub max_price: Option<f64>,
    pub willing_to_pay_more: bool,
}

/// A shopping goal with its user-assigned priority weight (>= 0)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalWeight {
    pub id: String,
    pub weight: f64,
}

/// The shopper's preference profile, read from the preference store
///
/// Created at onboarding completion and mutated only by preference edits;
/// the pipeline treats it as read-only input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserCriteria {
    pub goals: Vec<GoalWeight>,
    pub price_sensitivity: PriceSensitivity,
    #[serde(default)]
    pub liked_products: Vec<Product>,
    #[serde(default)]
    pub disliked_products: Vec<Product>,
}

impl UserCriteria {
    /// Looks up the weight for a goal id, if the goal is selected.
    pub fn goal_weight(&self, id: &str) -> Option<f64> {
        self.goals.iter().find(|g| g.id == id).map(|g| g.weight)
    }

    /// Checks the structural invariants (goal weights >= 0 and finite).
    ///
    /// Criteria arrive from outside the pipeline, so the API surface
    /// validates them once on entry.
    pub fn validate(&self) -> Result<(), String> {
        for goal in &self.goals {
            if goal.weight < 0.0 || !goal.weight.is_finite() {
                return Err(format!(
                    "goal {} has invalid weight {}",
                    goal.id, goal.weight
                ));
            }
        }
        Ok(())
    }
}

/// Aggregate statistics derived from the like/dislike history
///
/// Recomputed on demand from `UserCriteria`; never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPatterns {
    pub avg_liked_price: f64,
    pub avg_disliked_price: f64,
    /// Up to 3 categories, most-liked first
    pub preferred_categories: Vec<String>,
    /// Up to 3 categories, most-disliked first
    pub avoided_categories: Vec<String>,
    /// Mean rating over liked items that carry a rating; 0 when none do
    pub quality_threshold: f64,
}
