use crate::models::{
    CandidateProduct, Factor, FactorBreakdown, MatchScoreAnalysis, PriceTier, Product,
    Recommendation, RecommendationAnalysis, UserCriteria, UserPatterns,
};

/// Price ratio (vs. average liked price) still considered "in line"
const PRICE_RATIO_CEILING: f64 = 1.2;
/// Minimum similarity for a candidate to enter alternative ranking
const SIMILARITY_FLOOR: f64 = 0.3;
/// Minimum ranking score for a candidate to be kept
const RANK_FLOOR: f64 = 0.5;
/// Ranked alternatives returned at most
const MAX_ALTERNATIVES: usize = 5;

/// Title markers that satisfy the eco-friendly goal
const ECO_MARKERS: [&str; 4] = ["eco", "organic", "sustainable", "recycled"];

fn has_eco_marker(title: &str) -> bool {
    let title = title.to_lowercase();
    ECO_MARKERS.iter().any(|marker| title.contains(marker))
}

/// Rule-based buy/consider/skip scoring
///
/// The always-available safety net behind the AI path: additive adjustments
/// from a neutral 0.5, clamped to 0..=1 and bucketed with the same mapping
/// the AI path uses. Pure and deterministic.
pub fn score_product(
    product: &Product,
    criteria: &UserCriteria,
    patterns: &UserPatterns,
) -> MatchScoreAnalysis {
    let mut score: f64 = 0.5;
    let mut reasons = Vec::new();
    let mut factors = FactorBreakdown::default();

    // Price vs. average liked price (only meaningful with history)
    if patterns.avg_liked_price > 0.0 {
        let ratio = product.price / patterns.avg_liked_price;
        let (adjustment, reason) = if ratio <= PRICE_RATIO_CEILING {
            (0.2, "Price is in line with items you've liked".to_string())
        } else {
            (
                -0.2,
                format!(
                    "Price is {:.0}% above your typical liked price",
                    (ratio - 1.0) * 100.0
                ),
            )
        };
        score += adjustment;
        reasons.push(reason.clone());
        factors.price = Some(Factor {
            score: adjustment,
            reason,
        });
    }

    // Rating vs. learned quality threshold
    if let (Some(rating), true) = (product.rating, patterns.quality_threshold > 0.0) {
        let (adjustment, reason) = if rating >= patterns.quality_threshold {
            (
                0.15,
                format!("Rated {:.1}, above your usual quality bar", rating),
            )
        } else {
            (
                -0.15,
                format!("Rated {:.1}, below your usual quality bar", rating),
            )
        };
        score += adjustment;
        reasons.push(reason.clone());
        factors.quality = Some(Factor {
            score: adjustment,
            reason,
        });
    }

    // Category preference
    if patterns.preferred_categories.contains(&product.category) {
        score += 0.15;
        let reason = format!("{} is a category you like", product.category);
        reasons.push(reason.clone());
        factors.category = Some(Factor {
            score: 0.15,
            reason,
        });
    } else if patterns.avoided_categories.contains(&product.category) {
        score -= 0.2;
        let reason = format!("{} is a category you usually avoid", product.category);
        reasons.push(reason.clone());
        factors.category = Some(Factor {
            score: -0.2,
            reason,
        });
    }

    // Goal-specific rules, +-0.1 each
    let mut goal_adjustment = 0.0;
    let mut goal_reasons = Vec::new();
    for goal in &criteria.goals {
        match goal.id.as_str() {
            "save-money" => {
                if product.price > 100.0 {
                    goal_adjustment -= 0.1;
                    goal_reasons.push("Over $100 works against your save-money goal".to_string());
                }
            }
            "quality-first" => {
                if product.rating.is_some_and(|r| r >= 4.5) {
                    goal_adjustment += 0.1;
                    goal_reasons.push("Top-rated, matching your quality-first goal".to_string());
                }
            }
            "eco-friendly" => {
                if has_eco_marker(&product.title) {
                    goal_adjustment += 0.1;
                    goal_reasons.push("Looks eco-friendly, matching your goal".to_string());
                }
            }
            _ => {}
        }
    }
    if !goal_reasons.is_empty() {
        score += goal_adjustment;
        let reason = goal_reasons.join("; ");
        reasons.extend(goal_reasons);
        factors.goals = Some(Factor {
            score: goal_adjustment,
            reason,
        });
    }

    let score = score.clamp(0.0, 1.0);

    if reasons.is_empty() {
        reasons.push("Not enough history to judge this product strongly".to_string());
    }

    MatchScoreAnalysis {
        score,
        recommendation: Recommendation::from_score(score),
        reasons,
        confidence: None,
        factors: Some(factors),
    }
}

/// Similarity of a candidate to the target product, in 0..=1.
///
/// 0.6 x same-category + 0.3 x (1 - normalized price gap)
/// + 0.1 x (1 - normalized rating gap).
fn similarity(target: &Product, candidate: &Product) -> f64 {
    let category = if target.category == candidate.category {
        1.0
    } else {
        0.0
    };

    let max_price = target.price.max(candidate.price);
    let price_gap = if max_price > 0.0 {
        (target.price - candidate.price).abs() / max_price
    } else {
        0.0
    };

    // Unrated on either side is treated as a middling gap
    let rating_gap = match (target.rating, candidate.rating) {
        (Some(t), Some(c)) => (t - c).abs() / 5.0,
        _ => 0.5,
    };

    0.6 * category + 0.3 * (1.0 - price_gap) + 0.1 * (1.0 - rating_gap)
}

/// Price component of the ranking score.
///
/// Savings are rewarded more aggressively for budget-tier shoppers and less
/// for premium/luxury tiers. A more expensive candidate only earns 0.6 when
/// the shopper is willing to pay more AND it is rated 4.5+.
fn price_score(target: &Product, candidate: &Product, criteria: &UserCriteria) -> f64 {
    if candidate.price <= target.price {
        if target.price <= 0.0 {
            return 0.0;
        }
        let savings_fraction = (target.price - candidate.price) / target.price;
        let multiplier = match criteria.price_sensitivity.tier {
            PriceTier::Budget => 2.0,
            PriceTier::Moderate => 1.0,
            PriceTier::Premium | PriceTier::Luxury => 0.5,
        };
        (savings_fraction * multiplier).min(1.0)
    } else if criteria.price_sensitivity.willing_to_pay_more
        && candidate.rating.is_some_and(|r| r >= 4.5)
    {
        0.6
    } else {
        0.3
    }
}

fn quality_score(candidate: &Product) -> f64 {
    candidate.rating.map_or(0.5, |r| r / 5.0)
}

/// Per-goal contributions weighted by goal weight, normalized by the count
/// of recognized goals. No recognized goals scores a neutral 0.5.
fn goal_alignment_score(candidate: &Product, criteria: &UserCriteria) -> f64 {
    let mut total = 0.0;
    let mut recognized = 0usize;

    for goal in &criteria.goals {
        let contribution = match goal.id.as_str() {
            "save-money" => {
                if candidate.price < 50.0 {
                    1.0
                } else {
                    0.0
                }
            }
            "quality-first" => quality_score(candidate),
            "eco-friendly" => {
                if has_eco_marker(&candidate.title) {
                    1.0
                } else {
                    0.0
                }
            }
            _ => continue,
        };
        total += contribution * goal.weight;
        recognized += 1;
    }

    if recognized == 0 {
        0.5
    } else {
        // Weights are unbounded above; keep the component in range
        (total / recognized as f64).clamp(0.0, 1.0)
    }
}

/// Rule-based alternative ranking
///
/// Filters candidates by similarity to the target, scores the survivors on
/// price, quality and goal alignment, keeps the ones scoring above 0.5 and
/// returns the top 5 in descending order. Idempotent for a fixed input.
pub fn rank_alternatives(
    target: &Product,
    candidates: &[CandidateProduct],
    criteria: &UserCriteria,
    _patterns: &UserPatterns,
) -> Vec<RecommendationAnalysis> {
    let mut ranked: Vec<RecommendationAnalysis> = candidates
        .iter()
        .filter(|candidate| similarity(target, &candidate.product) >= SIMILARITY_FLOOR)
        .filter_map(|candidate| {
            let product = &candidate.product;
            let score = (0.4 * price_score(target, product, criteria)
                + 0.3 * quality_score(product)
                + 0.3 * goal_alignment_score(product, criteria))
            .clamp(0.0, 1.0);

            if score <= RANK_FLOOR {
                return None;
            }

            let savings = target.price - product.price;
            let savings = (savings > 0.0).then_some(savings);

            let mut reasons = Vec::new();
            if let Some(amount) = savings {
                reasons.push(format!("${:.2} cheaper than what you're looking at", amount));
            }
            if let Some(rating) = product.rating {
                if rating >= 4.5 {
                    reasons.push(format!("Highly rated at {:.1} stars", rating));
                }
            }
            if product.category == target.category {
                reasons.push("Same category as the original".to_string());
            }
            if let Some(why) = &candidate.why {
                reasons.push(why.clone());
            }

            Some(RecommendationAnalysis {
                product: product.clone(),
                score,
                reasons,
                savings,
            })
        })
        .collect();

    // Stable sort keeps input order on exact score ties
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(MAX_ALTERNATIVES);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalWeight, PriceSensitivity};

    fn product(id: &str, price: f64, category: &str, rating: Option<f64>) -> Product {
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

    fn candidate(id: &str, price: f64, category: &str, rating: Option<f64>) -> CandidateProduct {
        CandidateProduct {
            product: product(id, price, category, rating),
            why: None,
        }
    }

    fn criteria(goals: &[(&str, f64)], tier: PriceTier, willing: bool) -> UserCriteria {
        UserCriteria {
            goals: goals
                .iter()
                .map(|(id, weight)| GoalWeight {
                    id: id.to_string(),
                    weight: *weight,
                })
                .collect(),
            price_sensitivity: PriceSensitivity {
                tier,
                max_price: None,
                willing_to_pay_more: willing,
            },
            liked_products: vec![],
            disliked_products: vec![],
        }
    }

    fn patterns(avg_liked: f64, threshold: f64, preferred: &[&str], avoided: &[&str]) -> UserPatterns {
        UserPatterns {
            avg_liked_price: avg_liked,
            avg_disliked_price: 0.0,
            preferred_categories: preferred.iter().map(|s| s.to_string()).collect(),
            avoided_categories: avoided.iter().map(|s| s.to_string()).collect(),
            quality_threshold: threshold,
        }
    }

    #[test]
    fn test_worked_example_considers_pricey_electronics() {
        // $89.99 vs avg liked $50 (ratio 1.8): -0.2; rating 4.6 >= 4.5: +0.15;
        // preferred category: +0.15; save-money goal does not trigger at <$100.
        let target = product("p1", 89.99, "Electronics", Some(4.6));
        let criteria = criteria(&[("save-money", 1.0)], PriceTier::Moderate, false);
        let patterns = patterns(50.0, 4.5, &["Electronics"], &[]);

        let analysis = score_product(&target, &criteria, &patterns);

        assert!((analysis.score - 0.60).abs() < 1e-9);
        assert_eq!(analysis.recommendation, Recommendation::Consider);
    }

    #[test]
    fn test_save_money_goal_penalizes_over_100() {
        let target = product("p1", 120.0, "Electronics", None);
        let criteria = criteria(&[("save-money", 1.0)], PriceTier::Budget, false);
        let patterns = UserPatterns::default();

        let analysis = score_product(&target, &criteria, &patterns);
        assert!((analysis.score - 0.4).abs() < 1e-9);
        assert!(analysis
            .reasons
            .iter()
            .any(|r| r.contains("save-money")));
    }

    #[test]
    fn test_eco_goal_rewards_marker_in_title() {
        let mut target = product("p1", 30.0, "Kitchen", None);
        target.title = "Organic cotton towel set".to_string();
        let criteria = criteria(&[("eco-friendly", 1.0)], PriceTier::Moderate, false);

        let analysis = score_product(&target, &criteria, &UserPatterns::default());
        assert!((analysis.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped_to_unit_interval() {
        // Every negative rule fires at once
        let target = product("p1", 500.0, "Fashion", Some(2.0));
        let criteria = criteria(&[("save-money", 1.0)], PriceTier::Budget, false);
        let patterns = patterns(50.0, 4.5, &[], &["Fashion"]);

        let analysis = score_product(&target, &criteria, &patterns);
        assert!((0.0..=1.0).contains(&analysis.score));
        assert_eq!(
            analysis.recommendation,
            Recommendation::from_score(analysis.score)
        );
    }

    #[test]
    fn test_no_history_stays_neutral() {
        let target = product("p1", 25.0, "Kitchen", None);
        let criteria = criteria(&[], PriceTier::Moderate, false);

        let analysis = score_product(&target, &criteria, &UserPatterns::default());
        assert_eq!(analysis.score, 0.5);
        assert_eq!(analysis.recommendation, Recommendation::Consider);
        assert!(!analysis.reasons.is_empty());
    }

    #[test]
    fn test_unrated_product_skips_quality_rule() {
        let target = product("p1", 50.0, "Kitchen", None);
        let criteria = criteria(&[], PriceTier::Moderate, false);
        let patterns = patterns(50.0, 4.5, &[], &[]);

        let analysis = score_product(&target, &criteria, &patterns);
        // Only the price rule applies
        assert!((analysis.score - 0.7).abs() < 1e-9);
        assert!(analysis.factors.as_ref().unwrap().quality.is_none());
    }

    #[test]
    fn test_worked_example_budget_ranking() {
        // $59.99 candidate vs $89.99 target for a budget shopper:
        // savings fraction 0.333 -> price score 0.666; rating 4.4 -> 0.88.
        let target = product("t", 89.99, "Electronics", Some(4.5));
        let alt = candidate("a", 59.99, "Electronics", Some(4.4));
        let criteria = criteria(&[("quality-first", 1.0)], PriceTier::Budget, false);

        let ranked = rank_alternatives(&target, &[alt], &criteria, &UserPatterns::default());

        assert_eq!(ranked.len(), 1);
        let expected =
            0.4 * ((30.0 / 89.99) * 2.0_f64).min(1.0) + 0.3 * (4.4 / 5.0) + 0.3 * (4.4 / 5.0);
        assert!((ranked[0].score - expected).abs() < 1e-9);
        assert!(ranked[0].score > 0.5);
        assert!((ranked[0].savings.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissimilar_candidates_filtered() {
        // Different category, wildly different price: similarity below 0.3
        let target = product("t", 20.0, "Kitchen", Some(4.0));
        let alt = candidate("a", 900.0, "Electronics", None);
        let criteria = criteria(&[("save-money", 1.0)], PriceTier::Budget, false);

        let ranked = rank_alternatives(&target, &[alt], &criteria, &UserPatterns::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_expensive_alternative_needs_willingness_and_rating() {
        let target = product("t", 50.0, "Electronics", Some(4.0));
        let alt = candidate("a", 70.0, "Electronics", Some(4.8));

        // Not willing to pay more: price score 0.3 keeps it below the floor
        let stingy = criteria(&[("save-money", 1.0)], PriceTier::Moderate, false);
        let ranked = rank_alternatives(&target, &[alt.clone()], &stingy, &UserPatterns::default());
        assert!(ranked.is_empty());

        // Willing and rated 4.8: price score 0.6 lifts it over the floor
        let flexible = criteria(&[("save-money", 1.0)], PriceTier::Moderate, true);
        let ranked = rank_alternatives(&target, &[alt], &flexible, &UserPatterns::default());
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].savings.is_none());
    }

    #[test]
    fn test_ranking_sorted_and_truncated_to_five() {
        let target = product("t", 100.0, "Electronics", Some(4.5));
        let candidates: Vec<CandidateProduct> = (0..8)
            .map(|i| {
                candidate(
                    &format!("a{}", i),
                    40.0 + i as f64 * 5.0,
                    "Electronics",
                    Some(4.6),
                )
            })
            .collect();
        let criteria = criteria(&[("save-money", 1.0)], PriceTier::Budget, false);

        let ranked = rank_alternatives(&target, &candidates, &criteria, &UserPatterns::default());

        assert!(ranked.len() <= 5);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let target = product("t", 100.0, "Electronics", Some(4.5));
        let candidates: Vec<CandidateProduct> = (0..6)
            .map(|i| {
                candidate(
                    &format!("a{}", i),
                    30.0 + i as f64 * 10.0,
                    "Electronics",
                    Some(4.0 + (i % 3) as f64 * 0.3),
                )
            })
            .collect();
        let criteria = criteria(
            &[("save-money", 1.0), ("quality-first", 2.0)],
            PriceTier::Budget,
            true,
        );

        let first = rank_alternatives(&target, &candidates, &criteria, &UserPatterns::default());
        let second = rank_alternatives(&target, &candidates, &criteria, &UserPatterns::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_goal_alignment_weighted_and_normalized() {
        // save-money hits, quality-first contributes rating/5; normalized
        // by the two recognized goals; the unknown goal is ignored.
        let cand = product("a", 40.0, "Kitchen", Some(4.0));
        let criteria = criteria(
            &[("save-money", 1.0), ("quality-first", 1.0), ("unknown", 9.0)],
            PriceTier::Moderate,
            false,
        );

        let score = goal_alignment_score(&cand, &criteria);
        assert!((score - (1.0 * 1.0 + 1.0 * 0.8) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_goal_alignment_clamped_under_heavy_weights() {
        let cand = product("a", 10.0, "Kitchen", Some(4.0));
        let criteria = criteria(&[("save-money", 3.0)], PriceTier::Moderate, false);

        assert_eq!(goal_alignment_score(&cand, &criteria), 1.0);
    }

    #[test]
    fn test_ranking_score_stays_in_unit_interval_with_heavy_weights() {
        // A deep discount for a budget shopper whose one goal carries a
        // weight of 3: every component saturates at once.
        let target = product("t", 100.0, "Kitchen", Some(4.0));
        let alt = candidate("a", 10.0, "Kitchen", Some(5.0));
        let criteria = criteria(&[("save-money", 3.0)], PriceTier::Budget, false);

        let ranked = rank_alternatives(&target, &[alt], &criteria, &UserPatterns::default());

        assert_eq!(ranked.len(), 1);
        assert!((0.0..=1.0).contains(&ranked[0].score));
    }
}
