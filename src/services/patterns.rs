use std::collections::HashMap;

use crate::models::{Product, UserCriteria, UserPatterns};

/// Maximum categories kept per preference bucket
const TOP_CATEGORIES: usize = 3;

/// Derives aggregate preference statistics from the like/dislike history.
///
/// Pure function: no I/O, no failure mode. Empty history yields zero-valued
/// output, which downstream scoring treats as "no signal" rather than an
/// error.
pub fn analyze_patterns(criteria: &UserCriteria) -> UserPatterns {
    UserPatterns {
        avg_liked_price: average_price(&criteria.liked_products),
        avg_disliked_price: average_price(&criteria.disliked_products),
        preferred_categories: top_categories(&criteria.liked_products),
        avoided_categories: top_categories(&criteria.disliked_products),
        quality_threshold: average_rating(&criteria.liked_products),
    }
}

fn average_price(products: &[Product]) -> f64 {
    if products.is_empty() {
        return 0.0;
    }
    products.iter().map(|p| p.price).sum::<f64>() / products.len() as f64
}

/// Mean rating over items that carry one; unrated items are excluded.
fn average_rating(products: &[Product]) -> f64 {
    let ratings: Vec<f64> = products.iter().filter_map(|p| p.rating).collect();
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().sum::<f64>() / ratings.len() as f64
}

/// Category counts in first-seen order, stable-sorted descending, top 3.
///
/// The stable sort keeps insertion order as the tie-break.
fn top_categories(products: &[Product]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for product in products {
        if let Some(&i) = index.get(product.category.as_str()) {
            counts[i].1 += 1;
        } else {
            index.insert(product.category.as_str(), counts.len());
            counts.push((product.category.clone(), 1));
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(category, _)| category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalWeight, PriceSensitivity, PriceTier};

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

    fn criteria(liked: Vec<Product>, disliked: Vec<Product>) -> UserCriteria {
        UserCriteria {
            goals: vec![GoalWeight {
                id: "save-money".to_string(),
                weight: 1.0,
            }],
            price_sensitivity: PriceSensitivity {
                tier: PriceTier::Moderate,
                max_price: None,
                willing_to_pay_more: false,
            },
            liked_products: liked,
            disliked_products: disliked,
        }
    }

    #[test]
    fn test_empty_history_yields_zero_patterns() {
        let patterns = analyze_patterns(&criteria(vec![], vec![]));

        assert_eq!(patterns.avg_liked_price, 0.0);
        assert_eq!(patterns.avg_disliked_price, 0.0);
        assert!(patterns.preferred_categories.is_empty());
        assert!(patterns.avoided_categories.is_empty());
        assert_eq!(patterns.quality_threshold, 0.0);
    }

    #[test]
    fn test_average_prices_per_bucket() {
        let patterns = analyze_patterns(&criteria(
            vec![
                product("l1", 40.0, "Electronics", None),
                product("l2", 60.0, "Electronics", None),
            ],
            vec![product("d1", 200.0, "Fashion", None)],
        ));

        assert_eq!(patterns.avg_liked_price, 50.0);
        assert_eq!(patterns.avg_disliked_price, 200.0);
    }

    #[test]
    fn test_quality_threshold_excludes_unrated_items() {
        let patterns = analyze_patterns(&criteria(
            vec![
                product("l1", 10.0, "Kitchen", Some(4.0)),
                product("l2", 10.0, "Kitchen", None),
                product("l3", 10.0, "Kitchen", Some(5.0)),
            ],
            vec![],
        ));

        assert_eq!(patterns.quality_threshold, 4.5);
    }

    #[test]
    fn test_top_categories_capped_at_three() {
        let liked = vec![
            product("a", 1.0, "Electronics", None),
            product("b", 1.0, "Electronics", None),
            product("c", 1.0, "Kitchen", None),
            product("d", 1.0, "Kitchen", None),
            product("e", 1.0, "Fashion", None),
            product("f", 1.0, "Garden", None),
        ];

        let patterns = analyze_patterns(&criteria(liked, vec![]));

        assert_eq!(patterns.preferred_categories.len(), 3);
        assert_eq!(patterns.preferred_categories[0], "Electronics");
        assert_eq!(patterns.preferred_categories[1], "Kitchen");
        // Fashion and Garden tie at one; Fashion was seen first
        assert_eq!(patterns.preferred_categories[2], "Fashion");
    }

    #[test]
    fn test_category_ties_broken_by_insertion_order() {
        let liked = vec![
            product("a", 1.0, "Garden", None),
            product("b", 1.0, "Fashion", None),
            product("c", 1.0, "Kitchen", None),
        ];

        let patterns = analyze_patterns(&criteria(liked, vec![]));
        assert_eq!(
            patterns.preferred_categories,
            vec!["Garden", "Fashion", "Kitchen"]
        );
    }
}
