//! Shared nutrition data structure
//!
//! Used by meal records, bucket summaries, and rollup statistics.

use serde::{Deserialize, Serialize};

/// Nutritional information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64, // grams
    #[serde(default)]
    pub carbs: f64, // grams
    #[serde(default)]
    pub fat: f64, // grams
    #[serde(default)]
    pub fiber: f64, // grams
    #[serde(default)]
    pub sodium: f64, // milligrams
}

impl Nutrition {
    /// Create a new Nutrition with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add another nutrition to this one
    pub fn add(&self, other: &Nutrition) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
            fiber: self.fiber + other.fiber,
            sodium: self.sodium + other.sodium,
        }
    }

    /// Replace non-finite fields with zero.
    ///
    /// Source data may carry nulls or junk that deserializes to NaN; summed
    /// totals must always be finite.
    pub fn sanitized(&self) -> Self {
        let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            calories: clean(self.calories),
            protein: clean(self.protein),
            carbs: clean(self.carbs),
            fat: clean(self.fat),
            fiber: clean(self.fiber),
            sodium: clean(self.sodium),
        }
    }
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sums_all_fields() {
        let a = Nutrition {
            calories: 500.0,
            protein: 30.0,
            carbs: 50.0,
            fat: 20.0,
            fiber: 5.0,
            sodium: 400.0,
        };
        let b = Nutrition {
            calories: 200.0,
            protein: 10.0,
            carbs: 25.0,
            fat: 8.0,
            fiber: 2.0,
            sodium: 100.0,
        };
        let total = a + b;
        assert_eq!(total.calories, 700.0);
        assert_eq!(total.protein, 40.0);
        assert_eq!(total.carbs, 75.0);
        assert_eq!(total.fat, 28.0);
        assert_eq!(total.fiber, 7.0);
        assert_eq!(total.sodium, 500.0);
    }

    #[test]
    fn test_missing_fields_deserialize_to_zero() {
        let n: Nutrition = serde_json::from_str(r#"{"calories": 120.0}"#).unwrap();
        assert_eq!(n.calories, 120.0);
        assert_eq!(n.protein, 0.0);
        assert_eq!(n.sodium, 0.0);
    }

    #[test]
    fn test_sanitized_clears_non_finite() {
        let n = Nutrition {
            calories: f64::NAN,
            protein: f64::INFINITY,
            carbs: 10.0,
            ..Nutrition::zero()
        };
        let clean = n.sanitized();
        assert_eq!(clean.calories, 0.0);
        assert_eq!(clean.protein, 0.0);
        assert_eq!(clean.carbs, 10.0);
    }
}
