//! Per-course aggregate rating.
//!
//! The aggregate is a materialized cache over the live reviews of a
//! course. It is recomputed on writes only; reads use the stored counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::review::{MAX_RATING, MIN_RATING};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseRating {
    pub tenant_id: Uuid,
    pub course_id: Uuid,
    pub average_rating: f64,
    pub total_reviews: u64,
    pub rating_1: u64,
    pub rating_2: u64,
    pub rating_3: u64,
    pub rating_4: u64,
    pub rating_5: u64,
    pub updated_at: DateTime<Utc>,
}

impl CourseRating {
    /// An aggregate for a course nobody has reviewed yet.
    pub fn empty(tenant_id: Uuid, course_id: Uuid) -> Self {
        Self::from_ratings(tenant_id, course_id, &[])
    }

    /// Build the aggregate from a set of star ratings. Values outside
    /// `1..=5` are ignored.
    pub fn from_ratings(tenant_id: Uuid, course_id: Uuid, ratings: &[u8]) -> Self {
        let mut counts = [0u64; MAX_RATING as usize];
        for &rating in ratings {
            if (MIN_RATING..=MAX_RATING).contains(&rating) {
                counts[(rating - 1) as usize] += 1;
            }
        }

        let total: u64 = counts.iter().sum();
        let sum: u64 = counts
            .iter()
            .enumerate()
            .map(|(i, count)| (i as u64 + 1) * count)
            .sum();
        let average_rating = if total == 0 {
            0.0
        } else {
            round_to_hundredths(sum as f64 / total as f64)
        };

        Self {
            tenant_id,
            course_id,
            average_rating,
            total_reviews: total,
            rating_1: counts[0],
            rating_2: counts[1],
            rating_3: counts[2],
            rating_4: counts[3],
            rating_5: counts[4],
            updated_at: Utc::now(),
        }
    }

    /// Star counts indexed by `rating - 1`.
    pub fn distribution(&self) -> [u64; 5] {
        [
            self.rating_1,
            self.rating_2,
            self.rating_3,
            self.rating_4,
            self.rating_5,
        ]
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_aggregate_has_zero_average() {
        let rating = CourseRating::empty(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(rating.total_reviews, 0);
        assert_eq!(rating.average_rating, 0.0);
        assert_eq!(rating.distribution(), [0; 5]);
    }

    #[test]
    fn aggregates_counts_and_average() {
        let rating = CourseRating::from_ratings(Uuid::new_v4(), Uuid::new_v4(), &[5, 4, 4, 1]);
        assert_eq!(rating.total_reviews, 4);
        assert_eq!(rating.distribution(), [1, 0, 0, 2, 1]);
        assert_eq!(rating.average_rating, 3.5);
    }

    #[test]
    fn average_is_rounded() {
        let rating = CourseRating::from_ratings(Uuid::new_v4(), Uuid::new_v4(), &[5, 4, 4]);
        assert_eq!(rating.average_rating, 4.33);
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let rating = CourseRating::from_ratings(Uuid::new_v4(), Uuid::new_v4(), &[0, 6, 3]);
        assert_eq!(rating.total_reviews, 1);
        assert_eq!(rating.average_rating, 3.0);
    }
}
