use std::collections::HashMap;

use super::EloError;

/// Current rating per team for one replay run.
///
/// Teams are created lazily at the configured mean the first time they are
/// looked up, so a rating read can never fail mid-replay. The ledger lives
/// exactly as long as one run; the caller extracts the final map afterwards.
#[derive(Debug, Clone)]
pub struct RatingLedger {
    ratings: HashMap<String, f64>,
    mean: f64,
    revert_percentage: f64,
}

impl RatingLedger {
    /// `revert_percentage` outside [0, 1] is a configuration error and is
    /// rejected here, before any event is touched.
    pub fn new(mean_rating: f64, revert_percentage: f64) -> Result<Self, EloError> {
        if !(0.0..=1.0).contains(&revert_percentage) {
            return Err(EloError::RevertPercentageOutOfRange(revert_percentage));
        }
        Ok(RatingLedger {
            ratings: HashMap::new(),
            mean: mean_rating,
            revert_percentage,
        })
    }

    /// Current rating, initializing to the mean on first sight.
    pub fn get(&mut self, team_id: &str) -> f64 {
        if let Some(rating) = self.ratings.get(team_id) {
            return *rating;
        }
        self.ratings.insert(team_id.to_string(), self.mean);
        self.mean
    }

    /// Overwrite after a resolved game.
    pub fn set(&mut self, team_id: &str, rating: f64) {
        self.ratings.insert(team_id.to_string(), rating);
    }

    /// Merge known ratings over the lazy defaults (pre-season seeds, or the
    /// latest ratings recovered from an earlier run).
    pub fn seed(&mut self, ratings: &HashMap<String, f64>) {
        for (team_id, rating) in ratings {
            self.ratings.insert(team_id.clone(), *rating);
        }
    }

    /// Pull every rating toward the mean by the configured fraction. Run at
    /// season boundaries to model year-over-year uncertainty growth.
    pub fn regress_to_mean(&mut self) {
        for rating in self.ratings.values_mut() {
            *rating -= (*rating - self.mean) * self.revert_percentage;
        }
    }

    pub fn into_ratings(self) -> HashMap<String, f64> {
        self.ratings
    }

    /// Number of teams seen so far.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn out_of_range_revert_percentage_fails_at_construction() {
        assert!(RatingLedger::new(1505.0, -0.01).is_err());
        assert!(RatingLedger::new(1505.0, 1.01).is_err());
        assert!(RatingLedger::new(1505.0, 0.0).is_ok());
        assert!(RatingLedger::new(1505.0, 1.0).is_ok());
    }

    #[test]
    fn unknown_teams_start_at_the_mean() {
        let mut ledger = RatingLedger::new(1505.0, 0.25).unwrap();
        assert_eq!(ledger.get("duke"), 1505.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn seeds_override_lazy_defaults() {
        let mut ledger = RatingLedger::new(1505.0, 0.25).unwrap();
        ledger.get("duke");
        let mut seeds = HashMap::new();
        seeds.insert("duke".to_string(), 1650.0);
        seeds.insert("unc".to_string(), 1580.0);
        ledger.seed(&seeds);
        assert_eq!(ledger.get("duke"), 1650.0);
        assert_eq!(ledger.get("unc"), 1580.0);
    }

    #[test]
    fn regression_shrinks_distance_from_the_mean_proportionally() {
        let mut ledger = RatingLedger::new(1500.0, 1.0 / 3.0).unwrap();
        ledger.set("strong", 1800.0);
        ledger.set("weak", 1200.0);
        ledger.regress_to_mean();
        assert_relative_eq!(ledger.get("strong"), 1700.0, epsilon = 1e-9);
        assert_relative_eq!(ledger.get("weak"), 1300.0, epsilon = 1e-9);
        // |new - mean| == |old - mean| * (1 - p)
        assert_relative_eq!(
            (ledger.get("strong") - 1500.0).abs(),
            300.0 * (1.0 - 1.0 / 3.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn full_reversion_lands_everyone_on_the_mean() {
        let mut ledger = RatingLedger::new(1500.0, 1.0).unwrap();
        ledger.set("a", 1999.0);
        ledger.set("b", 1001.0);
        ledger.regress_to_mean();
        assert_relative_eq!(ledger.get("a"), 1500.0, epsilon = 1e-9);
        assert_relative_eq!(ledger.get("b"), 1500.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_reversion_is_a_no_op() {
        let mut ledger = RatingLedger::new(1500.0, 0.0).unwrap();
        ledger.set("a", 1750.0);
        ledger.regress_to_mean();
        assert_eq!(ledger.get("a"), 1750.0);
    }
}
