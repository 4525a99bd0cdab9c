//! Final grade reduction.
//!
//! Trimmed mean: with at least three grades, drop exactly one lowest and
//! one highest value (ties at an extreme lose only one instance), average
//! the rest and round half-up to two decimals. Recomputed on every call.

use crate::model::deliverable::DeliverableId;
use crate::model::state::State;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fewest grades for which a final grade is defined.
pub const MIN_GRADES_FOR_FINAL: usize = 3;

/// Final grade of one deliverable; `None` while undetermined.
pub fn final_grade(state: &State, deliverable_id: DeliverableId) -> Option<Decimal> {
    let values: Vec<Decimal> = state
        .grades_for(deliverable_id)
        .map(|grade| grade.value.as_decimal())
        .collect();
    trimmed_mean(&values)
}

/// Drops one min and one max, then averages the remainder.
pub fn trimmed_mean(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < MIN_GRADES_FOR_FINAL {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let kept = &sorted[1..sorted.len() - 1];

    let sum: Decimal = kept.iter().copied().sum();
    let mut mean = (sum / Decimal::from(kept.len()))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    mean.rescale(2);
    Some(mean)
}

#[cfg(test)]
mod tests {
    use super::trimmed_mean;
    use rust_decimal::Decimal;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|value| Decimal::from(*value)).collect()
    }

    #[test]
    fn undetermined_below_three_values() {
        assert_eq!(trimmed_mean(&[]), None);
        assert_eq!(trimmed_mean(&decimals(&[7])), None);
        assert_eq!(trimmed_mean(&decimals(&[7, 9])), None);
    }

    #[test]
    fn drops_single_min_and_max() {
        let mean = trimmed_mean(&decimals(&[10, 8, 9, 2])).unwrap();
        assert_eq!(mean.to_string(), "8.50");
    }

    #[test]
    fn ties_at_extremes_drop_one_instance_each() {
        assert_eq!(trimmed_mean(&decimals(&[5, 5, 5])).unwrap().to_string(), "5.00");
        let mean = trimmed_mean(&decimals(&[2, 2, 9, 10, 10])).unwrap();
        // kept: 2, 9, 10
        assert_eq!(mean.to_string(), "7.00");
    }

    #[test]
    fn rounds_half_up_to_two_decimals() {
        let values = vec![
            Decimal::new(100, 2),
            Decimal::new(701, 2),
            Decimal::new(702, 2),
            Decimal::new(702, 2),
            Decimal::new(1000, 2),
        ];
        // (7.01 + 7.02 + 7.02) / 3 = 7.01666...
        assert_eq!(trimmed_mean(&values).unwrap().to_string(), "7.02");

        let halves = vec![
            Decimal::new(100, 2),
            Decimal::new(800, 2),
            Decimal::new(801, 2),
            Decimal::new(1000, 2),
        ];
        // (8.00 + 8.01) / 2 = 8.005
        assert_eq!(trimmed_mean(&halves).unwrap().to_string(), "8.01");
    }
}
