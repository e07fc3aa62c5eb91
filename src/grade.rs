//! Membership grade policy: a small ordered threshold table mapping lifetime
//! accumulated spend to a grade and its point accrual rate.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Grade {
    Green,
    Orange,
    Red,
    Black,
    #[serde(rename = "VIP")]
    Vip,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Green => "Green",
            Grade::Orange => "Orange",
            Grade::Red => "Red",
            Grade::Black => "Black",
            Grade::Vip => "VIP",
        }
    }

    pub fn from_str(s: &str) -> Grade {
        match s {
            "Orange" => Grade::Orange,
            "Red" => Grade::Red,
            "Black" => Grade::Black,
            "VIP" => Grade::Vip,
            _ => Grade::Green,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct GradePolicy {
    pub grade: Grade,
    pub min_amount: i64,
    pub point_rate: f64,
}

/// Ordered by min_amount ascending.
pub const GRADE_POLICIES: [GradePolicy; 5] = [
    GradePolicy {
        grade: Grade::Green,
        min_amount: 0,
        point_rate: 0.01,
    },
    GradePolicy {
        grade: Grade::Orange,
        min_amount: 100_000,
        point_rate: 0.02,
    },
    GradePolicy {
        grade: Grade::Red,
        min_amount: 300_000,
        point_rate: 0.03,
    },
    GradePolicy {
        grade: Grade::Black,
        min_amount: 500_000,
        point_rate: 0.05,
    },
    GradePolicy {
        grade: Grade::Vip,
        min_amount: 1_000_000,
        point_rate: 0.07,
    },
];

/// Highest policy whose threshold is <= the accumulated amount.
pub fn policy_for(accumulated: i64) -> GradePolicy {
    GRADE_POLICIES
        .iter()
        .rev()
        .find(|p| accumulated >= p.min_amount)
        .copied()
        .unwrap_or(GRADE_POLICIES[0])
}

/// First policy the accumulated amount has not reached yet, if any.
pub fn next_policy(accumulated: i64) -> Option<GradePolicy> {
    GRADE_POLICIES
        .iter()
        .find(|p| p.min_amount > accumulated)
        .copied()
}

/// Points earned for a paid amount at the given accrual rate.
pub fn accrue_points(paid: i64, rate: f64) -> i64 {
    (paid as f64 * rate).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(policy_for(0).grade, Grade::Green);
        assert_eq!(policy_for(99_999).grade, Grade::Green);
        assert_eq!(policy_for(100_000).grade, Grade::Orange);
        assert_eq!(policy_for(300_000).grade, Grade::Red);
        assert_eq!(policy_for(500_000).grade, Grade::Black);
        assert_eq!(policy_for(1_000_000).grade, Grade::Vip);
        assert_eq!(policy_for(50_000_000).grade, Grade::Vip);
    }

    #[test]
    fn grade_is_monotonic_in_spend() {
        let mut last = 0usize;
        for amount in (0i64..2_000_000).step_by(10_000) {
            let idx = GRADE_POLICIES
                .iter()
                .position(|p| p.grade == policy_for(amount).grade)
                .unwrap();
            assert!(idx >= last, "grade dropped at {amount}");
            last = idx;
        }
    }

    #[test]
    fn next_policy_stops_at_vip() {
        assert_eq!(next_policy(0).unwrap().grade, Grade::Orange);
        assert_eq!(next_policy(999_999).unwrap().grade, Grade::Vip);
        assert!(next_policy(1_000_000).is_none());
    }

    #[test]
    fn accrual_floors() {
        assert_eq!(accrue_points(20_000, 0.01), 200);
        assert_eq!(accrue_points(999, 0.01), 9);
        assert_eq!(accrue_points(0, 0.07), 0);
    }

    #[test]
    fn grade_string_round_trip() {
        for policy in GRADE_POLICIES {
            assert_eq!(Grade::from_str(policy.grade.as_str()), policy.grade);
        }
        assert_eq!(Grade::from_str("unknown"), Grade::Green);
    }
}
