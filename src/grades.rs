use sqlx::PgPool;
use uuid::Uuid;

use crate::db;

pub const UNGRADED: &str = "--";

// Inclusive lower bounds, descending. Anything below 60 falls through to
// the ungraded sentinel.
pub const LADDER: [(f64, &'static str); 11] = [
    (93.0, "A"),
    (90.0, "A-"),
    (87.0, "B+"),
    (83.0, "B"),
    (80.0, "B-"),
    (77.0, "C+"),
    (73.0, "C"),
    (70.0, "C-"),
    (67.0, "D+"),
    (63.0, "D"),
    (60.0, "D-"),
];

#[derive(Debug, Clone, Copy)]
pub struct AssignmentScore {
    pub earned: f64,
    pub possible: f64,
}

#[derive(Debug, Clone)]
pub struct CategoryTally {
    pub weight: i32,
    pub scores: Vec<AssignmentScore>,
}

pub fn letter_grade(scaled: f64) -> &'static str {
    for (floor, letter) in LADDER {
        if scaled >= floor {
            return letter;
        }
    }
    UNGRADED
}

// None when the category holds no assignments, or when its assignments sum
// to zero possible points. Such a category must not reach the denominator.
pub fn category_percentage(scores: &[AssignmentScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    let earned: f64 = scores.iter().map(|s| s.earned).sum();
    let possible: f64 = scores.iter().map(|s| s.possible).sum();
    if possible == 0.0 {
        return None;
    }

    Some(earned / possible)
}

pub fn scaled_score(categories: &[CategoryTally]) -> f64 {
    let mut weighted = 0.0;
    let mut weight_used = 0.0;

    for category in categories {
        if category.weight <= 0 {
            continue;
        }
        let Some(percentage) = category_percentage(&category.scores) else {
            continue;
        };
        weighted += percentage * category.weight as f64;
        weight_used += category.weight as f64;
    }

    if weight_used == 0.0 {
        0.0
    } else {
        // Weights are relative proportions; they need not sum to 100.
        weighted * (100.0 / weight_used)
    }
}

pub async fn recompute(
    pool: &PgPool,
    student_uid: &str,
    class_id: Uuid,
) -> anyhow::Result<String> {
    let categories = db::list_categories(pool, class_id).await?;
    let mut tallies = Vec::with_capacity(categories.len());

    for category in &categories {
        if category.weight <= 0 {
            continue;
        }

        let assignments = db::list_assignments(pool, category.category_id).await?;
        let mut scores = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let submission =
                db::find_submission(pool, student_uid, assignment.assignment_id).await?;
            // Missing or ungraded submissions earn 0 but still owe the
            // assignment's full point value.
            let earned = submission.and_then(|s| s.score).unwrap_or(0);
            scores.push(AssignmentScore {
                earned: earned as f64,
                possible: assignment.points as f64,
            });
        }

        tallies.push(CategoryTally {
            weight: category.weight,
            scores,
        });
    }

    let scaled = scaled_score(&tallies);
    let grade = letter_grade(scaled);

    // Affects zero rows when the student is not enrolled; the result is
    // discarded rather than surfaced as an error.
    let enrolled = db::set_enrollment_grade(pool, student_uid, class_id, grade).await?;
    tracing::debug!(
        student = student_uid,
        class = %class_id,
        scaled,
        grade,
        enrolled,
        "recomputed grade"
    );

    Ok(grade.to_string())
}

pub async fn recompute_class(pool: &PgPool, class_id: Uuid) -> anyhow::Result<usize> {
    let students = db::list_enrolled(pool, class_id).await?;
    for uid in &students {
        recompute(pool, uid, class_id).await?;
    }
    Ok(students.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect(possible: f64) -> AssignmentScore {
        AssignmentScore {
            earned: possible,
            possible,
        }
    }

    #[test]
    fn weights_are_relative_proportions() {
        let categories = vec![
            CategoryTally {
                weight: 30,
                scores: vec![perfect(100.0)],
            },
            CategoryTally {
                weight: 30,
                scores: vec![perfect(50.0)],
            },
            CategoryTally {
                weight: 20,
                scores: vec![perfect(10.0)],
            },
        ];

        // Weights sum to 80, not 100; full marks everywhere still scale to 100.
        assert!((scaled_score(&categories) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_category_never_contributes() {
        let categories = vec![
            CategoryTally {
                weight: 50,
                scores: vec![perfect(100.0)],
            },
            CategoryTally {
                weight: 0,
                scores: vec![AssignmentScore {
                    earned: 0.0,
                    possible: 100.0,
                }],
            },
        ];

        assert!((scaled_score(&categories) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn category_without_assignments_is_skipped() {
        let categories = vec![
            CategoryTally {
                weight: 50,
                scores: vec![],
            },
            CategoryTally {
                weight: 50,
                scores: vec![perfect(40.0)],
            },
        ];

        assert!((scaled_score(&categories) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn category_with_zero_possible_points_is_skipped() {
        let categories = vec![
            CategoryTally {
                weight: 60,
                scores: vec![AssignmentScore {
                    earned: 0.0,
                    possible: 0.0,
                }],
            },
            CategoryTally {
                weight: 40,
                scores: vec![perfect(25.0)],
            },
        ];

        assert!((scaled_score(&categories) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_submission_drags_the_category_down() {
        // 20-point assignment with no submission inside an otherwise perfect
        // category of weight 50: 80/100 earned overall.
        let categories = vec![CategoryTally {
            weight: 50,
            scores: vec![
                perfect(40.0),
                perfect(40.0),
                AssignmentScore {
                    earned: 0.0,
                    possible: 20.0,
                },
            ],
        }];

        assert!((scaled_score(&categories) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn no_contributing_category_scores_zero() {
        assert_eq!(scaled_score(&[]), 0.0);

        let only_empty = vec![CategoryTally {
            weight: 100,
            scores: vec![],
        }];
        assert_eq!(scaled_score(&only_empty), 0.0);
    }

    #[test]
    fn scaled_score_is_deterministic() {
        let categories = vec![
            CategoryTally {
                weight: 70,
                scores: vec![
                    AssignmentScore {
                        earned: 87.0,
                        possible: 100.0,
                    },
                    AssignmentScore {
                        earned: 13.0,
                        possible: 20.0,
                    },
                ],
            },
            CategoryTally {
                weight: 30,
                scores: vec![AssignmentScore {
                    earned: 91.0,
                    possible: 100.0,
                }],
            },
        ];

        let first = scaled_score(&categories);
        let second = scaled_score(&categories);
        assert_eq!(first, second);
        assert_eq!(letter_grade(first), letter_grade(second));
    }

    #[test]
    fn ladder_lower_bounds_are_inclusive() {
        assert_eq!(letter_grade(93.0), "A");
        assert_eq!(letter_grade(92.999), "A-");
        assert_eq!(letter_grade(90.0), "A-");
        assert_eq!(letter_grade(83.0), "B");
        assert_eq!(letter_grade(80.0), "B-");
        assert_eq!(letter_grade(77.0), "C+");
        assert_eq!(letter_grade(70.0), "C-");
        assert_eq!(letter_grade(67.0), "D+");
        assert_eq!(letter_grade(60.0), "D-");
        assert_eq!(letter_grade(59.999), UNGRADED);
        assert_eq!(letter_grade(0.0), UNGRADED);
    }

    #[test]
    fn partial_credit_maps_through_the_ladder() {
        // 85% in a single full-weight category.
        let categories = vec![CategoryTally {
            weight: 100,
            scores: vec![AssignmentScore {
                earned: 85.0,
                possible: 100.0,
            }],
        }];

        let scaled = scaled_score(&categories);
        assert!((scaled - 85.0).abs() < 1e-9);
        assert_eq!(letter_grade(scaled), "B");
    }
}
