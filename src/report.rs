use std::fmt::Write;

use crate::grades;
use crate::models::{CategorySummary, ClassRow, CourseRow, RosterEntry};

// Distribution in ladder order, sentinel last. Grades that no student holds
// are omitted; enrollments whose grade was never computed are counted apart.
pub fn grade_distribution(roster: &[RosterEntry]) -> Vec<(&'static str, usize)> {
    let letters = grades::LADDER
        .iter()
        .map(|(_, letter)| *letter)
        .chain(std::iter::once(grades::UNGRADED));

    let mut distribution = Vec::new();
    for letter in letters {
        let count = roster
            .iter()
            .filter(|entry| entry.grade.as_deref() == Some(letter))
            .count();
        if count > 0 {
            distribution.push((letter, count));
        }
    }
    distribution
}

pub fn build_report(
    course: &CourseRow,
    offering: &ClassRow,
    roster: &[RosterEntry],
    categories: &[CategorySummary],
) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# Gradebook: {} {} {}",
        course.listing, course.num, course.name
    );
    let _ = writeln!(
        output,
        "{} {}, {} {}-{}, {} enrolled",
        offering.season,
        offering.semester_year,
        offering.location,
        offering.start_time.format("%H:%M"),
        offering.end_time.format("%H:%M"),
        roster.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");

    if categories.is_empty() {
        let _ = writeln!(output, "No assignment categories defined.");
    } else {
        for category in categories.iter() {
            let _ = writeln!(
                output,
                "- {} (weight {}): {} assignments, {} points",
                category.name, category.weight, category.assignment_count, category.total_points
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");

    let distribution = grade_distribution(roster);
    if distribution.is_empty() {
        let _ = writeln!(output, "No grades computed yet.");
    } else {
        for (letter, count) in distribution.iter() {
            let _ = writeln!(output, "- {}: {}", letter, count);
        }
    }

    let pending = roster.iter().filter(|entry| entry.grade.is_none()).count();
    if pending > 0 {
        let _ = writeln!(output, "- not yet computed: {}", pending);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Roster");

    if roster.is_empty() {
        let _ = writeln!(output, "No students enrolled.");
    } else {
        for entry in roster.iter() {
            let _ = writeln!(
                output,
                "- {}, {} ({}): {}",
                entry.lname,
                entry.fname,
                entry.uid,
                entry.grade.as_deref().unwrap_or("(none)")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use uuid::Uuid;

    use super::*;

    fn entry(uid: &str, grade: Option<&str>) -> RosterEntry {
        RosterEntry {
            uid: uid.to_string(),
            fname: "Test".to_string(),
            lname: "Student".to_string(),
            grade: grade.map(str::to_string),
        }
    }

    fn course() -> CourseRow {
        CourseRow {
            course_id: Uuid::new_v4(),
            listing: "CS".to_string(),
            num: 5530,
            name: "Database Systems".to_string(),
        }
    }

    fn offering() -> ClassRow {
        ClassRow {
            class_id: Uuid::new_v4(),
            season: "Fall".to_string(),
            semester_year: 2026,
            location: "WEB L104".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 10, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn distribution_follows_ladder_order() {
        let roster = vec![
            entry("u1", Some("B+")),
            entry("u2", Some("A")),
            entry("u3", Some("B+")),
            entry("u4", Some("--")),
        ];

        let distribution = grade_distribution(&roster);
        assert_eq!(distribution, vec![("A", 1), ("B+", 2), ("--", 1)]);
    }

    #[test]
    fn uncomputed_grades_are_not_in_the_distribution() {
        let roster = vec![entry("u1", None), entry("u2", Some("C"))];

        let distribution = grade_distribution(&roster);
        assert_eq!(distribution, vec![("C", 1)]);
    }

    #[test]
    fn report_includes_empty_states() {
        let report = build_report(&course(), &offering(), &[], &[]);

        assert!(report.contains("# Gradebook: CS 5530 Database Systems"));
        assert!(report.contains("Fall 2026, WEB L104 09:10-10:30, 0 enrolled"));
        assert!(report.contains("No assignment categories defined."));
        assert!(report.contains("No grades computed yet."));
        assert!(report.contains("No students enrolled."));
    }

    #[test]
    fn report_lists_students_with_cached_grades() {
        let roster = vec![entry("u1183406", Some("B+")), entry("u1204977", None)];
        let categories = vec![CategorySummary {
            name: "Exams".to_string(),
            weight: 40,
            assignment_count: 2,
            total_points: 200,
        }];

        let report = build_report(&course(), &offering(), &roster, &categories);

        assert!(report.contains("- Exams (weight 40): 2 assignments, 200 points"));
        assert!(report.contains("- B+: 1"));
        assert!(report.contains("- not yet computed: 1"));
        assert!(report.contains("(u1183406): B+"));
        assert!(report.contains("(u1204977): (none)"));
    }
}
