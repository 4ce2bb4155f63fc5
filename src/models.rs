use chrono::{NaiveDateTime, NaiveTime};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CourseRow {
    pub course_id: Uuid,
    pub listing: String,
    pub num: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ClassRow {
    pub class_id: Uuid,
    pub season: String,
    pub semester_year: i32,
    pub location: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub category_id: Uuid,
    pub name: String,
    pub weight: i32,
}

#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub assignment_id: Uuid,
    pub name: String,
    pub points: i32,
    pub due: NaiveDateTime,
}

/// A submission as the grade engine sees it. `score` stays `None` until the
/// submission has been graded; that is not the same thing as a score of 0.
#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub score: Option<i32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AssignmentListing {
    pub category: String,
    pub name: String,
    pub points: i32,
    pub due: NaiveDateTime,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RosterEntry {
    pub uid: String,
    pub fname: String,
    pub lname: String,
    pub grade: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub name: String,
    pub weight: i32,
    pub assignment_count: usize,
    pub total_points: i64,
}
