use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AssignmentRow, CategoryRow, CategorySummary, ClassRow, CourseRow, RosterEntry, SubmissionRow,
};
use crate::schedule::TimeSlot;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn find_course(
    pool: &PgPool,
    subject: &str,
    num: i32,
) -> anyhow::Result<Option<CourseRow>> {
    let row = sqlx::query(
        "SELECT id, listing, num, name FROM gradebook.courses WHERE listing = $1 AND num = $2",
    )
    .bind(subject)
    .bind(num)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CourseRow {
        course_id: row.get("id"),
        listing: row.get("listing"),
        num: row.get("num"),
        name: row.get("name"),
    }))
}

pub async fn find_class(
    pool: &PgPool,
    subject: &str,
    num: i32,
    season: &str,
    year: i32,
) -> anyhow::Result<Option<ClassRow>> {
    let row = sqlx::query(
        "SELECT cl.id, cl.season, cl.semester_year, cl.location, \
         cl.start_time, cl.end_time \
         FROM gradebook.classes cl \
         JOIN gradebook.courses co ON co.id = cl.course_id \
         WHERE co.listing = $1 AND co.num = $2 AND cl.season = $3 AND cl.semester_year = $4",
    )
    .bind(subject)
    .bind(num)
    .bind(season)
    .bind(year)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ClassRow {
        class_id: row.get("id"),
        season: row.get("season"),
        semester_year: row.get("semester_year"),
        location: row.get("location"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
    }))
}

pub async fn offering_exists(
    pool: &PgPool,
    subject: &str,
    num: i32,
    season: &str,
    year: i32,
) -> anyhow::Result<bool> {
    Ok(find_class(pool, subject, num, season, year).await?.is_some())
}

pub async fn list_offerings(
    pool: &PgPool,
    season: &str,
    year: i32,
    location: &str,
) -> anyhow::Result<Vec<TimeSlot>> {
    let rows = sqlx::query(
        "SELECT start_time, end_time FROM gradebook.classes \
         WHERE season = $1 AND semester_year = $2 AND location = $3",
    )
    .bind(season)
    .bind(year)
    .bind(location)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TimeSlot::new(row.get("start_time"), row.get("end_time")))
        .collect())
}

pub async fn insert_class(
    pool: &PgPool,
    course_id: Uuid,
    season: &str,
    year: i32,
    slot: &TimeSlot,
    location: &str,
    teacher_uid: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO gradebook.classes \
         (id, course_id, season, semester_year, location, start_time, end_time, teacher_uid) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(course_id)
    .bind(season)
    .bind(year)
    .bind(location)
    .bind(slot.start)
    .bind(slot.end)
    .bind(teacher_uid)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_categories(pool: &PgPool, class_id: Uuid) -> anyhow::Result<Vec<CategoryRow>> {
    let rows = sqlx::query(
        "SELECT id, name, weight FROM gradebook.assignment_categories \
         WHERE class_id = $1 ORDER BY name",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CategoryRow {
            category_id: row.get("id"),
            name: row.get("name"),
            weight: row.get("weight"),
        })
        .collect())
}

pub async fn find_category(
    pool: &PgPool,
    class_id: Uuid,
    name: &str,
) -> anyhow::Result<Option<CategoryRow>> {
    let row = sqlx::query(
        "SELECT id, name, weight FROM gradebook.assignment_categories \
         WHERE class_id = $1 AND name = $2",
    )
    .bind(class_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CategoryRow {
        category_id: row.get("id"),
        name: row.get("name"),
        weight: row.get("weight"),
    }))
}

pub async fn insert_category(
    pool: &PgPool,
    class_id: Uuid,
    name: &str,
    weight: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO gradebook.assignment_categories (id, class_id, name, weight) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(name)
    .bind(weight)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_assignments(
    pool: &PgPool,
    category_id: Uuid,
) -> anyhow::Result<Vec<AssignmentRow>> {
    let rows = sqlx::query(
        "SELECT id, name, points, due FROM gradebook.assignments \
         WHERE category_id = $1 ORDER BY due, name",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| AssignmentRow {
            assignment_id: row.get("id"),
            name: row.get("name"),
            points: row.get("points"),
            due: row.get("due"),
        })
        .collect())
}

pub async fn find_assignment(
    pool: &PgPool,
    class_id: Uuid,
    category: &str,
    name: &str,
) -> anyhow::Result<Option<AssignmentRow>> {
    let row = sqlx::query(
        "SELECT a.id, a.name, a.points, a.due \
         FROM gradebook.assignments a \
         JOIN gradebook.assignment_categories c ON c.id = a.category_id \
         WHERE c.class_id = $1 AND c.name = $2 AND a.name = $3",
    )
    .bind(class_id)
    .bind(category)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| AssignmentRow {
        assignment_id: row.get("id"),
        name: row.get("name"),
        points: row.get("points"),
        due: row.get("due"),
    }))
}

pub async fn insert_assignment(
    pool: &PgPool,
    category_id: Uuid,
    name: &str,
    points: i32,
    due: NaiveDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO gradebook.assignments (id, category_id, name, points, due) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(name)
    .bind(points)
    .bind(due)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_submission(
    pool: &PgPool,
    student_uid: &str,
    assignment_id: Uuid,
) -> anyhow::Result<Option<SubmissionRow>> {
    let row = sqlx::query(
        "SELECT score FROM gradebook.submissions \
         WHERE student_uid = $1 AND assignment_id = $2",
    )
    .bind(student_uid)
    .bind(assignment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SubmissionRow {
        score: row.get("score"),
    }))
}

// Grading path: only touches an existing submission, so a student who never
// submitted stays distinguishable from one who scored 0.
pub async fn update_submission_score(
    pool: &PgPool,
    student_uid: &str,
    assignment_id: Uuid,
    score: i32,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE gradebook.submissions SET score = $3 \
         WHERE student_uid = $1 AND assignment_id = $2",
    )
    .bind(student_uid)
    .bind(assignment_id)
    .bind(score)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Bulk import path: creates the submission row when it is missing.
pub async fn upsert_submission_score(
    pool: &PgPool,
    student_uid: &str,
    assignment_id: Uuid,
    score: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO gradebook.submissions (student_uid, assignment_id, score) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (student_uid, assignment_id) DO UPDATE SET score = EXCLUDED.score",
    )
    .bind(student_uid)
    .bind(assignment_id)
    .bind(score)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_enrollment(
    pool: &PgPool,
    student_uid: &str,
    class_id: Uuid,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "INSERT INTO gradebook.enrollments (student_uid, class_id) \
         VALUES ($1, $2) ON CONFLICT (student_uid, class_id) DO NOTHING",
    )
    .bind(student_uid)
    .bind(class_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_enrollment_grade(
    pool: &PgPool,
    student_uid: &str,
    class_id: Uuid,
    grade: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE gradebook.enrollments SET grade = $3 \
         WHERE student_uid = $1 AND class_id = $2",
    )
    .bind(student_uid)
    .bind(class_id)
    .bind(grade)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_enrolled(pool: &PgPool, class_id: Uuid) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT student_uid FROM gradebook.enrollments WHERE class_id = $1 ORDER BY student_uid",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("student_uid")).collect())
}

pub async fn roster(pool: &PgPool, class_id: Uuid) -> anyhow::Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        "SELECT s.uid, s.fname, s.lname, e.grade \
         FROM gradebook.enrollments e \
         JOIN gradebook.students s ON s.uid = e.student_uid \
         WHERE e.class_id = $1 \
         ORDER BY s.lname, s.fname",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RosterEntry {
            uid: row.get("uid"),
            fname: row.get("fname"),
            lname: row.get("lname"),
            grade: row.get("grade"),
        })
        .collect())
}

pub async fn category_summaries(
    pool: &PgPool,
    class_id: Uuid,
) -> anyhow::Result<Vec<CategorySummary>> {
    let rows = sqlx::query(
        "SELECT c.name, c.weight, COUNT(a.id) AS assignment_count, \
         COALESCE(SUM(a.points), 0) AS total_points \
         FROM gradebook.assignment_categories c \
         LEFT JOIN gradebook.assignments a ON a.category_id = c.id \
         WHERE c.class_id = $1 \
         GROUP BY c.id, c.name, c.weight \
         ORDER BY c.weight DESC, c.name",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CategorySummary {
            name: row.get("name"),
            weight: row.get("weight"),
            assignment_count: row.get::<i64, _>("assignment_count") as usize,
            total_points: row.get("total_points"),
        })
        .collect())
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, Vec<(String, Uuid)>)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        uid: String,
        subject: String,
        num: i32,
        season: String,
        year: i32,
        category: String,
        assignment: String,
        score: i32,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut applied = 0usize;
    let mut affected: Vec<(String, Uuid)> = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let class = find_class(pool, &row.subject, row.num, &row.season, row.year)
            .await?
            .with_context(|| {
                format!(
                    "no offering of {} {} in {} {}",
                    row.subject, row.num, row.season, row.year
                )
            })?;
        let assignment = find_assignment(pool, class.class_id, &row.category, &row.assignment)
            .await?
            .with_context(|| {
                format!(
                    "no assignment {}/{} in {} {}",
                    row.category, row.assignment, row.subject, row.num
                )
            })?;

        upsert_submission_score(pool, &row.uid, assignment.assignment_id, row.score).await?;
        applied += 1;

        let key = (row.uid.clone(), class.class_id);
        if !affected.contains(&key) {
            affected.push(key);
        }
    }

    tracing::info!(applied, students = affected.len(), "imported submission scores");
    Ok((applied, affected))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO gradebook.departments (subject, name) VALUES ($1, $2) \
         ON CONFLICT (subject) DO UPDATE SET name = EXCLUDED.name",
    )
    .bind("CS")
    .bind("Computer Science")
    .execute(pool)
    .await?;

    let course_id = Uuid::parse_str("0b6d8f63-5a0e-4aa7-9c0b-7f4f1f2d8a31")?;
    sqlx::query(
        "INSERT INTO gradebook.courses (id, listing, num, name) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (listing, num) DO UPDATE SET name = EXCLUDED.name",
    )
    .bind(course_id)
    .bind("CS")
    .bind(5530)
    .bind("Database Systems")
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO gradebook.professors (uid, fname, lname, works_in) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (uid) DO UPDATE SET fname = EXCLUDED.fname, lname = EXCLUDED.lname",
    )
    .bind("u0992871")
    .bind("Marta")
    .bind("Reyes")
    .bind("CS")
    .execute(pool)
    .await?;

    let students = vec![
        ("u1183406", "Theo", "Brandt"),
        ("u1204977", "Imani", "Walsh"),
        ("u1377250", "Sofia", "Lindqvist"),
    ];

    for (uid, fname, lname) in &students {
        sqlx::query(
            "INSERT INTO gradebook.students (uid, fname, lname, major) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (uid) DO UPDATE SET fname = EXCLUDED.fname, lname = EXCLUDED.lname",
        )
        .bind(uid)
        .bind(fname)
        .bind(lname)
        .bind("CS")
        .execute(pool)
        .await?;
    }

    let class_id = Uuid::parse_str("9c6a2e84-3f9d-4a57-8a2b-5d1e0c7b4f92")?;
    sqlx::query(
        "INSERT INTO gradebook.classes \
         (id, course_id, season, semester_year, location, start_time, end_time, teacher_uid) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (course_id, season, semester_year) DO NOTHING",
    )
    .bind(class_id)
    .bind(course_id)
    .bind("Fall")
    .bind(2026)
    .bind("WEB L104")
    .bind(NaiveTime::from_hms_opt(9, 10, 0).context("invalid time")?)
    .bind(NaiveTime::from_hms_opt(10, 30, 0).context("invalid time")?)
    .bind("u0992871")
    .execute(pool)
    .await?;

    for (uid, _, _) in &students {
        insert_enrollment(pool, uid, class_id).await?;
    }

    let categories = vec![
        (
            Uuid::parse_str("4f2b9d71-8c3e-4e6a-b5d2-1a7f9e0c3b58")?,
            "Assignments",
            45,
        ),
        (
            Uuid::parse_str("7a1c5e29-6b4d-4f8e-9d3a-2c8b7f5e1a04")?,
            "Exams",
            40,
        ),
        (
            Uuid::parse_str("d3e8b1a6-2f7c-4c9b-8e5d-6a0f4b9c2e17")?,
            "Quizzes",
            15,
        ),
    ];

    for (id, name, weight) in &categories {
        sqlx::query(
            "INSERT INTO gradebook.assignment_categories (id, class_id, name, weight) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (class_id, name) DO UPDATE SET weight = EXCLUDED.weight",
        )
        .bind(id)
        .bind(class_id)
        .bind(name)
        .bind(weight)
        .execute(pool)
        .await?;
    }

    let assignments = vec![
        (
            Uuid::parse_str("1e9d4c7b-5a2f-4b8d-9c6e-3f0a8d5b2c74")?,
            categories[0].0,
            "HW1",
            100,
            date_time(2026, 9, 4, 23, 59)?,
        ),
        (
            Uuid::parse_str("6c3f8a2d-9e1b-4d7f-8b4a-5c2e9f6a1d38")?,
            categories[0].0,
            "HW2",
            100,
            date_time(2026, 9, 18, 23, 59)?,
        ),
        (
            Uuid::parse_str("b8a5d2f9-4c7e-4a1b-9f6d-0e3c8b5a7f21")?,
            categories[1].0,
            "Midterm",
            100,
            date_time(2026, 10, 9, 10, 30)?,
        ),
        (
            Uuid::parse_str("f4b7e1c8-3d6a-4e9f-b2c5-8a1d7e4f0b63")?,
            categories[2].0,
            "Quiz 1",
            20,
            date_time(2026, 9, 11, 9, 10)?,
        ),
    ];

    for (id, category_id, name, points, due) in &assignments {
        sqlx::query(
            "INSERT INTO gradebook.assignments (id, category_id, name, points, due) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (category_id, name) DO UPDATE \
             SET points = EXCLUDED.points, due = EXCLUDED.due",
        )
        .bind(id)
        .bind(category_id)
        .bind(name)
        .bind(points)
        .bind(due)
        .execute(pool)
        .await?;
    }

    // Imani's HW2 is submitted but not yet graded; the Quiz 1 row for that
    // student is deliberately absent.
    let submissions: Vec<(&str, Uuid, Option<i32>)> = vec![
        ("u1183406", assignments[0].0, Some(92)),
        ("u1183406", assignments[1].0, Some(88)),
        ("u1183406", assignments[2].0, Some(81)),
        ("u1183406", assignments[3].0, Some(18)),
        ("u1204977", assignments[0].0, Some(75)),
        ("u1204977", assignments[1].0, None),
        ("u1204977", assignments[2].0, Some(90)),
        ("u1377250", assignments[0].0, Some(100)),
        ("u1377250", assignments[1].0, Some(97)),
        ("u1377250", assignments[2].0, Some(94)),
        ("u1377250", assignments[3].0, Some(20)),
    ];

    for (uid, assignment_id, score) in submissions {
        sqlx::query(
            "INSERT INTO gradebook.submissions (student_uid, assignment_id, score) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (student_uid, assignment_id) DO UPDATE SET score = EXCLUDED.score",
        )
        .bind(uid)
        .bind(assignment_id)
        .bind(score)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn date_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> anyhow::Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .context("invalid date")
}
