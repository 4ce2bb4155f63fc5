use anyhow::Context;
use chrono::NaiveTime;
use sqlx::PgPool;

use crate::db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    // Half-open [start, end): a class ending exactly when another starts
    // does not conflict.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub fn conflicts_with_any(occupied: &[TimeSlot], proposed: &TimeSlot) -> bool {
    occupied.iter().any(|slot| slot.overlaps(proposed))
}

pub async fn can_create(
    pool: &PgPool,
    subject: &str,
    num: i32,
    season: &str,
    year: i32,
    slot: &TimeSlot,
    location: &str,
) -> anyhow::Result<bool> {
    // A course may be offered at most once per semester, regardless of
    // time or location.
    if db::offering_exists(pool, subject, num, season, year).await? {
        tracing::debug!(
            subject,
            num,
            season,
            year,
            "offering rejected: course already offered this semester"
        );
        return Ok(false);
    }

    let occupied = db::list_offerings(pool, season, year, location).await?;
    if conflicts_with_any(&occupied, slot) {
        tracing::debug!(
            subject,
            num,
            season,
            year,
            location,
            "offering rejected: location occupied during that window"
        );
        return Ok(false);
    }

    Ok(true)
}

pub async fn create_offering(
    pool: &PgPool,
    subject: &str,
    num: i32,
    season: &str,
    year: i32,
    slot: &TimeSlot,
    location: &str,
    instructor: &str,
) -> anyhow::Result<bool> {
    if !can_create(pool, subject, num, season, year, slot, location).await? {
        return Ok(false);
    }

    let course = db::find_course(pool, subject, num)
        .await?
        .with_context(|| format!("no course {subject} {num}"))?;
    db::insert_class(pool, course.course_id, season, year, slot, location, instructor).await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: (u32, u32), end: (u32, u32)) -> TimeSlot {
        TimeSlot::new(
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let first = slot((9, 0), (10, 0));
        let second = slot((10, 0), (11, 0));

        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn one_minute_of_overlap_conflicts() {
        let existing = slot((9, 0), (10, 0));
        let proposed = slot((9, 59), (10, 30));

        assert!(existing.overlaps(&proposed));
        assert!(proposed.overlaps(&existing));
    }

    #[test]
    fn containment_overlaps_both_ways() {
        let outer = slot((8, 0), (12, 0));
        let inner = slot((9, 30), (10, 30));

        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn identical_slots_overlap() {
        let a = slot((13, 0), (14, 15));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn disjoint_slots_do_not_overlap() {
        let morning = slot((8, 0), (9, 0));
        let afternoon = slot((14, 0), (15, 0));

        assert!(!morning.overlaps(&afternoon));
        assert!(!afternoon.overlaps(&morning));
    }

    #[test]
    fn conflict_scan_checks_every_occupied_slot() {
        let occupied = vec![slot((8, 0), (9, 0)), slot((11, 0), (12, 0))];

        assert!(!conflicts_with_any(&occupied, &slot((9, 0), (10, 0))));
        assert!(conflicts_with_any(&occupied, &slot((11, 30), (12, 30))));
        assert!(!conflicts_with_any(&[], &slot((9, 0), (10, 0))));
    }
}
