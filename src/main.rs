use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod db;
mod grades;
mod models;
mod report;
mod schedule;

#[derive(Parser)]
#[command(name = "lms-gradebook")]
#[command(about = "Grade aggregation and schedule conflict checking for the campus LMS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClassArgs {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    num: i32,
    #[arg(long)]
    season: String,
    #[arg(long)]
    year: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data and compute initial grades
    Seed,
    /// Create a class offering, rejecting schedule conflicts
    CreateClass {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long, value_parser = parse_time_of_day)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time_of_day)]
        end: NaiveTime,
        #[arg(long)]
        location: String,
        #[arg(long)]
        instructor: String,
    },
    /// Enroll a student in a class offering
    Enroll {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        student: String,
    },
    /// Create an assignment category for a class offering
    CreateCategory {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        category: String,
        #[arg(long)]
        weight: i32,
    },
    /// Create an assignment and recompute every enrolled student's grade
    CreateAssignment {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        points: i32,
        #[arg(long, value_parser = parse_due)]
        due: NaiveDateTime,
    },
    /// Score a submission and recompute that student's grade
    GradeSubmission {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        category: String,
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        score: i32,
    },
    /// Import submission scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recompute cached grades for one student or the whole class
    #[command(group(
        ArgGroup::new("scope")
            .args(["student", "all"])
            .required(true)
            .multiple(false)
    ))]
    Recompute {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Print the offering's assignments as JSON, optionally for one category
    Assignments {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the enrolled students and their cached grades as JSON
    Roster {
        #[command(flatten)]
        class: ClassArgs,
    },
    /// Generate a markdown gradebook report
    Report {
        #[command(flatten)]
        class: ClassArgs,
        #[arg(long, default_value = "gradebook.md")]
        out: PathBuf,
    },
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| format!("invalid time of day: {value} (expected HH:MM or HH:MM:SS)"))
}

fn parse_due(value: &str) -> Result<NaiveDateTime, String> {
    if let Ok(due) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(due);
    }
    // A bare date means end of day.
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 0))
        .ok_or_else(|| format!("invalid due date: {value} (expected YYYY-MM-DD [HH:MM])"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            let class = db::find_class(&pool, "CS", 5530, "Fall", 2026)
                .await?
                .context("seed class missing after seed")?;
            let recomputed = grades::recompute_class(&pool, class.class_id).await?;
            println!("Seed data inserted; {recomputed} grades computed.");
        }
        Commands::CreateClass {
            class,
            start,
            end,
            location,
            instructor,
        } => {
            let slot = schedule::TimeSlot::new(start, end);
            let created = schedule::create_offering(
                &pool,
                &class.subject,
                class.num,
                &class.season,
                class.year,
                &slot,
                &location,
                &instructor,
            )
            .await?;

            if created {
                println!(
                    "Created {} {} in {} {} at {}.",
                    class.subject, class.num, class.season, class.year, location
                );
            } else {
                println!("Rejected: conflicts with an existing offering.");
            }
        }
        Commands::Enroll { class, student } => {
            let offering = find_offering(&pool, &class).await?;
            if db::insert_enrollment(&pool, &student, offering.class_id).await? {
                println!("Enrolled {student}.");
            } else {
                println!("{student} is already enrolled.");
            }
        }
        Commands::CreateCategory {
            class,
            category,
            weight,
        } => {
            let offering = find_offering(&pool, &class).await?;
            if db::find_category(&pool, offering.class_id, &category)
                .await?
                .is_some()
            {
                println!("Rejected: a category named {category} already exists.");
            } else {
                db::insert_category(&pool, offering.class_id, &category, weight).await?;
                println!("Category {category} created with weight {weight}.");
            }
        }
        Commands::CreateAssignment {
            class,
            category,
            name,
            points,
            due,
        } => {
            let offering = find_offering(&pool, &class).await?;
            let cat = db::find_category(&pool, offering.class_id, &category)
                .await?
                .with_context(|| format!("no category {category} in this offering"))?;

            db::insert_assignment(&pool, cat.category_id, &name, points, due).await?;
            // Every category denominator changed, so every cached grade is stale.
            let recomputed = grades::recompute_class(&pool, offering.class_id).await?;
            println!("Assignment {name} created; {recomputed} grades recomputed.");
        }
        Commands::GradeSubmission {
            class,
            category,
            assignment,
            student,
            score,
        } => {
            let offering = find_offering(&pool, &class).await?;
            let asg = db::find_assignment(&pool, offering.class_id, &category, &assignment)
                .await?
                .with_context(|| format!("no assignment {category}/{assignment} in this offering"))?;

            if db::update_submission_score(&pool, &student, asg.assignment_id, score).await? {
                let grade = grades::recompute(&pool, &student, offering.class_id).await?;
                println!("Scored {score}/{points}; {student} now has {grade}.", points = asg.points);
            } else {
                println!("No submission on file for {student}.");
            }
        }
        Commands::Import { csv } => {
            let (applied, affected) = db::import_csv(&pool, &csv).await?;
            for (student, class_id) in &affected {
                grades::recompute(&pool, student, *class_id).await?;
            }
            println!(
                "Applied {applied} scores from {}; recomputed {} grades.",
                csv.display(),
                affected.len()
            );
        }
        Commands::Recompute {
            class,
            student,
            all: _,
        } => {
            // A recompute against a missing offering is nothing to do, not an error.
            let Some(offering) =
                db::find_class(&pool, &class.subject, class.num, &class.season, class.year).await?
            else {
                println!("No such offering; nothing to recompute.");
                return Ok(());
            };
            match student {
                Some(student) => {
                    let grade = grades::recompute(&pool, &student, offering.class_id).await?;
                    println!("{student}: {grade}");
                }
                None => {
                    let recomputed = grades::recompute_class(&pool, offering.class_id).await?;
                    println!("Recomputed {recomputed} grades.");
                }
            }
        }
        Commands::Assignments { class, category } => {
            let offering = find_offering(&pool, &class).await?;
            let mut listings = Vec::new();
            for cat in db::list_categories(&pool, offering.class_id).await? {
                if category.as_deref().is_some_and(|name| name != cat.name) {
                    continue;
                }
                for assignment in db::list_assignments(&pool, cat.category_id).await? {
                    listings.push(models::AssignmentListing {
                        category: cat.name.clone(),
                        name: assignment.name,
                        points: assignment.points,
                        due: assignment.due,
                    });
                }
            }
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }
        Commands::Roster { class } => {
            let offering = find_offering(&pool, &class).await?;
            let roster = db::roster(&pool, offering.class_id).await?;
            println!("{}", serde_json::to_string_pretty(&roster)?);
        }
        Commands::Report { class, out } => {
            let offering = find_offering(&pool, &class).await?;
            let course = db::find_course(&pool, &class.subject, class.num)
                .await?
                .context("course missing for an existing offering")?;
            let roster = db::roster(&pool, offering.class_id).await?;
            let categories = db::category_summaries(&pool, offering.class_id).await?;

            let report = report::build_report(&course, &offering, &roster, &categories);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn find_offering(
    pool: &sqlx::PgPool,
    class: &ClassArgs,
) -> anyhow::Result<models::ClassRow> {
    db::find_class(pool, &class.subject, class.num, &class.season, class.year)
        .await?
        .with_context(|| {
            format!(
                "no offering of {} {} in {} {}",
                class.subject, class.num, class.season, class.year
            )
        })
}
