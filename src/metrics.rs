use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::{AiAnswer, Course, Post, Thread, ThreadStatus, User};
use crate::store::Dataset;

/// Frozen reference time for the demo data set. Views and endorsements are
/// age-sensitive, so reruns against the same fixtures must share a "now".
pub const DEMO_NOW: &str = "2025-10-07T12:00:00Z";

/// Immutable id lookups built once before any metric is computed.
pub struct Indexes<'a> {
    pub courses_by_id: HashMap<&'a str, &'a Course>,
    pub users_by_id: HashMap<&'a str, &'a User>,
    pub posts_by_thread: HashMap<&'a str, Vec<&'a Post>>,
}

impl<'a> Indexes<'a> {
    pub fn build(courses: &'a [Course], users: &'a [User], posts: &'a [Post]) -> Self {
        let mut posts_by_thread: HashMap<&str, Vec<&Post>> = HashMap::new();
        for post in posts {
            posts_by_thread
                .entry(post.thread_id.as_str())
                .or_default()
                .push(post);
        }
        Indexes {
            courses_by_id: courses.iter().map(|c| (c.id.as_str(), c)).collect(),
            users_by_id: users.iter().map(|u| (u.id.as_str(), u)).collect(),
            posts_by_thread,
        }
    }
}

/// Whole days between creation and the reference time, truncated.
pub fn days_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

pub fn base_views(status: ThreadStatus, rng: &mut impl Rng) -> u32 {
    match status {
        ThreadStatus::Resolved => rng.random_range(20..=35),
        ThreadStatus::Answered => rng.random_range(15..=25),
        ThreadStatus::Open => rng.random_range(8..=15),
    }
}

/// Views grow with age, up to 2.5x after three weeks. Future-dated threads
/// (negative day counts) clamp at 1.0 instead of shrinking views.
pub fn age_factor(days: i64) -> f64 {
    (1.0 + (days as f64 / 7.0) * 0.5).clamp(1.0, 2.5)
}

pub fn course_size_factor(enrollment: u32) -> f64 {
    if enrollment < 35 {
        0.8
    } else if enrollment <= 50 {
        1.0
    } else {
        1.3
    }
}

/// Multiplicative richness score in [1.0, 2.25]. Each bonus is independent.
pub fn quality_factor(
    thread: &Thread,
    thread_posts: &[&Post],
    users_by_id: &HashMap<&str, &User>,
) -> f64 {
    let mut score = 0.0;

    if thread.has_ai_answer {
        score += 0.3;
    }
    if !thread_posts.is_empty() {
        score += 0.2;
    }
    if thread_posts.iter().any(|p| p.endorsed) {
        score += 0.3;
    }
    let instructor_replied = thread_posts.iter().any(|p| {
        users_by_id
            .get(p.author_id.as_str())
            .is_some_and(|u| u.role == "instructor")
    });
    if instructor_replied {
        score += 0.2;
    }
    if thread.status == ThreadStatus::Resolved {
        score += 0.25;
    }

    1.0 + score
}

pub fn thread_views(
    thread: &Thread,
    course: &Course,
    thread_posts: &[&Post],
    users_by_id: &HashMap<&str, &User>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> u32 {
    let days = days_since(thread.created_at, now);
    let base = base_views(thread.status, rng) as f64;

    let calculated = base
        * age_factor(days)
        * quality_factor(thread, thread_posts, users_by_id)
        * course_size_factor(course.enrollment_count);

    (calculated as u32).min(200)
}

/// Confidence-tiered student endorsement estimate. High-confidence answers
/// convert views into endorsements at a higher rate; low-confidence answers
/// get at most a stray endorsement or two.
pub fn student_endorsements(answer: &AiAnswer, views: u32, rng: &mut impl Rng) -> u32 {
    let confidence = answer.confidence_score;
    let views = views as f64;

    let raw = if confidence >= 85.0 {
        (confidence / 100.0) * (views / 10.0) * rng.random_range(0.3..0.6)
    } else if confidence >= 60.0 {
        (confidence / 100.0) * (views / 20.0) * rng.random_range(0.2..0.4)
    } else {
        rng.random_range(0.0..2.0)
    };

    raw.max(0.0) as u32
}

/// Instructor endorsement gate: high confidence, at least two strong
/// citations, a day of age, some visibility, and a 40% draw.
pub fn instructor_endorses(
    answer: &AiAnswer,
    views: u32,
    days_old: i64,
    rng: &mut impl Rng,
) -> bool {
    if answer.confidence_score < 80.0 {
        return false;
    }
    let quality_citations = answer
        .citations
        .iter()
        .filter(|c| c.relevance >= 80.0)
        .count();
    if quality_citations < 2 {
        return false;
    }
    if days_old < 1 {
        return false;
    }
    if views < 20 {
        return false;
    }
    rng.random_bool(0.4)
}

/// Instructor endorsement pulls extra students along with it.
pub fn total_endorsements(student: u32, instructor: u32) -> u32 {
    let mut total = student + instructor;
    if instructor > 0 {
        total += (student as f64 * 0.3) as u32;
    }
    total
}

/// Recomputes every derived engagement field in place. Thread views first,
/// then AI-answer endorsements, which depend on the views just computed.
pub fn apply(dataset: &mut Dataset, now: DateTime<Utc>, rng: &mut impl Rng) -> anyhow::Result<()> {
    let Dataset {
        threads,
        posts,
        ai_answers,
        courses,
        users,
    } = dataset;

    let indexes = Indexes::build(courses, users, posts);

    println!("Calculating thread views...");
    for thread in threads.iter_mut() {
        let course = indexes
            .courses_by_id
            .get(thread.course_id.as_str())
            .with_context(|| {
                format!(
                    "thread {} references missing course {}",
                    thread.id, thread.course_id
                )
            })?;
        let thread_posts = indexes
            .posts_by_thread
            .get(thread.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let views = thread_views(thread, course, thread_posts, &indexes.users_by_id, now, rng);
        thread.views = views;
        println!("  {}: {} views", thread.id, views);
    }

    let thread_stats: HashMap<&str, (u32, i64)> = threads
        .iter()
        .map(|t| (t.id.as_str(), (t.views, days_since(t.created_at, now))))
        .collect();

    println!("\nCalculating AI answer endorsements...");
    for answer in ai_answers.iter_mut() {
        let &(views, days_old) = thread_stats
            .get(answer.thread_id.as_str())
            .with_context(|| {
                format!(
                    "AI answer {} references missing thread {}",
                    answer.id, answer.thread_id
                )
            })?;

        let student = student_endorsements(answer, views, rng);
        let instructor = u32::from(instructor_endorses(answer, views, days_old, rng));

        answer.student_endorsements = student;
        answer.instructor_endorsements = instructor;
        answer.instructor_endorsed = instructor > 0;
        answer.total_endorsements = total_endorsements(student, instructor);

        println!(
            "  {}: {} student, {} instructor, {} total",
            answer.id, student, instructor, answer.total_endorsements
        );
    }

    Ok(())
}
