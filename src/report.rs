use std::fmt::Write;

use crate::models::ThreadStatus;
use crate::store::Dataset;

#[derive(Debug, Clone)]
pub struct StatusViewSummary {
    pub status: ThreadStatus,
    pub count: usize,
    pub avg_views: f64,
}

#[derive(Debug, Clone)]
pub struct EngagementSummary {
    pub thread_count: usize,
    pub min_views: u32,
    pub max_views: u32,
    pub avg_views: f64,
    pub by_status: Vec<StatusViewSummary>,
    pub endorsed_posts: usize,
    pub post_count: usize,
    pub instructor_endorsed_answers: usize,
    pub answer_count: usize,
}

pub fn summarize(dataset: &Dataset) -> EngagementSummary {
    let mut by_status: Vec<StatusViewSummary> = Vec::new();
    for status in [
        ThreadStatus::Open,
        ThreadStatus::Answered,
        ThreadStatus::Resolved,
    ] {
        let views: Vec<u32> = dataset
            .threads
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.views)
            .collect();
        if views.is_empty() {
            continue;
        }
        by_status.push(StatusViewSummary {
            status,
            count: views.len(),
            avg_views: views.iter().sum::<u32>() as f64 / views.len() as f64,
        });
    }

    let total_views: u32 = dataset.threads.iter().map(|t| t.views).sum();

    EngagementSummary {
        thread_count: dataset.threads.len(),
        min_views: dataset.threads.iter().map(|t| t.views).min().unwrap_or(0),
        max_views: dataset.threads.iter().map(|t| t.views).max().unwrap_or(0),
        avg_views: if dataset.threads.is_empty() {
            0.0
        } else {
            total_views as f64 / dataset.threads.len() as f64
        },
        by_status,
        endorsed_posts: dataset.posts.iter().filter(|p| p.endorsed).count(),
        post_count: dataset.posts.len(),
        instructor_endorsed_answers: dataset
            .ai_answers
            .iter()
            .filter(|a| a.instructor_endorsed)
            .count(),
        answer_count: dataset.ai_answers.len(),
    }
}

fn status_label(status: ThreadStatus) -> &'static str {
    match status {
        ThreadStatus::Open => "open",
        ThreadStatus::Answered => "answered",
        ThreadStatus::Resolved => "resolved",
    }
}

fn ratio_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn build_report(summary: &EngagementSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Engagement Metrics Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Thread Views");

    if summary.thread_count == 0 {
        let _ = writeln!(output, "No threads in the fixture set.");
    } else {
        let _ = writeln!(
            output,
            "- {} threads, {}-{} views (avg {:.0})",
            summary.thread_count, summary.min_views, summary.max_views, summary.avg_views
        );
        for status in &summary.by_status {
            let _ = writeln!(
                output,
                "- {}: {} threads (avg {:.0} views)",
                status_label(status.status),
                status.count,
                status.avg_views
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Endorsements");
    let _ = writeln!(
        output,
        "- Endorsed posts: {}/{} ({:.1}%)",
        summary.endorsed_posts,
        summary.post_count,
        ratio_percent(summary.endorsed_posts, summary.post_count)
    );
    let _ = writeln!(
        output,
        "- AI answers with instructor endorsement: {}/{}",
        summary.instructor_endorsed_answers, summary.answer_count
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AiAnswer, Course, Post, Thread, User};
    use std::collections::BTreeMap;

    fn dataset() -> Dataset {
        let thread = |id: &str, status: ThreadStatus, views: u32| Thread {
            id: id.to_string(),
            course_id: "c-1".to_string(),
            status,
            created_at: "2025-09-20T08:00:00Z".parse().unwrap(),
            has_ai_answer: false,
            views,
            extra: BTreeMap::new(),
        };
        Dataset {
            threads: vec![
                thread("t-1", ThreadStatus::Resolved, 120),
                thread("t-2", ThreadStatus::Resolved, 80),
                thread("t-3", ThreadStatus::Open, 10),
            ],
            posts: vec![Post {
                id: "p-1".to_string(),
                thread_id: "t-1".to_string(),
                author_id: "u-1".to_string(),
                endorsed: true,
                extra: BTreeMap::new(),
            }],
            ai_answers: vec![AiAnswer {
                id: "a-1".to_string(),
                thread_id: "t-1".to_string(),
                confidence_score: 90.0,
                citations: vec![],
                student_endorsements: 2,
                instructor_endorsements: 1,
                instructor_endorsed: true,
                total_endorsements: 3,
                extra: BTreeMap::new(),
            }],
            courses: vec![Course {
                id: "c-1".to_string(),
                enrollment_count: 40,
                extra: BTreeMap::new(),
            }],
            users: vec![User {
                id: "u-1".to_string(),
                role: "instructor".to_string(),
                extra: BTreeMap::new(),
            }],
        }
    }

    #[test]
    fn summarize_aggregates_views_and_ratios() {
        let summary = summarize(&dataset());
        assert_eq!(summary.thread_count, 3);
        assert_eq!(summary.min_views, 10);
        assert_eq!(summary.max_views, 120);
        assert!((summary.avg_views - 70.0).abs() < 1e-9);
        assert_eq!(summary.by_status.len(), 2);
        assert_eq!(summary.endorsed_posts, 1);
        assert_eq!(summary.instructor_endorsed_answers, 1);
    }

    #[test]
    fn report_lists_each_section() {
        let report = build_report(&summarize(&dataset()));
        assert!(report.contains("# Engagement Metrics Report"));
        assert!(report.contains("3 threads, 10-120 views (avg 70)"));
        assert!(report.contains("resolved: 2 threads (avg 100 views)"));
        assert!(report.contains("Endorsed posts: 1/1 (100.0%)"));
        assert!(report.contains("instructor endorsement: 1/1"));
    }
}
