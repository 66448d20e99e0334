use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{AiAnswer, Course, Post, Thread, User};

pub const THREADS_FILE: &str = "threads.json";
pub const POSTS_FILE: &str = "posts.json";
pub const AI_ANSWERS_FILE: &str = "ai-answers.json";
pub const COURSES_FILE: &str = "courses.json";
pub const USERS_FILE: &str = "users.json";

#[derive(Debug, Clone)]
pub struct Dataset {
    pub threads: Vec<Thread>,
    pub posts: Vec<Post>,
    pub ai_answers: Vec<AiAnswer>,
    pub courses: Vec<Course>,
    pub users: Vec<User>,
}

pub fn load(dir: &Path) -> anyhow::Result<Dataset> {
    Ok(Dataset {
        threads: read_records(&dir.join(THREADS_FILE))?,
        posts: read_records(&dir.join(POSTS_FILE))?,
        ai_answers: read_records(&dir.join(AI_ANSWERS_FILE))?,
        courses: read_records(&dir.join(COURSES_FILE))?,
        users: read_records(&dir.join(USERS_FILE))?,
    })
}

fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes threads, posts, and AI answers back to their source files.
///
/// All three outputs are staged as `.tmp` siblings first and only renamed
/// over the originals once every stage succeeded, so a failure mid-run
/// leaves the fixture set as it was. Courses and users are never rewritten.
pub fn write_back(dir: &Path, dataset: &Dataset) -> anyhow::Result<()> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();

    let result = stage(dir.join(THREADS_FILE), &dataset.threads, &mut staged)
        .and_then(|_| stage(dir.join(POSTS_FILE), &dataset.posts, &mut staged))
        .and_then(|_| stage(dir.join(AI_ANSWERS_FILE), &dataset.ai_answers, &mut staged));

    if let Err(err) = result {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }
        return Err(err);
    }

    for (tmp, dest) in &staged {
        fs::rename(tmp, dest)
            .with_context(|| format!("failed to commit {}", dest.display()))?;
    }

    Ok(())
}

fn stage<T: Serialize>(
    dest: PathBuf,
    records: &[T],
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> anyhow::Result<()> {
    // Matches the fixtures' existing formatting (2-space indent).
    let json = serde_json::to_vec_pretty(records)
        .with_context(|| format!("failed to serialize {}", dest.display()))?;
    let tmp = dest.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to stage {}", tmp.display()))?;
    staged.push((tmp, dest));
    Ok(())
}

/// Checks referential integrity across the fixture set: posts and AI
/// answers must point at existing threads, threads at existing courses.
/// Returns one human-readable line per dangling reference.
pub fn dangling_references(dataset: &Dataset) -> Vec<String> {
    let thread_ids: std::collections::HashSet<&str> =
        dataset.threads.iter().map(|t| t.id.as_str()).collect();
    let course_ids: std::collections::HashSet<&str> =
        dataset.courses.iter().map(|c| c.id.as_str()).collect();

    let mut problems = Vec::new();

    for thread in &dataset.threads {
        if !course_ids.contains(thread.course_id.as_str()) {
            problems.push(format!(
                "thread {} references missing course {}",
                thread.id, thread.course_id
            ));
        }
    }
    for post in &dataset.posts {
        if !thread_ids.contains(post.thread_id.as_str()) {
            problems.push(format!(
                "post {} references missing thread {}",
                post.id, post.thread_id
            ));
        }
    }
    for answer in &dataset.ai_answers {
        if !thread_ids.contains(answer.thread_id.as_str()) {
            problems.push(format!(
                "AI answer {} references missing thread {}",
                answer.id, answer.thread_id
            ));
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path, name: &str, json: &str) {
        fs::write(dir.join(name), json).unwrap();
    }

    fn seed_fixtures(dir: &Path) {
        write_fixture(
            dir,
            THREADS_FILE,
            r#"[{"id": "t-1", "courseId": "c-1", "status": "resolved",
                "createdAt": "2025-09-20T08:00:00Z", "hasAIAnswer": true,
                "title": "How do I submit?"}]"#,
        );
        write_fixture(
            dir,
            POSTS_FILE,
            r#"[{"id": "p-1", "threadId": "t-1", "authorId": "u-1",
                "endorsed": true, "content": "Use the portal."}]"#,
        );
        write_fixture(
            dir,
            AI_ANSWERS_FILE,
            r#"[{"id": "a-1", "threadId": "t-1", "confidenceScore": 90,
                "citations": [{"relevance": 95, "source": "syllabus"}]}]"#,
        );
        write_fixture(
            dir,
            COURSES_FILE,
            r#"[{"id": "c-1", "enrollmentCount": 60, "name": "Intro Bio"}]"#,
        );
        write_fixture(
            dir,
            USERS_FILE,
            r#"[{"id": "u-1", "role": "instructor", "name": "Dr. Ellis"}]"#,
        );
    }

    #[test]
    fn load_keeps_unmodeled_fields() {
        let dir = tempfile::tempdir().unwrap();
        seed_fixtures(dir.path());

        let dataset = load(dir.path()).unwrap();
        assert_eq!(dataset.threads[0].extra["title"], "How do I submit?");
        assert_eq!(dataset.courses[0].extra["name"], "Intro Bio");
        assert_eq!(dataset.ai_answers[0].citations[0].extra["source"], "syllabus");
    }

    #[test]
    fn write_back_round_trips_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        seed_fixtures(dir.path());

        let mut dataset = load(dir.path()).unwrap();
        dataset.threads[0].views = 146;
        write_back(dir.path(), &dataset).unwrap();

        let reloaded = load(dir.path()).unwrap();
        assert_eq!(reloaded.threads[0].views, 146);
        assert_eq!(reloaded.threads[0].extra["title"], "How do I submit?");
        assert_eq!(reloaded.posts[0].extra["content"], "Use the portal.");
    }

    #[test]
    fn write_back_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        seed_fixtures(dir.path());

        let dataset = load(dir.path()).unwrap();
        write_back(dir.path(), &dataset).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn dangling_references_reports_each_break() {
        let dir = tempfile::tempdir().unwrap();
        seed_fixtures(dir.path());
        write_fixture(
            dir.path(),
            POSTS_FILE,
            r#"[{"id": "p-9", "threadId": "t-missing", "authorId": "u-1"}]"#,
        );

        let dataset = load(dir.path()).unwrap();
        let problems = dangling_references(&dataset);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("t-missing"));
    }

    #[test]
    fn clean_fixtures_have_no_dangling_references() {
        let dir = tempfile::tempdir().unwrap();
        seed_fixtures(dir.path());

        let dataset = load(dir.path()).unwrap();
        assert!(dangling_references(&dataset).is_empty());
    }
}
