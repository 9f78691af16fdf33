//! Client-side cache of course → chapter → completion.
//!
//! The backend owns the data. `load` degrades to "nothing known" on any
//! failure, and `mark_complete` only touches the cache after the backend has
//! confirmed the write.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backend::{AuthToken, LearningBackend};
use crate::domain::{ChapterId, Course, CourseId};
use crate::error::WorkflowError;
use crate::protocol::{ChapterProgress, MarkCompleteReceipt, MarkCompleteRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionRatio {
    pub completed: usize,
    pub total: usize,
}

impl CompletionRatio {
    /// Rounded to the nearest whole percent; 0 for a course without chapters.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }

    pub fn is_complete(self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProgressStore {
    courses: HashMap<CourseId, HashMap<ChapterId, ChapterProgress>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached progress for `course_id` with the backend's view and
    /// return chapter → completed. Anonymous learners get an empty mapping. A
    /// failed load keeps whatever was cached before.
    #[instrument(level = "info", skip_all, fields(%course_id, signed_in = token.is_some()))]
    pub async fn load(
        &mut self,
        backend: &dyn LearningBackend,
        token: Option<&AuthToken>,
        course_id: CourseId,
    ) -> HashMap<ChapterId, bool> {
        let Some(token) = token else {
            self.courses.remove(&course_id);
            return HashMap::new();
        };

        match backend.load_progress(token).await {
            Ok(mut all) => {
                let chapters = all.remove(&course_id).unwrap_or_default();
                self.courses.insert(course_id, chapters);
            }
            Err(e) => {
                warn!(target: "progress", %course_id, error = %e, "could not load progress; keeping cached state");
            }
        }
        self.completion_map(course_id)
    }

    fn completion_map(&self, course_id: CourseId) -> HashMap<ChapterId, bool> {
        self.courses
            .get(&course_id)
            .map(|chapters| chapters.iter().map(|(id, p)| (*id, p.completed)).collect())
            .unwrap_or_default()
    }

    /// Send a confirmed completion. The cache changes only on success, and
    /// completing an already-completed chapter is a successful no-op for the
    /// ratio.
    #[instrument(level = "info", skip_all, fields(course_id = request.course_id, chapter_id = request.chapter_id))]
    pub async fn mark_complete(
        &mut self,
        backend: &dyn LearningBackend,
        token: Option<&AuthToken>,
        request: &MarkCompleteRequest,
    ) -> Result<MarkCompleteReceipt, WorkflowError> {
        let token = token.ok_or(WorkflowError::Unauthenticated)?;
        let receipt = backend.mark_complete(token, request).await?;

        let entry = self
            .courses
            .entry(request.course_id)
            .or_default()
            .entry(request.chapter_id)
            .or_default();
        entry.completed = true;
        if request.test_score.is_some() {
            entry.test_score = request.test_score;
        }
        if request.practical_passed.is_some() {
            entry.practical_passed = request.practical_passed;
        }
        info!(target: "progress", course_completed = receipt.course_completed, "chapter completion confirmed");
        Ok(receipt)
    }

    pub fn is_completed(&self, course_id: CourseId, chapter_id: ChapterId) -> bool {
        self.courses
            .get(&course_id)
            .and_then(|c| c.get(&chapter_id))
            .map(|p| p.completed)
            .unwrap_or(false)
    }

    pub fn chapter(&self, course_id: CourseId, chapter_id: ChapterId) -> Option<&ChapterProgress> {
        self.courses.get(&course_id)?.get(&chapter_id)
    }

    /// Counts only chapters the course declares; the denominator is the
    /// declared chapter count, so unvisited chapters count against completion.
    pub fn course_completion_ratio(&self, course: &Course) -> CompletionRatio {
        let completed = course
            .chapters
            .iter()
            .filter(|ch| self.is_completed(course.id, ch.id))
            .count();
        CompletionRatio { completed, total: course.chapters.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::domain::fixtures;

    fn token() -> AuthToken {
        AuthToken::new("t0k3n")
    }

    fn request(chapter_id: ChapterId) -> MarkCompleteRequest {
        MarkCompleteRequest { course_id: 1, chapter_id, test_score: Some(90), practical_passed: None }
    }

    #[tokio::test]
    async fn load_failure_degrades_to_empty() {
        let backend = MockBackend::new(fixtures::three_chapter_course());
        backend.fail_progress_loads(true);
        let mut store = ProgressStore::new();
        let view = store.load(&backend, Some(&token()), 1).await;
        assert!(view.is_empty());
        assert!(!store.is_completed(1, 10));
    }

    #[tokio::test]
    async fn failed_reload_keeps_confirmed_completions() {
        let course = fixtures::three_chapter_course();
        let backend = MockBackend::new(course.clone());
        let mut store = ProgressStore::new();
        store.mark_complete(&backend, Some(&token()), &request(20)).await.unwrap();

        backend.fail_progress_loads(true);
        let view = store.load(&backend, Some(&token()), 1).await;

        assert_eq!(view.get(&20), Some(&true));
        assert!(store.is_completed(1, 20));
        assert_eq!(store.course_completion_ratio(&course), CompletionRatio { completed: 1, total: 3 });
    }

    #[tokio::test]
    async fn anonymous_load_skips_backend() {
        let backend = MockBackend::new(fixtures::three_chapter_course());
        backend.seed_completed(1, 10);
        let mut store = ProgressStore::new();
        assert!(store.load(&backend, None, 1).await.is_empty());
        assert_eq!(backend.progress_load_count(), 0);
    }

    #[tokio::test]
    async fn load_reads_only_the_requested_course() {
        let backend = MockBackend::new(fixtures::three_chapter_course());
        backend.seed_completed(1, 10);
        backend.seed_completed(2, 99);
        let mut store = ProgressStore::new();
        let view = store.load(&backend, Some(&token()), 1).await;
        assert_eq!(view.get(&10), Some(&true));
        assert!(!view.contains_key(&99));
    }

    #[tokio::test]
    async fn mark_complete_is_idempotent() {
        let course = fixtures::three_chapter_course();
        let backend = MockBackend::new(course.clone());
        let mut store = ProgressStore::new();

        store.mark_complete(&backend, Some(&token()), &request(20)).await.unwrap();
        let first = store.course_completion_ratio(&course);
        store.mark_complete(&backend, Some(&token()), &request(20)).await.unwrap();
        let second = store.course_completion_ratio(&course);

        assert_eq!(first, CompletionRatio { completed: 1, total: 3 });
        assert_eq!(first, second);
        assert_eq!(backend.mark_complete_calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_mark_complete_leaves_cache_untouched() {
        let backend = MockBackend::new(fixtures::three_chapter_course());
        backend.fail_next_mark_complete(1);
        let mut store = ProgressStore::new();

        let err = store.mark_complete(&backend, Some(&token()), &request(20)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Http { status: 500, .. }));
        assert!(!store.is_completed(1, 20));

        store.mark_complete(&backend, Some(&token()), &request(20)).await.unwrap();
        assert!(store.is_completed(1, 20));
        assert_eq!(store.chapter(1, 20).and_then(|p| p.test_score), Some(90));
    }

    #[tokio::test]
    async fn mark_complete_requires_a_token() {
        let backend = MockBackend::new(fixtures::three_chapter_course());
        let mut store = ProgressStore::new();
        let err = store.mark_complete(&backend, None, &request(20)).await.unwrap_err();
        assert_eq!(err, WorkflowError::Unauthenticated);
        assert!(backend.mark_complete_calls().is_empty());
    }

    #[test]
    fn ratio_ignores_chapters_outside_the_course() {
        let course = fixtures::three_chapter_course();
        let mut store = ProgressStore::new();
        store
            .courses
            .entry(1)
            .or_default()
            .insert(999, ChapterProgress { completed: true, ..Default::default() });
        assert_eq!(store.course_completion_ratio(&course), CompletionRatio { completed: 0, total: 3 });
        assert_eq!(CompletionRatio { completed: 1, total: 3 }.percent(), 33);
        assert_eq!(CompletionRatio { completed: 2, total: 3 }.percent(), 67);
        assert_eq!(CompletionRatio { completed: 0, total: 0 }.percent(), 0);
    }
}
