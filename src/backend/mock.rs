//! In-memory backend for tests and local demos.
//!
//! Grades quizzes against the course's own answer key, stores completions in
//! memory, and can be told to fail specific calls.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{AuthToken, LearningBackend};
use crate::domain::{ChapterId, Course, CourseId};
use crate::error::WorkflowError;
use crate::protocol::{
    ChapterProgress, ExecuteCodeRequest, GenerateContentRequest, MarkCompleteReceipt,
    MarkCompleteRequest, PracticalGrade, PracticalSubmissionRequest, ProgressMap, QuizGrade,
    QuizSubmissionRequest,
};

pub const PASS_MARK: u8 = 70;

#[derive(Default)]
struct Inner {
    progress: ProgressMap,
    practical_passes: bool,
    fail_mark_complete: usize,
    fail_progress: bool,
    quiz_calls: usize,
    practical_calls: usize,
    execute_calls: usize,
    progress_loads: usize,
    mark_complete_calls: Vec<MarkCompleteRequest>,
    generated: String,
}

pub struct MockBackend {
    course: Course,
    inner: Mutex<Inner>,
}

impl MockBackend {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            inner: Mutex::new(Inner { practical_passes: true, ..Default::default() }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn seed_completed(&self, course_id: CourseId, chapter_id: ChapterId) {
        self.lock()
            .progress
            .entry(course_id)
            .or_default()
            .insert(chapter_id, ChapterProgress { completed: true, ..Default::default() });
    }

    pub fn set_practical_passes(&self, passes: bool) {
        self.lock().practical_passes = passes;
    }

    /// The next `n` mark-complete calls answer HTTP 500.
    pub fn fail_next_mark_complete(&self, n: usize) {
        self.lock().fail_mark_complete = n;
    }

    pub fn fail_progress_loads(&self, fail: bool) {
        self.lock().fail_progress = fail;
    }

    pub fn set_generated_content(&self, content: impl Into<String>) {
        self.lock().generated = content.into();
    }

    pub fn quiz_calls(&self) -> usize {
        self.lock().quiz_calls
    }

    pub fn practical_calls(&self) -> usize {
        self.lock().practical_calls
    }

    pub fn execute_calls(&self) -> usize {
        self.lock().execute_calls
    }

    pub fn progress_load_count(&self) -> usize {
        self.lock().progress_loads
    }

    pub fn mark_complete_calls(&self) -> Vec<MarkCompleteRequest> {
        self.lock().mark_complete_calls.clone()
    }

    /// Total outbound calls of any kind.
    pub fn network_calls(&self) -> usize {
        let g = self.lock();
        g.quiz_calls + g.practical_calls + g.execute_calls + g.progress_loads + g.mark_complete_calls.len()
    }
}

#[async_trait]
impl LearningBackend for MockBackend {
    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, WorkflowError> {
        if course_id != self.course.id {
            return Err(WorkflowError::Remote("Course not found".into()));
        }
        self.course.clone().normalize().map_err(WorkflowError::Malformed)
    }

    async fn submit_quiz(
        &self,
        _token: Option<&AuthToken>,
        request: &QuizSubmissionRequest,
    ) -> Result<QuizGrade, WorkflowError> {
        self.lock().quiz_calls += 1;
        let chapter = self
            .course
            .chapter(request.chapter_id)
            .ok_or_else(|| WorkflowError::Remote("Chapter not found".into()))?;
        let total = chapter.quiz_questions.len().max(1);
        let correct = chapter
            .quiz_questions
            .iter()
            .zip(request.answers.as_slice())
            .filter(|(q, a)| q.correct_answer == **a)
            .count();
        let score = ((correct * 100) as f64 / total as f64).round() as u8;
        let passed = score >= PASS_MARK;
        Ok(QuizGrade {
            score,
            passed,
            feedback: format!("{correct}/{total} correct"),
        })
    }

    async fn submit_practical(
        &self,
        _token: Option<&AuthToken>,
        _request: &PracticalSubmissionRequest,
    ) -> Result<PracticalGrade, WorkflowError> {
        let mut g = self.lock();
        g.practical_calls += 1;
        let passed = g.practical_passes;
        Ok(PracticalGrade {
            evaluation: if passed { "**Result:** PASS".into() } else { "**Result:** NEEDS WORK".into() },
            passed,
        })
    }

    async fn mark_complete(
        &self,
        _token: &AuthToken,
        request: &MarkCompleteRequest,
    ) -> Result<MarkCompleteReceipt, WorkflowError> {
        let mut g = self.lock();
        g.mark_complete_calls.push(request.clone());
        if g.fail_mark_complete > 0 {
            g.fail_mark_complete -= 1;
            return Err(WorkflowError::Http { status: 500, message: None });
        }

        let chapters = g.progress.entry(request.course_id).or_default();
        let entry = chapters.entry(request.chapter_id).or_default();
        entry.completed = true;
        entry.test_score = request.test_score.or(entry.test_score);

        let course_completed = request.course_id == self.course.id
            && self
                .course
                .chapters
                .iter()
                .all(|ch| chapters.get(&ch.id).map(|p| p.completed).unwrap_or(false));
        Ok(MarkCompleteReceipt {
            course_completed,
            certificate_url: course_completed
                .then(|| format!("/tutorials/certificate/{}", request.course_id)),
        })
    }

    async fn load_progress(&self, _token: &AuthToken) -> Result<ProgressMap, WorkflowError> {
        let mut g = self.lock();
        g.progress_loads += 1;
        if g.fail_progress {
            return Err(WorkflowError::Network("connection reset".into()));
        }
        Ok(g.progress.clone())
    }

    async fn execute_code(&self, request: &ExecuteCodeRequest) -> Result<String, WorkflowError> {
        self.lock().execute_calls += 1;
        Ok(format!("ran {} bytes of {}", request.code.len(), request.language.as_str()))
    }

    async fn generate_content(&self, _request: &GenerateContentRequest) -> Result<String, WorkflowError> {
        Ok(self.lock().generated.clone())
    }
}
