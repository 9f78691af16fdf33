//! One chapter page lifetime.
//!
//! A `ChapterSession` owns everything the page used to keep in globals: the
//! course, the open chapter, its requirement markers, the progress cache, the
//! auth token and the editor language. It is driven by one task, so every
//! mutation goes through `&mut self` and requests are handled one at a time.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backend::{AuthToken, LearningBackend};
use crate::collector::{
    collect_practical_submission, collect_quiz_answers, Language, PracticalForm, QuizForm,
};
use crate::domain::{Chapter, ChapterId, Course, CourseId};
use crate::error::{ValidationError, WorkflowError};
use crate::gate::{RequirementState, TriggerSource};
use crate::progress::ProgressStore;
use crate::protocol::{
    ExecuteCodeRequest, MarkCompleteRequest, PracticalGrade, PracticalSubmissionRequest, QuizGrade,
    QuizSubmissionRequest,
};
use crate::reconcile::{reconcile, CourseView, ViewContext};
use crate::selection::Selection;

/// What a completion check ended in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    /// Requirements not (yet) met for this trigger.
    Ineligible,
    /// The backend confirmed the completion.
    Recorded {
        course_completed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        certificate_url: Option<String>,
    },
    /// Eligible, but nobody is signed in; nothing was sent.
    Anonymous,
    /// The mark-complete call failed; the cache is unchanged.
    Failed { message: String, retryable: bool },
}

impl Completion {
    pub fn course_completed(&self) -> Option<Option<String>> {
        match self {
            Completion::Recorded { course_completed: true, certificate_url } => {
                Some(certificate_url.clone())
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizOutcome {
    pub grade: QuizGrade,
    pub completion: Completion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticalOutcome {
    pub grade: PracticalGrade,
    pub completion: Completion,
}

pub struct ChapterSession {
    backend: Arc<dyn LearningBackend>,
    token: Option<AuthToken>,
    course: Course,
    chapter_id: ChapterId,
    requirements: RequirementState,
    progress: ProgressStore,
    language: Selection<Language>,
    practical: PracticalForm,
    last_quiz_score: Option<u8>,
}

impl ChapterSession {
    /// Fetch the course, load progress and run the page-load check.
    #[instrument(level = "info", skip(backend, token), fields(signed_in = token.is_some()))]
    pub async fn open(
        backend: Arc<dyn LearningBackend>,
        token: Option<AuthToken>,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<(Self, Completion), WorkflowError> {
        let course = backend.fetch_course(course_id).await?;
        let mut session = Self::from_parts(backend, token, course, chapter_id)?;
        let completion = session.start().await;
        Ok((session, completion))
    }

    /// A session over an already-fetched course. Nothing is loaded yet.
    pub fn from_parts(
        backend: Arc<dyn LearningBackend>,
        token: Option<AuthToken>,
        course: Course,
        chapter_id: ChapterId,
    ) -> Result<Self, WorkflowError> {
        let chapter = course
            .chapter(chapter_id)
            .ok_or_else(|| WorkflowError::Remote("Chapter not found".into()))?;
        let requirements = RequirementState::fresh(chapter);
        let language = Language::default();
        Ok(Self {
            backend,
            token,
            course,
            chapter_id,
            requirements,
            progress: ProgressStore::new(),
            language: Selection::new(language),
            practical: PracticalForm::new(language),
            last_quiz_score: None,
        })
    }

    async fn start(&mut self) -> Completion {
        self.progress
            .load(self.backend.as_ref(), self.token.as_ref(), self.course.id)
            .await;
        self.check_completion(TriggerSource::PageLoad).await
    }

    /// Same as reopening the page: markers are discarded and progress is
    /// reloaded. Only a backend-confirmed completion survives.
    pub async fn reload(&mut self) -> Completion {
        self.requirements = RequirementState::fresh(self.chapter());
        self.last_quiz_score = None;
        self.start().await
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    fn chapter(&self) -> &Chapter {
        // from_parts guarantees the chapter exists and the course never changes.
        &self.course.chapters[self.course.position_of(self.chapter_id).unwrap_or_default()]
    }

    pub fn requirement_state(&self) -> &RequirementState {
        &self.requirements
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn language(&self) -> &Selection<Language> {
        &self.language
    }

    pub fn practical_form(&self) -> &PracticalForm {
        &self.practical
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.progress.is_completed(self.course.id, self.chapter_id)
    }

    pub fn view(&self) -> CourseView {
        reconcile(
            &self.course,
            &self.progress,
            ViewContext {
                current: Some(self.chapter_id),
                signed_in: self.is_signed_in(),
                eligible: self.requirements.is_eligible(TriggerSource::UserAction),
            },
        )
    }

    /// Validate the form, have the backend grade it and re-check completion
    /// on a pass. Nothing is sent when validation fails.
    #[instrument(level = "info", skip_all, fields(chapter_id = self.chapter_id))]
    pub async fn submit_quiz(&mut self, form: &QuizForm) -> Result<QuizOutcome, WorkflowError> {
        let answers = collect_quiz_answers(self.chapter(), form)?;
        let request = QuizSubmissionRequest {
            course_id: self.course.id,
            chapter_id: self.chapter_id,
            answers,
        };
        let grade = self.backend.submit_quiz(self.token.as_ref(), &request).await?;
        info!(target: "tutor", score = grade.score, passed = grade.passed, "quiz graded");

        let completion = match self.requirements.record_quiz(&grade) {
            Some(trigger) => {
                self.last_quiz_score = Some(grade.score);
                self.check_completion(trigger).await
            }
            None => Completion::Ineligible,
        };
        Ok(QuizOutcome { grade, completion })
    }

    /// Replace the editor content as typed by the learner. The language is
    /// taken as-is; the code is not reset to the starter.
    pub fn edit_practical(&mut self, code: impl Into<String>, language: Language) {
        self.practical.code = code.into();
        self.practical.language = language;
        self.language.select(language);
    }

    #[instrument(level = "info", skip_all, fields(chapter_id = self.chapter_id, language = self.practical.language.as_str()))]
    pub async fn submit_practical(&mut self) -> Result<PracticalOutcome, WorkflowError> {
        let submission = collect_practical_submission(&self.practical)?;
        let request = PracticalSubmissionRequest {
            course_id: self.course.id,
            chapter_id: self.chapter_id,
            code: submission.code,
            language: submission.language,
        };
        let grade = self.backend.submit_practical(self.token.as_ref(), &request).await?;
        info!(target: "tutor", passed = grade.passed, "practical graded");

        let completion = match self.requirements.record_practical(&grade) {
            Some(trigger) => self.check_completion(trigger).await,
            None => Completion::Ineligible,
        };
        Ok(PracticalOutcome { grade, completion })
    }

    /// Explicit "mark complete". Also serves as the retry after a failed
    /// completion of a gated chapter, since the markers are still set.
    pub async fn mark_complete(&mut self) -> Completion {
        self.check_completion(TriggerSource::UserAction).await
    }

    /// Run code in the sandbox without grading it.
    pub async fn run_code(&self, code: &str, language: Language) -> Result<String, WorkflowError> {
        if code.trim().is_empty() {
            return Err(ValidationError::EmptyCode.into());
        }
        let request = ExecuteCodeRequest { code: code.to_string(), language };
        self.backend.execute_code(&request).await
    }

    /// Switch the editor language. Returns the starter code now in the editor,
    /// or `None` when the language was already selected.
    pub fn select_language(&mut self, language: Language) -> Option<&'static str> {
        if !self.language.select(language) {
            return None;
        }
        self.practical.switch_language(language);
        Some(language.starter_code())
    }

    async fn check_completion(&mut self, trigger: TriggerSource) -> Completion {
        if !self.requirements.is_eligible(trigger) {
            return Completion::Ineligible;
        }
        if self.token.is_none() {
            info!(target: "tutor", chapter_id = self.chapter_id, "eligible but anonymous; not recording");
            return Completion::Anonymous;
        }

        let reqs = self.requirements.requirements();
        let request = MarkCompleteRequest {
            course_id: self.course.id,
            chapter_id: self.chapter_id,
            test_score: if reqs.quiz { self.last_quiz_score } else { None },
            practical_passed: reqs.practical.then_some(self.requirements.practical_passed()),
        };

        match self
            .progress
            .mark_complete(self.backend.as_ref(), self.token.as_ref(), &request)
            .await
        {
            Ok(receipt) => Completion::Recorded {
                course_completed: receipt.course_completed,
                certificate_url: receipt.certificate_url,
            },
            Err(e) => {
                warn!(target: "tutor", ?trigger, error = %e, "mark-complete failed");
                Completion::Failed { message: e.user_message(), retryable: e.is_retryable() }
            }
        }
    }
}
