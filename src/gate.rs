//! Completion gating for a single chapter page lifetime.
//!
//! `RequirementState` holds the session-scoped pass markers. It is created
//! fresh whenever a chapter is (re)loaded and never persisted; only a
//! remote-confirmed completion outlives it.

use serde::Serialize;
use tracing::debug;

use crate::domain::{Chapter, ChapterId};
use crate::protocol::{PracticalGrade, QuizGrade};

/// What caused a completion re-check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    PageLoad,
    QuizPassed,
    PracticalPassed,
    /// Explicit "mark complete" from the learner.
    UserAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub quiz: bool,
    pub practical: bool,
}

impl Requirements {
    pub fn of(chapter: &Chapter) -> Self {
        Self { quiz: chapter.has_quiz, practical: chapter.has_practical }
    }

    pub fn is_empty(self) -> bool {
        !self.quiz && !self.practical
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequirementState {
    chapter_id: ChapterId,
    requirements: Requirements,
    quiz_passed: bool,
    practical_passed: bool,
}

impl RequirementState {
    /// Markers for requirements the chapter does not declare start satisfied;
    /// declared ones start unset.
    pub fn fresh(chapter: &Chapter) -> Self {
        let requirements = Requirements::of(chapter);
        Self {
            chapter_id: chapter.id,
            requirements,
            quiz_passed: !requirements.quiz,
            practical_passed: !requirements.practical,
        }
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    pub fn requirements(&self) -> Requirements {
        self.requirements
    }

    pub fn quiz_passed(&self) -> bool {
        self.quiz_passed
    }

    pub fn practical_passed(&self) -> bool {
        self.practical_passed
    }

    /// Returns the trigger for a re-check when the attempt passed; a failed
    /// attempt leaves the markers untouched so the learner can retry.
    pub fn record_quiz(&mut self, grade: &QuizGrade) -> Option<TriggerSource> {
        if !grade.passed {
            return None;
        }
        self.quiz_passed = true;
        debug!(target: "gate", chapter_id = self.chapter_id, score = grade.score, "quiz marker set");
        Some(TriggerSource::QuizPassed)
    }

    pub fn record_practical(&mut self, grade: &PracticalGrade) -> Option<TriggerSource> {
        if !grade.passed {
            return None;
        }
        self.practical_passed = true;
        debug!(target: "gate", chapter_id = self.chapter_id, "practical marker set");
        Some(TriggerSource::PracticalPassed)
    }

    /// The completion rule. A chapter without requirements is only ever
    /// completed by something other than a page load; a gated chapter needs
    /// every declared marker set in this session, in any order.
    pub fn is_eligible(&self, trigger: TriggerSource) -> bool {
        if self.requirements.is_empty() {
            return trigger != TriggerSource::PageLoad;
        }
        let quiz_ok = !self.requirements.quiz || self.quiz_passed;
        let practical_ok = !self.requirements.practical || self.practical_passed;
        quiz_ok && practical_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures;

    fn quiz(passed: bool) -> QuizGrade {
        QuizGrade { score: if passed { 100 } else { 0 }, passed, feedback: String::new() }
    }

    fn practical(passed: bool) -> PracticalGrade {
        PracticalGrade { evaluation: String::new(), passed }
    }

    #[test]
    fn ungated_chapter_never_completes_on_page_load() {
        let state = RequirementState::fresh(&fixtures::chapter(1, 1, false, false));
        assert!(state.quiz_passed() && state.practical_passed());
        assert!(!state.is_eligible(TriggerSource::PageLoad));
        assert!(state.is_eligible(TriggerSource::UserAction));
    }

    #[test]
    fn fresh_markers_are_unset_for_declared_requirements() {
        let state = RequirementState::fresh(&fixtures::chapter(1, 1, true, true));
        assert!(!state.quiz_passed());
        assert!(!state.practical_passed());
        assert!(!state.is_eligible(TriggerSource::PageLoad));
        assert!(!state.is_eligible(TriggerSource::UserAction));
    }

    #[test]
    fn both_gates_needed_in_any_order() {
        let ch = fixtures::chapter(1, 1, true, true);

        let mut a = RequirementState::fresh(&ch);
        let t = a.record_quiz(&quiz(true)).unwrap();
        assert!(!a.is_eligible(t));
        let t = a.record_practical(&practical(true)).unwrap();
        assert!(a.is_eligible(t));

        let mut b = RequirementState::fresh(&ch);
        let t = b.record_practical(&practical(true)).unwrap();
        assert!(!b.is_eligible(t));
        let t = b.record_quiz(&quiz(true)).unwrap();
        assert!(b.is_eligible(t));
    }

    #[test]
    fn failed_attempts_leave_markers_alone() {
        let mut state = RequirementState::fresh(&fixtures::chapter(1, 1, true, false));
        assert_eq!(state.record_quiz(&quiz(false)), None);
        assert!(!state.quiz_passed());
        assert_eq!(state.record_quiz(&quiz(true)), Some(TriggerSource::QuizPassed));
        assert!(state.is_eligible(TriggerSource::QuizPassed));
    }

    #[test]
    fn reload_discards_previous_passes() {
        let ch = fixtures::chapter(1, 1, true, false);
        let mut state = RequirementState::fresh(&ch);
        state.record_quiz(&quiz(true));
        assert!(state.quiz_passed());

        let state = RequirementState::fresh(&ch);
        assert!(!state.quiz_passed());
        assert!(!state.is_eligible(TriggerSource::PageLoad));
    }
}
