//! Derives what the course page shows from the progress cache: chapter rows,
//! the progress indicator, previous/next navigation and action buttons.
//!
//! Navigation is never gated by completion; completion is display-only here.

use serde::Serialize;

use crate::domain::{ChapterId, Course};
use crate::gate::Requirements;
use crate::progress::{CompletionRatio, ProgressStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Untouched,
    Active,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChapterRow {
    pub chapter_id: ChapterId,
    pub chapter_number: u32,
    pub title: String,
    pub state: RowState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressIndicator {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl From<CompletionRatio> for ProgressIndicator {
    fn from(r: CompletionRatio) -> Self {
        Self { completed: r.completed, total: r.total, percent: r.percent() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NavControls {
    pub previous: Option<ChapterId>,
    pub next: Option<ChapterId>,
}

impl NavControls {
    pub fn can_go_back(&self) -> bool {
        self.previous.is_some()
    }

    pub fn can_go_forward(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChapterActions {
    pub take_quiz: bool,
    pub start_practical: bool,
    /// Offered to signed-in learners whose session meets the completion rule
    /// for an explicit action: always for ungated chapters, and for gated
    /// chapters once every requirement passed (retry after a failed send).
    pub mark_complete: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CourseView {
    pub course_id: i64,
    pub rows: Vec<ChapterRow>,
    pub progress: ProgressIndicator,
    pub nav: NavControls,
    pub actions: ChapterActions,
}

/// Inputs besides the progress cache.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewContext {
    pub current: Option<ChapterId>,
    pub signed_in: bool,
    /// The session's markers satisfy the completion rule for a user action.
    pub eligible: bool,
}

pub fn row_state(completed: bool, active: bool) -> RowState {
    match (completed, active) {
        (true, _) => RowState::Completed,
        (false, true) => RowState::Active,
        (false, false) => RowState::Untouched,
    }
}

/// `course.chapters` must already be in `chapter_number` order
/// (`Course::normalize`).
pub fn reconcile(course: &Course, store: &ProgressStore, ctx: ViewContext) -> CourseView {
    let rows = course
        .chapters
        .iter()
        .map(|ch| ChapterRow {
            chapter_id: ch.id,
            chapter_number: ch.chapter_number,
            title: ch.title.clone(),
            state: row_state(store.is_completed(course.id, ch.id), ctx.current == Some(ch.id)),
        })
        .collect();

    let position = ctx.current.and_then(|id| course.position_of(id));
    let nav = match position {
        Some(i) => NavControls {
            previous: i.checked_sub(1).map(|p| course.chapters[p].id),
            next: course.chapters.get(i + 1).map(|c| c.id),
        },
        None => NavControls::default(),
    };

    let actions = ctx
        .current
        .and_then(|id| course.chapter(id))
        .map(|ch| {
            let reqs = Requirements::of(ch);
            ChapterActions {
                take_quiz: reqs.quiz,
                start_practical: reqs.practical,
                mark_complete: ctx.signed_in
                    && ctx.eligible
                    && !store.is_completed(course.id, ch.id),
            }
        })
        .unwrap_or_default();

    CourseView {
        course_id: course.id,
        rows,
        progress: store.course_completion_ratio(course).into(),
        nav,
        actions,
    }
}
