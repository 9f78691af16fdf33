//! Course authoring: turns raw admin editor state into validated course and
//! chapter payloads, and builds requests for AI-assisted text.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::LearningBackend;
use crate::domain::{
  Chapter, ChapterId, Course, CourseStatus, Difficulty, PracticalExercise, QuestionType,
  QuizQuestion,
};
use crate::error::WorkflowError;
use crate::protocol::{ContentType, GenerateContentRequest};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthoringError {
  #[error("Please fill in all required fields (missing: {})", .0.join(", "))]
  MissingFields(Vec<&'static str>),

  #[error("Chapter title is required")]
  MissingChapterTitle,

  #[error("Chapter {0} is not part of this course")]
  UnknownChapter(ChapterId),

  #[error("Chapter {0} is missing from the new order")]
  MissingChapter(ChapterId),

  #[error("Chapter {0} appears more than once in the new order")]
  DuplicateChapter(ChapterId),

  #[error("Please add at least one question with two or more options")]
  QuizWithoutQuestions,

  #[error("Please add instructions for at least one exercise")]
  PracticalWithoutInstructions,
}

/// Lower-case, drop everything but word characters, spaces and hyphens, then
/// join words with single hyphens.
pub fn generate_slug(text: &str) -> String {
  let cleaned: String = text
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
    .map(|c| if c.is_whitespace() { '-' } else { c })
    .collect();
  cleaned
    .split('-')
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-")
}

pub fn split_tags(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

/// Course editor fields as typed.
#[derive(Debug, Clone, Default)]
pub struct CourseForm {
  pub title: String,
  /// Left empty, the slug is derived from the title.
  pub slug: String,
  pub subtitle: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub estimated_duration: Option<u32>,
  pub tags: String,
  pub prerequisites: String,
  pub status: CourseStatus,
  pub featured: bool,
}

impl CourseForm {
  pub fn into_course(self, id: i64) -> Result<Course, AuthoringError> {
    let title = self.title.trim().to_string();
    let slug = if self.slug.trim().is_empty() {
      generate_slug(&title)
    } else {
      generate_slug(&self.slug)
    };
    let description = self.description.trim().to_string();

    let missing: Vec<&'static str> = [("title", &title), ("slug", &slug), ("description", &description)]
      .into_iter()
      .filter(|(_, v)| v.is_empty())
      .map(|(name, _)| name)
      .collect();
    if !missing.is_empty() {
      return Err(AuthoringError::MissingFields(missing));
    }

    Ok(Course {
      id,
      title,
      subtitle: self.subtitle.trim().to_string(),
      slug,
      description,
      difficulty: self.difficulty,
      estimated_duration: self.estimated_duration,
      tags: split_tags(&self.tags),
      prerequisites: self.prerequisites,
      status: self.status,
      featured: self.featured,
      chapters: Vec::new(),
    })
  }
}

#[derive(Debug, Clone, Default)]
pub struct OptionInput {
  pub text: String,
  pub correct: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionInput {
  pub text: String,
  pub kind: QuestionType,
  pub options: Vec<OptionInput>,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseInput {
  pub instructions: String,
  pub starter_code: String,
  pub evaluation_criteria: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChapterForm {
  pub title: String,
  pub chapter_number: u32,
  pub estimated_duration: Option<u32>,
  pub difficulty: Difficulty,
  pub objectives: Vec<String>,
  pub content: String,
  pub has_quiz: bool,
  pub has_practical: bool,
  pub questions: Vec<QuestionInput>,
  pub exercises: Vec<ExerciseInput>,
}

pub fn collect_objectives(raw: &[String]) -> Vec<String> {
  raw
    .iter()
    .map(|o| o.trim())
    .filter(|o| !o.is_empty())
    .map(str::to_string)
    .collect()
}

/// Questions without text or with fewer than two non-empty options are
/// dropped. The correct index refers to the kept options; if the marked
/// option was itself empty the first option becomes correct.
pub fn collect_questions(inputs: &[QuestionInput]) -> Vec<QuizQuestion> {
  inputs
    .iter()
    .filter_map(|q| {
      let text = q.text.trim();
      if text.is_empty() {
        return None;
      }
      if q.kind == QuestionType::TrueFalse {
        // "True" unless the second option is the one marked correct.
        let answer = !q.options.get(1).is_some_and(|o| o.correct);
        return Some(QuizQuestion::true_false(text, answer));
      }

      let mut options = Vec::new();
      let mut correct_answer = 0;
      for opt in &q.options {
        let t = opt.text.trim();
        if t.is_empty() {
          continue;
        }
        if opt.correct {
          correct_answer = options.len();
        }
        options.push(t.to_string());
      }
      if options.len() < 2 {
        debug!(target: "authoring", question = text, "dropping question with fewer than two options");
        return None;
      }
      Some(QuizQuestion {
        question: text.to_string(),
        kind: QuestionType::MultipleChoice,
        options,
        correct_answer,
      })
    })
    .collect()
}

pub fn collect_exercises(inputs: &[ExerciseInput]) -> Vec<PracticalExercise> {
  let non_empty = |s: &str| {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
  };
  inputs
    .iter()
    .filter_map(|e| {
      let instructions = non_empty(&e.instructions)?;
      Some(PracticalExercise {
        instructions,
        starter_code: non_empty(&e.starter_code),
        evaluation_criteria: non_empty(&e.evaluation_criteria),
      })
    })
    .collect()
}

impl ChapterForm {
  /// Quiz questions and exercises are only collected when the matching
  /// requirement is switched on. A switched-on requirement must keep at least
  /// one usable question or exercise after cleanup.
  pub fn into_chapter(self, id: ChapterId, course_id: i64) -> Result<Chapter, AuthoringError> {
    let title = self.title.trim().to_string();
    if title.is_empty() {
      return Err(AuthoringError::MissingChapterTitle);
    }
    let quiz_questions = if self.has_quiz { collect_questions(&self.questions) } else { Vec::new() };
    if self.has_quiz && quiz_questions.is_empty() {
      return Err(AuthoringError::QuizWithoutQuestions);
    }
    let practical_exercises =
      if self.has_practical { collect_exercises(&self.exercises) } else { Vec::new() };
    if self.has_practical && practical_exercises.is_empty() {
      return Err(AuthoringError::PracticalWithoutInstructions);
    }
    Ok(Chapter {
      id,
      course_id,
      title,
      chapter_number: self.chapter_number.max(1),
      estimated_duration: self.estimated_duration,
      difficulty: self.difficulty,
      learning_objectives: collect_objectives(&self.objectives),
      content: self.content,
      has_quiz: self.has_quiz,
      has_practical: self.has_practical,
      quiz_questions,
      practical_exercises,
      ..Default::default()
    })
  }
}

/// Apply a drag-and-drop order: `order` must name every chapter exactly once.
/// The course is left untouched when it does not.
pub fn reorder_chapters(course: &mut Course, order: &[ChapterId]) -> Result<(), AuthoringError> {
  let mut seen = HashSet::new();
  if let Some(dup) = order.iter().find(|id| !seen.insert(**id)) {
    return Err(AuthoringError::DuplicateChapter(*dup));
  }
  if let Some(unknown) = order.iter().find(|id| course.chapter(**id).is_none()) {
    return Err(AuthoringError::UnknownChapter(*unknown));
  }
  if let Some(missing) = course.chapters.iter().find(|c| !order.contains(&c.id)) {
    return Err(AuthoringError::MissingChapter(missing.id));
  }
  for ch in &mut course.chapters {
    if let Some(pos) = order.iter().position(|id| *id == ch.id) {
      ch.chapter_number = pos as u32 + 1;
    }
  }
  course.chapters.sort_by_key(|c| c.chapter_number);
  Ok(())
}

/// Editor state the content generator gets as context.
#[derive(Debug, Clone, Default)]
pub struct AuthoringContext<'a> {
  pub course: Option<&'a CourseForm>,
  pub chapter: Option<&'a ChapterForm>,
}

const DEFAULT_COURSE_HOURS: u32 = 8;

pub fn content_request(
  kind: ContentType,
  ctx: &AuthoringContext<'_>,
  current_text: impl Into<String>,
) -> GenerateContentRequest {
  let mut context = Map::new();
  if let Some(c) = ctx.course {
    context.insert("title".into(), Value::from(c.title.clone()));
    context.insert("subtitle".into(), Value::from(c.subtitle.clone()));
    context.insert("difficulty".into(), Value::from(c.difficulty.as_str()));
    context.insert(
      "estimated_duration".into(),
      Value::from(c.estimated_duration.unwrap_or(DEFAULT_COURSE_HOURS)),
    );
  }
  if let Some(ch) = ctx.chapter {
    context.insert("chapter_title".into(), Value::from(ch.title.clone()));
    if let Some(c) = ctx.course {
      context.insert("course_title".into(), Value::from(c.title.clone()));
    }
    context.insert("chapter_number".into(), Value::from(ch.chapter_number.max(1)));
    if let Some(first) = ch.exercises.first() {
      context.insert("practical_instructions".into(), Value::from(first.instructions.clone()));
    }
    if matches!(kind, ContentType::PracticalInstructions | ContentType::PracticalEvaluationCriteria) {
      context.insert("learning_objectives".into(), Value::from(collect_objectives(&ch.objectives)));
    }
  }
  GenerateContentRequest { kind, context, current_text: current_text.into() }
}

/// Generated objectives come back as a JSON array of strings; anything else is
/// taken as one objective.
pub fn parse_objectives(content: &str) -> Vec<String> {
  match serde_json::from_str::<Vec<String>>(content) {
    Ok(list) => collect_objectives(&list),
    Err(_) => vec![content.to_string()],
  }
}

pub async fn generate_objectives(
  backend: &dyn LearningBackend,
  ctx: &AuthoringContext<'_>,
) -> Result<Vec<String>, WorkflowError> {
  let req = content_request(ContentType::ChapterObjectives, ctx, "");
  let content = backend.generate_content(&req).await?;
  Ok(parse_objectives(&content))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::mock::MockBackend;
  use crate::domain::fixtures;

  fn opt(text: &str, correct: bool) -> OptionInput {
    OptionInput { text: text.into(), correct }
  }

  #[test]
  fn slug_rules() {
    assert_eq!(generate_slug("Intro to Rust!"), "intro-to-rust");
    assert_eq!(generate_slug("  A -- B  "), "a-b");
    assert_eq!(generate_slug("C++ & You"), "c-you");
    assert_eq!(generate_slug("snake_case ok"), "snake_case-ok");
  }

  #[test]
  fn course_form_requires_title_slug_description() {
    let err = CourseForm { title: "  ".into(), ..Default::default() }.into_course(1).unwrap_err();
    assert_eq!(err, AuthoringError::MissingFields(vec!["title", "slug", "description"]));

    let course = CourseForm {
      title: "Python Basics".into(),
      description: "Start here".into(),
      tags: "python, beginner,, ".into(),
      ..Default::default()
    }
    .into_course(3)
    .unwrap();
    assert_eq!(course.slug, "python-basics");
    assert_eq!(course.tags, vec!["python", "beginner"]);
  }

  #[test]
  fn questions_are_cleaned_up() {
    let questions = collect_questions(&[
      QuestionInput {
        text: "Pick the loop".into(),
        kind: QuestionType::MultipleChoice,
        options: vec![opt("if", false), opt("", false), opt("for", true)],
      },
      QuestionInput { text: "   ".into(), options: vec![opt("a", true), opt("b", false)], ..Default::default() },
      QuestionInput { text: "Only one".into(), options: vec![opt("a", true), opt(" ", false)], ..Default::default() },
      QuestionInput {
        text: "Rust is memory safe".into(),
        kind: QuestionType::TrueFalse,
        options: vec![opt("yes", false), opt("no", true)],
      },
    ]);

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].options, vec!["if", "for"]);
    assert_eq!(questions[0].correct_answer, 1);
    assert_eq!(questions[1].options, vec!["True", "False"]);
    assert_eq!(questions[1].correct_answer, 1);
    assert!(questions.iter().all(QuizQuestion::is_well_formed));
  }

  #[test]
  fn chapter_form_ignores_disabled_sections() {
    let form = ChapterForm {
      title: "Loops".into(),
      chapter_number: 2,
      objectives: vec![" iterate ".into(), "".into()],
      has_quiz: false,
      has_practical: true,
      questions: vec![QuestionInput {
        text: "q".into(),
        options: vec![opt("a", true), opt("b", false)],
        ..Default::default()
      }],
      exercises: vec![
        ExerciseInput { instructions: "Sum a list".into(), starter_code: " ".into(), ..Default::default() },
        ExerciseInput { instructions: "".into(), starter_code: "x = 1".into(), ..Default::default() },
      ],
      ..Default::default()
    };
    let ch = form.into_chapter(5, 1).unwrap();
    assert_eq!(ch.learning_objectives, vec!["iterate"]);
    assert!(ch.quiz_questions.is_empty());
    assert_eq!(ch.practical_exercises.len(), 1);
    assert_eq!(ch.practical_exercises[0].starter_code, None);
    assert!(ch.check_invariants().is_ok());

    assert_eq!(
      ChapterForm::default().into_chapter(6, 1).unwrap_err(),
      AuthoringError::MissingChapterTitle
    );
  }

  #[test]
  fn reorder_renumbers_and_validates() {
    let mut course = fixtures::three_chapter_course();
    reorder_chapters(&mut course, &[30, 10, 20]).unwrap();
    let order: Vec<_> = course.chapters.iter().map(|c| (c.id, c.chapter_number)).collect();
    assert_eq!(order, vec![(30, 1), (10, 2), (20, 3)]);

    assert_eq!(reorder_chapters(&mut course, &[30, 10, 99]), Err(AuthoringError::UnknownChapter(99)));
    assert_eq!(reorder_chapters(&mut course, &[30, 10]), Err(AuthoringError::MissingChapter(20)));
  }

  #[test]
  fn reorder_rejects_repeated_chapters() {
    let mut course = fixtures::three_chapter_course();
    assert_eq!(
      reorder_chapters(&mut course, &[10, 10, 20, 30]),
      Err(AuthoringError::DuplicateChapter(10))
    );
    let order: Vec<_> = course.chapters.iter().map(|c| (c.id, c.chapter_number)).collect();
    assert_eq!(order, vec![(10, 1), (20, 2), (30, 3)]);
  }

  #[test]
  fn enabled_requirements_need_usable_content() {
    let quiz = ChapterForm {
      title: "Loops".into(),
      has_quiz: true,
      questions: vec![QuestionInput {
        text: "Which keyword loops?".into(),
        options: vec![opt("for", true), opt(" ", false)],
        ..Default::default()
      }],
      ..Default::default()
    };
    assert_eq!(quiz.into_chapter(7, 1).unwrap_err(), AuthoringError::QuizWithoutQuestions);

    let practical = ChapterForm {
      title: "Loops".into(),
      has_practical: true,
      exercises: vec![ExerciseInput { instructions: "  ".into(), starter_code: "x = 1".into(), ..Default::default() }],
      ..Default::default()
    };
    assert_eq!(
      practical.into_chapter(8, 1).unwrap_err(),
      AuthoringError::PracticalWithoutInstructions
    );
  }

  #[test]
  fn practical_requests_carry_objectives() {
    let course = CourseForm { title: "Rust".into(), ..Default::default() };
    let chapter = ChapterForm {
      title: "Ownership".into(),
      chapter_number: 3,
      objectives: vec!["borrow".into()],
      ..Default::default()
    };
    let ctx = AuthoringContext { course: Some(&course), chapter: Some(&chapter) };

    let req = content_request(ContentType::PracticalInstructions, &ctx, "draft");
    assert_eq!(req.context["course_title"], "Rust");
    assert_eq!(req.context["estimated_duration"], 8);
    assert_eq!(req.context["learning_objectives"], serde_json::json!(["borrow"]));

    let req = content_request(ContentType::ChapterContent, &ctx, "");
    assert!(!req.context.contains_key("learning_objectives"));
  }

  #[test]
  fn objectives_fall_back_to_raw_text() {
    assert_eq!(parse_objectives(r#"["a", " ", "b"]"#), vec!["a", "b"]);
    assert_eq!(parse_objectives("Understand loops"), vec!["Understand loops"]);
  }

  #[tokio::test]
  async fn generated_objectives_go_through_the_backend() {
    let backend = MockBackend::new(fixtures::three_chapter_course());
    backend.set_generated_content(r#"["Write a loop", "Use break"]"#);
    let chapter = ChapterForm { title: "Loops".into(), ..Default::default() };
    let ctx = AuthoringContext { course: None, chapter: Some(&chapter) };
    let objectives = generate_objectives(&backend, &ctx).await.unwrap();
    assert_eq!(objectives, vec!["Write a loop", "Use break"]);
  }
}
