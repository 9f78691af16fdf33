//! Domain models: courses, chapters, quiz questions and practical exercises.
//!
//! Wire names follow the tutorials backend. The older `has_test` /
//! `test_questions` names are accepted as aliases.

use serde::{Deserialize, Serialize};

pub type CourseId = i64;
pub type ChapterId = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
  #[default]
  Draft,
  Published,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  #[default]
  #[serde(alias = "multiple-choice")]
  MultipleChoice,
  #[serde(alias = "true-false")]
  TrueFalse,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub question: String,
  #[serde(rename = "type", default)]
  pub kind: QuestionType,
  pub options: Vec<String>,
  #[serde(default)]
  pub correct_answer: usize,
}

impl QuizQuestion {
  pub const TRUE_FALSE_OPTIONS: [&'static str; 2] = ["True", "False"];

  pub fn true_false(question: impl Into<String>, answer: bool) -> Self {
    Self {
      question: question.into(),
      kind: QuestionType::TrueFalse,
      options: Self::TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect(),
      correct_answer: if answer { 0 } else { 1 },
    }
  }

  /// At least two options, a correct index that points at one of them, and
  /// exactly "True"/"False" for true-false questions.
  pub fn is_well_formed(&self) -> bool {
    if self.options.len() < 2 || self.correct_answer >= self.options.len() {
      return false;
    }
    match self.kind {
      QuestionType::TrueFalse => self.options == Self::TRUE_FALSE_OPTIONS,
      QuestionType::MultipleChoice => true,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticalExercise {
  pub instructions: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub starter_code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub evaluation_criteria: Option<String>,
}

/// Older single-exercise fields still present on some stored chapters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyPractical {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub practical_instructions: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub practical_starter_code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub practical_evaluation_criteria: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
  pub id: ChapterId,
  #[serde(default)]
  pub course_id: CourseId,
  pub title: String,
  pub chapter_number: u32,
  /// Minutes.
  #[serde(default)]
  pub estimated_duration: Option<u32>,
  #[serde(default)]
  pub difficulty: Difficulty,
  #[serde(default)]
  pub learning_objectives: Vec<String>,
  /// Opaque HTML from the rich-text editor.
  #[serde(default)]
  pub content: String,
  #[serde(default, alias = "has_test")]
  pub has_quiz: bool,
  #[serde(default)]
  pub has_practical: bool,
  #[serde(default, alias = "test_questions")]
  pub quiz_questions: Vec<QuizQuestion>,
  #[serde(default)]
  pub practical_exercises: Vec<PracticalExercise>,
  #[serde(flatten)]
  pub legacy: LegacyPractical,
}

impl Chapter {
  /// Fold the legacy single-exercise fields into `practical_exercises`.
  /// Called once when a chapter crosses the wire; gating never looks at the
  /// legacy fields.
  pub fn migrate_legacy_practical(&mut self) {
    let legacy = std::mem::take(&mut self.legacy);
    if !self.practical_exercises.is_empty() {
      return;
    }
    let instructions = legacy.practical_instructions.unwrap_or_default();
    if instructions.trim().is_empty() {
      return;
    }
    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    self.practical_exercises.push(PracticalExercise {
      instructions,
      starter_code: non_empty(legacy.practical_starter_code),
      evaluation_criteria: non_empty(legacy.practical_evaluation_criteria),
    });
  }

  /// Declared assessment requirements hold: a quiz has at least one
  /// well-formed question, a practical has at least one exercise with
  /// instructions.
  pub fn check_invariants(&self) -> Result<(), String> {
    if self.has_quiz {
      if self.quiz_questions.is_empty() {
        return Err(format!("chapter {} declares a quiz without questions", self.id));
      }
      if let Some(i) = self.quiz_questions.iter().position(|q| !q.is_well_formed()) {
        return Err(format!("chapter {} question {} is malformed", self.id, i + 1));
      }
    }
    if self.has_practical
      && !self.practical_exercises.iter().any(|e| !e.instructions.trim().is_empty())
    {
      return Err(format!("chapter {} declares a practical without instructions", self.id));
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: CourseId,
  pub title: String,
  #[serde(default)] pub subtitle: String,
  #[serde(default)] pub slug: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub difficulty: Difficulty,
  /// Hours.
  #[serde(default)] pub estimated_duration: Option<u32>,
  #[serde(default)] pub tags: Vec<String>,
  #[serde(default)] pub prerequisites: String,
  #[serde(default)] pub status: CourseStatus,
  #[serde(default)] pub featured: bool,
  #[serde(default)] pub chapters: Vec<Chapter>,
}

impl Course {
  /// Sort chapters by `chapter_number`, migrate legacy practical fields and
  /// verify numbering and assessment invariants.
  pub fn normalize(mut self) -> Result<Self, String> {
    self.chapters.sort_by_key(|c| c.chapter_number);
    for pair in self.chapters.windows(2) {
      if pair[0].chapter_number == pair[1].chapter_number {
        return Err(format!(
          "course {} has two chapters numbered {}",
          self.id, pair[0].chapter_number
        ));
      }
    }
    for ch in &mut self.chapters {
      ch.migrate_legacy_practical();
      if ch.course_id == 0 {
        ch.course_id = self.id;
      }
      ch.check_invariants()?;
    }
    Ok(self)
  }

  pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
    self.chapters.iter().find(|c| c.id == id)
  }

  pub fn position_of(&self, id: ChapterId) -> Option<usize> {
    self.chapters.iter().position(|c| c.id == id)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn accepts_legacy_field_names() {
    let ch: Chapter = serde_json::from_value(json!({
      "id": 7,
      "title": "Loops",
      "chapter_number": 2,
      "has_test": true,
      "test_questions": [
        { "question": "2+2?", "type": "multiple_choice", "options": ["3", "4"], "correct_answer": 1 }
      ],
      "has_practical": true,
      "practical_instructions": "Write a for loop",
      "practical_starter_code": ""
    }))
    .unwrap();

    assert!(ch.has_quiz);
    assert_eq!(ch.quiz_questions.len(), 1);

    let course = Course { id: 3, title: "C".into(), chapters: vec![ch], ..Default::default() }
      .normalize()
      .unwrap();
    let ch = &course.chapters[0];
    assert_eq!(ch.course_id, 3);
    assert_eq!(ch.practical_exercises.len(), 1);
    assert_eq!(ch.practical_exercises[0].instructions, "Write a for loop");
    assert_eq!(ch.practical_exercises[0].starter_code, None);
  }

  #[test]
  fn normalize_orders_by_chapter_number() {
    let course = Course {
      id: 1,
      title: "T".into(),
      chapters: vec![
        fixtures::chapter(3, 3, false, false),
        fixtures::chapter(1, 1, false, false),
        fixtures::chapter(2, 2, false, false),
      ],
      ..Default::default()
    }
    .normalize()
    .unwrap();
    let ids: Vec<_> = course.chapters.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
  }

  #[test]
  fn normalize_rejects_duplicate_numbers_and_empty_gates() {
    let dup = Course {
      id: 1,
      title: "T".into(),
      chapters: vec![fixtures::chapter(1, 1, false, false), fixtures::chapter(2, 1, false, false)],
      ..Default::default()
    };
    assert!(dup.normalize().is_err());

    let mut quizless = fixtures::chapter(1, 1, true, false);
    quizless.quiz_questions.clear();
    assert!(quizless.check_invariants().is_err());

    let mut blank = fixtures::chapter(1, 1, false, true);
    blank.practical_exercises[0].instructions = "   ".into();
    assert!(blank.check_invariants().is_err());
  }

  #[test]
  fn true_false_questions_have_fixed_options() {
    let q = QuizQuestion::true_false("Rust has a GC", false);
    assert!(q.is_well_formed());
    assert_eq!(q.correct_answer, 1);

    let bad = QuizQuestion { options: vec!["Yes".into(), "No".into()], ..q };
    assert!(!bad.is_well_formed());
  }
}
