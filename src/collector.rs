//! Assessment collection: turns quiz selections and practical editor state
//! into normalized submissions. Pure; no I/O.

use serde::{Deserialize, Serialize};

use crate::domain::Chapter;
use crate::error::ValidationError;

/// Radio-button state of a quiz: one optional selection per question.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizForm {
    selections: Vec<Option<usize>>,
}

impl QuizForm {
    /// Empty form sized to the chapter's questions.
    pub fn for_chapter(chapter: &Chapter) -> Self {
        Self { selections: vec![None; chapter.quiz_questions.len()] }
    }

    pub fn from_selections(selections: Vec<Option<usize>>) -> Self {
        Self { selections }
    }

    pub fn select(&mut self, question: usize, option: usize) {
        if question >= self.selections.len() {
            self.selections.resize(question + 1, None);
        }
        self.selections[question] = Some(option);
    }

    /// Retake: clear every selection.
    pub fn clear(&mut self) {
        self.selections.iter_mut().for_each(|s| *s = None);
    }

    /// `(question index, selected option)` for each declared question.
    pub fn answers(&self, question_count: usize) -> Vec<(usize, Option<usize>)> {
        (0..question_count)
            .map(|i| (i, self.selections.get(i).copied().flatten()))
            .collect()
    }
}

/// One selected option index per question, in question order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuizAnswers(Vec<usize>);

impl QuizAnswers {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Every declared question must have exactly one in-range selection; there is
/// no partial submission.
pub fn collect_quiz_answers(
    chapter: &Chapter,
    form: &QuizForm,
) -> Result<QuizAnswers, ValidationError> {
    let questions = &chapter.quiz_questions;
    if questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }

    let answers = form.answers(questions.len());
    let missing: Vec<usize> = answers
        .iter()
        .filter(|(_, sel)| sel.is_none())
        .map(|(i, _)| i + 1)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::UnansweredQuestions(missing));
    }

    let mut out = Vec::with_capacity(answers.len());
    for (i, sel) in answers {
        let selected = sel.unwrap_or_default();
        if selected >= questions[i].options.len() {
            return Err(ValidationError::OptionOutOfRange { question: i + 1, selected });
        }
        out.push(selected);
    }
    Ok(QuizAnswers(out))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    Javascript,
    Java,
    Cpp,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    pub fn starter_code(self) -> &'static str {
        match self {
            Language::Python => PYTHON_STARTER,
            Language::Javascript => JAVASCRIPT_STARTER,
            Language::Java => JAVA_STARTER,
            Language::Cpp => CPP_STARTER,
        }
    }
}

const PYTHON_STARTER: &str = "# Write your solution here
def solve():
    # Your code goes here
    pass

# Test your function
result = solve()
print(result)
";

const JAVASCRIPT_STARTER: &str = "// Write your solution here
function solve() {
    // Your code goes here
}

// Test your function
const result = solve();
console.log(result);
";

const JAVA_STARTER: &str = "// Write your solution here
public class Solution {
    public static void main(String[] args) {
        Solution sol = new Solution();
        System.out.println(sol.solve());
    }

    public Object solve() {
        // Your code goes here
        return null;
    }
}
";

const CPP_STARTER: &str = "// Write your solution here
#include <iostream>
using namespace std;

void solve() {
    // Your code goes here
}

int main() {
    solve();
    return 0;
}
";

/// Editor state of the practical panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticalForm {
    pub code: String,
    pub language: Language,
}

impl PracticalForm {
    pub fn new(language: Language) -> Self {
        Self { code: language.starter_code().to_string(), language }
    }

    /// Switching language replaces the editor content with that language's
    /// starter code.
    pub fn switch_language(&mut self, language: Language) {
        self.language = language;
        self.code = language.starter_code().to_string();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PracticalSubmission {
    pub code: String,
    pub language: Language,
}

pub fn collect_practical_submission(
    form: &PracticalForm,
) -> Result<PracticalSubmission, ValidationError> {
    let code = form.code.trim();
    if code.is_empty() {
        return Err(ValidationError::EmptyCode);
    }
    Ok(PracticalSubmission { code: code.to_string(), language: form.language })
}
