use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::validation::not_blank;

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const QUESTIONS_PER_QUIZ: usize = 3;

/// One multiple-choice question. Client-supplied questions go through the
/// same rules as parsed ones via `Validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuizQuestion {
    #[validate(custom(function = "not_blank"))]
    pub question: String,
    #[validate(custom(function = "options_not_blank"))]
    pub options: [String; OPTIONS_PER_QUESTION],
    #[validate(range(max = 3))]
    pub correct_index: usize,
    #[validate(custom(function = "not_blank"))]
    pub explanation: String,
}

fn options_not_blank(options: &[String; OPTIONS_PER_QUESTION]) -> std::result::Result<(), ValidationError> {
    if options.iter().any(|option| option.trim().is_empty()) {
        let mut error = ValidationError::new("blank_option");
        error.message = Some("options must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuizData {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_index: usize,
    pub selected_option: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::Validation(format!(
                "difficulty must be easy, medium or hard, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Peel a fenced code block (```` ```json ```` or bare ```` ``` ````) off a
/// model reply. Text without fences is returned trimmed.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some((_, rest)) = trimmed.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = trimmed.split_once("```") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    trimmed
}

/// Parse a model reply into questions. Any malformed item fails the whole quiz.
pub fn parse_quiz_response(response: &str) -> Result<QuizData> {
    let json = strip_code_fence(response);
    let value: Value =
        serde_json::from_str(json).map_err(|e| Error::quiz_parse(format!("invalid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| Error::quiz_parse("response is not an array"))?;

    let questions = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            parse_question(item).map_err(|reason| {
                Error::quiz_parse(format!("invalid question structure at index {}: {}", index, reason))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuizData { questions })
}

fn parse_question(item: &Value) -> std::result::Result<QuizQuestion, String> {
    let question = non_empty_str(item, "question")?;
    let explanation = non_empty_str(item, "explanation")?;

    let options = item
        .get("options")
        .and_then(Value::as_array)
        .ok_or("missing options array")?;
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(format!(
            "expected {} options, found {}",
            OPTIONS_PER_QUESTION,
            options.len()
        ));
    }
    let options: Vec<String> = options
        .iter()
        .map(|option| option.as_str().map(str::to_string).ok_or("option is not a string"))
        .collect::<std::result::Result<_, _>>()?;
    let options: [String; OPTIONS_PER_QUESTION] = options
        .try_into()
        .map_err(|_| "option count changed during parsing".to_string())?;

    let correct_index = item
        .get("correct_index")
        .and_then(Value::as_u64)
        .ok_or("correct_index is not a non-negative integer")? as usize;
    if correct_index >= OPTIONS_PER_QUESTION {
        return Err(format!("correct_index {} out of range", correct_index));
    }

    Ok(QuizQuestion {
        question,
        options,
        correct_index,
        explanation,
    })
}

fn non_empty_str(item: &Value, field: &str) -> std::result::Result<String, String> {
    match item.get(field).and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(format!("missing or empty {}", field)),
    }
}

pub fn feedback_for(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "Excellent! You have mastered this topic!"
    } else if percentage >= 70.0 {
        "Great job! You have a good understanding of the topic."
    } else if percentage >= 50.0 {
        "Good effort! You're on the right track."
    } else {
        "Keep learning! This topic needs more study."
    }
}

/// Score a full set of answers. Later answers to the same question replace
/// earlier ones; every question must be answered.
pub fn score_answers(quiz: &QuizData, answers: &[QuizAnswer]) -> Result<QuizResult> {
    let mut session = QuizSession::new(quiz.clone());
    for answer in answers {
        session.select(answer.question_index, answer.selected_option)?;
    }
    session.submit()
}

/// Answers a user has picked for the current quiz.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    quiz: QuizData,
    answers: BTreeMap<usize, usize>,
}

impl QuizSession {
    pub fn new(quiz: QuizData) -> Self {
        Self {
            quiz,
            answers: BTreeMap::new(),
        }
    }

    pub fn quiz(&self) -> &QuizData {
        &self.quiz
    }

    /// Swap in a regenerated quiz and forget every answer.
    pub fn reset(&mut self, quiz: QuizData) {
        self.quiz = quiz;
        self.answers.clear();
    }

    pub fn select(&mut self, question_index: usize, selected_option: usize) -> Result<()> {
        if question_index >= self.quiz.questions.len() {
            return Err(Error::Validation(format!(
                "question {} does not exist",
                question_index
            )));
        }
        if selected_option >= OPTIONS_PER_QUESTION {
            return Err(Error::Validation(format!(
                "option {} does not exist",
                selected_option
            )));
        }

        self.answers.insert(question_index, selected_option);
        Ok(())
    }

    pub fn answers(&self) -> Vec<QuizAnswer> {
        self.answers
            .iter()
            .map(|(&question_index, &selected_option)| QuizAnswer {
                question_index,
                selected_option,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.quiz.questions.is_empty() && self.answers.len() == self.quiz.questions.len()
    }

    pub fn submit(&self) -> Result<QuizResult> {
        if !self.is_complete() {
            return Err(Error::Validation(format!(
                "answer all {} questions before submitting ({} answered)",
                self.quiz.questions.len(),
                self.answers.len()
            )));
        }

        let score = self
            .answers
            .iter()
            .filter(|&(&index, &selected)| self.quiz.questions[index].correct_index == selected)
            .count();
        let total_questions = self.quiz.questions.len();
        let percentage = score as f64 / total_questions as f64 * 100.0;

        Ok(QuizResult {
            score,
            total_questions,
            percentage: (percentage * 100.0).round() / 100.0,
            feedback: feedback_for(percentage).to_string(),
        })
    }
}
