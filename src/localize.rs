use tracing::warn;

use crate::content::LearningContent;
use crate::error::Result;
use crate::language::Language;
use crate::queue::TranslationQueue;
use crate::quiz::{QuizData, QuizQuestion};

/// Translate a lesson through the queue, explanation first.
///
/// Errors propagate; the caller keeps the original and drops back to English.
pub async fn localize_lesson(
    queue: &TranslationQueue,
    content: &LearningContent,
    language: Language,
) -> Result<LearningContent> {
    if language.is_english() {
        return Ok(content.clone());
    }

    let explanation = queue.translate(content.explanation.as_str(), language).await?;
    let analogy = queue.translate(content.analogy.as_str(), language).await?;

    Ok(LearningContent {
        topic: content.topic.clone(),
        explanation,
        analogy,
    })
}

/// Translate a quiz one question at a time. A question that fails to
/// translate is kept as it was.
pub async fn localize_quiz(queue: &TranslationQueue, quiz: &QuizData, language: Language) -> QuizData {
    if language.is_english() {
        return quiz.clone();
    }

    let mut questions = Vec::with_capacity(quiz.questions.len());
    for (index, question) in quiz.questions.iter().enumerate() {
        match localize_question(queue, question, language).await {
            Ok(translated) => questions.push(translated),
            Err(e) => {
                warn!(question = index, error = %e, "Keeping untranslated quiz question");
                questions.push(question.clone());
            }
        }
    }

    QuizData { questions }
}

async fn localize_question(
    queue: &TranslationQueue,
    question: &QuizQuestion,
    language: Language,
) -> Result<QuizQuestion> {
    let text = queue.translate(question.question.as_str(), language).await?;

    let mut options = question.options.clone();
    for option in options.iter_mut() {
        *option = queue.translate(option.as_str(), language).await?;
    }

    let explanation = queue.translate(question.explanation.as_str(), language).await?;

    Ok(QuizQuestion {
        question: text,
        options,
        correct_index: question.correct_index,
        explanation,
    })
}
