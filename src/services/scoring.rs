//! Pure scoring of a single answer: correctness plus a time-decay bonus.

use thiserror::Error;
use uuid::Uuid;

use crate::state::session::QuestionSnapshot;

/// Base points awarded for any correct answer.
const BASE_POINTS: u32 = 1000;
/// Maximum time bonus, awarded for an instant correct answer.
const MAX_TIME_BONUS: u64 = 1000;

/// Error raised when the submitted option does not belong to the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("option `{0}` does not belong to the question")]
pub struct ScoreError(pub Uuid);

/// Outcome of scoring one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerScore {
    /// Whether the selected option was the correct one.
    pub is_correct: bool,
    /// Points awarded: zero for a wrong answer, base plus time bonus otherwise.
    pub points: u32,
}

/// Score one answer against `question`.
///
/// A correct answer earns 1000 base points plus a linear time bonus of up to
/// 1000 that decays to zero over the question's time limit; a slow-but-correct
/// answer is never pushed below the base. A wrong answer earns nothing.
/// `elapsed_ms` is clamped to `[0, time_limit]` before the bonus is computed.
pub fn score(
    question: &QuestionSnapshot,
    selected_option_id: Uuid,
    elapsed_ms: u64,
) -> Result<AnswerScore, ScoreError> {
    let option = question
        .option(selected_option_id)
        .ok_or(ScoreError(selected_option_id))?;

    if !option.is_correct {
        return Ok(AnswerScore {
            is_correct: false,
            points: 0,
        });
    }

    let limit_ms = question.time_limit_ms();
    let elapsed = elapsed_ms.min(limit_ms);
    let bonus = if limit_ms == 0 {
        0
    } else {
        (limit_ms - elapsed) * MAX_TIME_BONUS / limit_ms
    };

    Ok(AnswerScore {
        is_correct: true,
        points: BASE_POINTS + bonus as u32,
    })
}
