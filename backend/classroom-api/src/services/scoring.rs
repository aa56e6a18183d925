//! Scoring rules for quiz attempts.
//!
//! The running score rewards streaks: a correct answer is worth
//! `2^next_exponent` and raises the exponent, a wrong answer costs 2 points and
//! resets the exponent to 1. The persisted result is the share of correct
//! answers and ignores the running score entirely.

use crate::models::attempt::AttemptState;

/// Minimum final score (inclusive) for the success message.
pub const PASS_THRESHOLD: f64 = 50.0;

const WRONG_ANSWER_PENALTY: i64 = 2;

impl AttemptState {
    /// State after one answered question.
    #[must_use]
    pub fn apply(self, correct: bool) -> Self {
        if correct {
            let award = 2_i64.saturating_pow(self.next_exponent);
            Self {
                temp_score: self.temp_score.saturating_add(award),
                next_exponent: self.next_exponent.saturating_add(1),
            }
        } else {
            Self {
                temp_score: self.temp_score.saturating_sub(WRONG_ANSWER_PENALTY),
                next_exponent: 1,
            }
        }
    }
}

/// Percentage of correct answers rounded half to even at two decimals,
/// `None` for an empty quiz.
pub fn final_score(correct_answers: u64, total_questions: u64) -> Option<f64> {
    if total_questions == 0 {
        return None;
    }
    let ratio = correct_answers as f64 / total_questions as f64;
    Some((ratio * 100.0 * 100.0).round_ties_even() / 100.0)
}

/// Display progress before the current question is answered.
///
/// Rounds half to even, so 2.5% rounds to 2%.
pub fn progress_percent(unanswered: usize, total_questions: usize) -> Option<i64> {
    if total_questions == 0 || unanswered == 0 {
        return None;
    }
    let done = (unanswered - 1) as f64 / total_questions as f64;
    Some(100 - (done * 100.0).round_ties_even() as i64)
}

pub fn passed(final_score: f64) -> bool {
    final_score >= PASS_THRESHOLD
}

pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        format!("{}", score)
    }
}

pub fn answer_feedback(correct: bool, running_score: i64) -> String {
    if correct {
        format!("Correct. Score is: {}", running_score)
    } else {
        format!("Wrong. Score is: {}", running_score)
    }
}

pub fn completion_message(quiz_name: &str, final_score: f64) -> String {
    let score = format_score(final_score);
    if passed(final_score) {
        format!(
            "Congratulations! You completed the quiz {} with success! You scored {} points.",
            quiz_name, score
        )
    } else {
        format!(
            "Better luck next time! Your score for the quiz {} was {}.",
            quiz_name, score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(answers: &[bool]) -> Vec<i64> {
        let mut state = AttemptState::default();
        answers
            .iter()
            .map(|correct| {
                state = state.apply(*correct);
                state.temp_score
            })
            .collect()
    }

    #[test]
    fn correct_streak_sums_powers_of_two() {
        for n in 1..=20u32 {
            let scores = run(&vec![true; n as usize]);
            assert_eq!(*scores.last().unwrap(), 2_i64.pow(n + 1) - 2);
        }
    }

    #[test]
    fn wrong_answer_costs_two_and_resets_streak() {
        let streak = AttemptState {
            temp_score: 30,
            next_exponent: 5,
        };
        let after = streak.apply(false);
        assert_eq!(after.temp_score, 28);
        assert_eq!(after.next_exponent, 1);

        let fresh = AttemptState::default().apply(false);
        assert_eq!(fresh.temp_score, -2);
        assert_eq!(fresh.next_exponent, 1);
    }

    #[test]
    fn mixed_sequence_running_scores() {
        assert_eq!(run(&[true, true]), vec![2, 6]);
        assert_eq!(run(&[true, false]), vec![2, 0]);
        assert_eq!(run(&[true, false, true, true]), vec![2, 0, 2, 6]);
    }

    #[test]
    fn long_streak_saturates_instead_of_overflowing() {
        let state = AttemptState {
            temp_score: i64::MAX - 1,
            next_exponent: 70,
        };
        let after = state.apply(true);
        assert_eq!(after.temp_score, i64::MAX);
        assert_eq!(after.next_exponent, 71);
    }

    #[test]
    fn final_score_rounds_to_two_decimals() {
        assert_eq!(final_score(2, 2), Some(100.0));
        assert_eq!(final_score(1, 2), Some(50.0));
        assert_eq!(final_score(3, 4), Some(75.0));
        assert_eq!(final_score(2, 3), Some(66.67));
        assert_eq!(final_score(1, 3), Some(33.33));
        assert_eq!(final_score(0, 5), Some(0.0));
        // 3.125 and 15.625 are exact ties
        assert_eq!(final_score(1, 32), Some(3.12));
        assert_eq!(final_score(5, 32), Some(15.62));
        assert_eq!(final_score(3, 32), Some(9.38));
    }

    #[test]
    fn empty_quiz_has_no_score_or_progress() {
        assert_eq!(final_score(0, 0), None);
        assert_eq!(progress_percent(0, 0), None);
        assert_eq!(progress_percent(1, 0), None);
    }

    #[test]
    fn progress_reflects_questions_already_answered() {
        assert_eq!(progress_percent(2, 2), Some(50));
        assert_eq!(progress_percent(1, 2), Some(100));
        assert_eq!(progress_percent(4, 4), Some(25));
        assert_eq!(progress_percent(1, 4), Some(100));
        // 1/40 = 2.5% rounds to 2%
        assert_eq!(progress_percent(2, 40), Some(98));
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(passed(50.0));
        assert!(passed(100.0));
        assert!(!passed(49.99));
    }

    #[test]
    fn messages_follow_result() {
        assert_eq!(
            completion_message("Algebra", 50.0),
            "Congratulations! You completed the quiz Algebra with success! You scored 50.0 points."
        );
        assert_eq!(
            completion_message("Algebra", 33.33),
            "Better luck next time! Your score for the quiz Algebra was 33.33."
        );
        assert_eq!(answer_feedback(true, 6), "Correct. Score is: 6");
        assert_eq!(answer_feedback(false, -2), "Wrong. Score is: -2");
    }
}
