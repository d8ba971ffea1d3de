//! Response service: submitting answers and reading aggregated results.

use std::collections::{BTreeMap, HashSet};

use askanai_common::{AppError, AppResult, IdGenerator};
use askanai_db::{
    entities::{
        answer,
        poll::{self, PollStatus, VisibilityMode},
        question::QuestionType,
        response,
    },
    repositories::{PollRepository, QuestionWithOptions, ResponseRepository},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use super::{
    access::{Caller, ResultsAccess, results_access},
    aggregate::{QuestionSummary, aggregate, emoji_set, rating_scale},
    rate_limit::{EventKind, RateLimiter, Scope},
};

const MAX_RESPONDENT_NAME_LEN: usize = 100;
const MAX_TEXT_ANSWER_LEN: usize = 1000;
const NPS_MAX: f64 = 10.0;

/// Input for submitting a response.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RespondInput {
    pub respondent_name: Option<String>,
    /// Map of question id to answer value. Kept loose so a wrong shape is
    /// reported as `INVALID_ANSWERS` rather than a JSON error.
    pub answers: Option<JsonValue>,
}

/// A submitted answer value before it is checked against its question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// Column an accepted answer is stored in.
#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

/// Aggregated results of a poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub response_count: u64,
    pub results_by_question_id: BTreeMap<String, Option<QuestionSummary>>,
}

fn invalid() -> AppError {
    AppError::Validation("INVALID_ANSWERS")
}

fn labels(question: &QuestionWithOptions) -> Vec<&str> {
    question.options.iter().map(|o| o.label.as_str()).collect()
}

fn distinct_declared(values: &[String], declared: &[&str]) -> bool {
    let mut seen = HashSet::new();
    values
        .iter()
        .all(|v| declared.contains(&v.as_str()) && seen.insert(v.as_str()))
}

fn integer_in(value: f64, min: f64, max: f64) -> bool {
    value.fract() == 0.0 && value >= min && value <= max
}

/// Check one answer against its question and pick its storage column.
fn check_answer(question: &QuestionWithOptions, value: AnswerValue) -> AppResult<Stored> {
    let settings = question.question.settings_json.as_ref();
    let accepted = match (question.question.question_type, value) {
        (
            QuestionType::SingleChoice | QuestionType::MultipleChoice,
            AnswerValue::Text(label),
        ) => labels(question)
            .contains(&label.as_str())
            .then_some(Stored::Text(label)),
        (QuestionType::MultipleChoice, AnswerValue::List(list)) => {
            (!list.is_empty() && distinct_declared(&list, &labels(question)))
                .then_some(Stored::List(list))
        }
        (QuestionType::Rating, AnswerValue::Number(n)) => {
            integer_in(n, 1.0, f64::from(rating_scale(settings))).then_some(Stored::Number(n))
        }
        (QuestionType::Nps, AnswerValue::Number(n)) => {
            integer_in(n, 0.0, NPS_MAX).then_some(Stored::Number(n))
        }
        (QuestionType::Emoji, AnswerValue::Text(emoji)) => {
            emoji_set(settings).contains(&emoji).then_some(Stored::Text(emoji))
        }
        (QuestionType::ShortText, AnswerValue::Text(text)) => {
            let text = text.trim();
            (1..=MAX_TEXT_ANSWER_LEN)
                .contains(&text.chars().count())
                .then(|| Stored::Text(text.to_string()))
        }
        (QuestionType::Ranking, AnswerValue::List(list)) => {
            let declared = labels(question);
            (list.len() == declared.len() && distinct_declared(&list, &declared))
                .then_some(Stored::List(list))
        }
        _ => None,
    };
    accepted.ok_or_else(invalid)
}

/// Validate a whole answer map against the poll's questions.
///
/// Unknown question ids and unanswered required questions are rejected.
/// A `null` value counts as unanswered.
fn check_answers(
    questions: &[QuestionWithOptions],
    answers: Map<String, JsonValue>,
) -> AppResult<Vec<(String, Stored)>> {
    let mut remaining = answers;
    let mut accepted = Vec::with_capacity(remaining.len());

    for question in questions {
        match remaining.remove(&question.question.id) {
            None | Some(JsonValue::Null) => {
                if question.question.is_required {
                    debug!(question_id = %question.question.id, "Required question unanswered");
                    return Err(invalid());
                }
            }
            Some(raw) => {
                let value: AnswerValue = serde_json::from_value(raw).map_err(|_| invalid())?;
                accepted.push((question.question.id.clone(), check_answer(question, value)?));
            }
        }
    }

    if remaining.is_empty() {
        Ok(accepted)
    } else {
        Err(invalid())
    }
}

fn is_closed(poll: &poll::Model, response_count: Option<u64>) -> bool {
    if poll.status != PollStatus::Open {
        return true;
    }
    if poll.open_until.is_some_and(|until| until <= Utc::now()) {
        return true;
    }
    matches!(
        (poll.close_after_responses, response_count),
        (Some(limit), Some(count)) if count >= u64::try_from(limit).unwrap_or(0)
    )
}

/// Response service for business logic.
#[derive(Clone)]
pub struct ResponseService {
    poll_repo: PollRepository,
    response_repo: ResponseRepository,
    limiter: RateLimiter,
    id_gen: IdGenerator,
}

impl ResponseService {
    /// Create a new response service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        response_repo: ResponseRepository,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            poll_repo,
            response_repo,
            limiter,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a response to a poll.
    pub async fn respond(
        &self,
        poll_id: &str,
        input: RespondInput,
        caller: &Caller,
    ) -> AppResult<response::Model> {
        let Some(JsonValue::Object(answers)) = input.answers else {
            return Err(invalid());
        };

        self.limiter
            .enforce(EventKind::PollRespond, Scope::of(caller))
            .await?;

        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        let response_count = match poll.close_after_responses {
            Some(_) => Some(self.response_repo.count_by_poll(&poll.id).await?),
            None => None,
        };
        if is_closed(&poll, response_count) {
            return Err(AppError::Forbidden("POLL_CLOSED"));
        }

        if self
            .response_repo
            .has_responded(&poll.id, caller.user_id(), &caller.ip_hash)
            .await?
        {
            return Err(AppError::Conflict("ALREADY_VOTED"));
        }

        let questions = self.poll_repo.find_questions(&poll.id).await?;
        let accepted = check_answers(&questions, answers)?;

        let now = Utc::now().fixed_offset();
        let response = response::Model {
            id: self.id_gen.generate(),
            poll_id: poll.id.clone(),
            respondent_name: input
                .respondent_name
                .map(|name| name.chars().take(MAX_RESPONDENT_NAME_LEN).collect::<String>())
                .filter(|name| !name.is_empty()),
            user_id: caller.user_id.clone(),
            ip_hash: Some(caller.ip_hash.clone()),
            user_agent_hash: Some(caller.ua_hash.clone()),
            created_at: now,
        };

        let answers = accepted
            .into_iter()
            .map(|(question_id, stored)| {
                let (value_text, value_number, value_json) = match stored {
                    Stored::Text(text) => (Some(text), None, None),
                    Stored::Number(number) => (None, Some(number), None),
                    Stored::List(list) => (None, None, Some(JsonValue::from(list))),
                };
                answer::Model {
                    id: self.id_gen.generate(),
                    response_id: response.id.clone(),
                    question_id,
                    value_text,
                    value_number,
                    value_json,
                    created_at: now,
                }
            })
            .collect();

        let response = self
            .response_repo
            .create_with_answers(response, answers)
            .await?;
        info!(poll_id = %poll.id, response_id = %response.id, "Response recorded");
        Ok(response)
    }

    /// Aggregated results, subject to the visibility policy.
    pub async fn results(&self, poll_id: &str, caller: &Caller) -> AppResult<PollResults> {
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;

        let has_responded = if poll.visibility_mode == VisibilityMode::Voters
            && !caller.can_manage(&poll)
        {
            self.has_voted(&poll.id, caller).await?
        } else {
            false
        };

        match results_access(&poll, caller, has_responded) {
            ResultsAccess::Hidden => return Err(AppError::NotFound),
            ResultsAccess::RespondFirst => return Err(AppError::Forbidden("GIVE_TO_GET_REQUIRED")),
            ResultsAccess::Granted => {}
        }

        let questions = self.poll_repo.find_questions(&poll.id).await?;
        let response_count = self.response_repo.count_by_poll(&poll.id).await?;
        let answers = self.response_repo.answers_for_poll(&poll.id).await?;

        Ok(PollResults {
            response_count,
            results_by_question_id: aggregate(&questions, &answers),
        })
    }

    /// Whether the caller already responded: by user when signed in, else by IP.
    pub async fn has_voted(&self, poll_id: &str, caller: &Caller) -> AppResult<bool> {
        self.response_repo
            .has_responded(poll_id, caller.user_id(), &caller.ip_hash)
            .await
    }
}
