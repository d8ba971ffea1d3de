//! Poll service: creation, lookup, owner edits, archival and view tracking.

use askanai_common::{AppError, AppResult, IdGenerator, sha256_hex};
use askanai_db::{
    entities::{
        poll::{self, PollStatus, VisibilityMode},
        poll_option, poll_view,
        question::{self, QuestionType},
    },
    repositories::{PollRepository, PollViewRepository, QuestionWithOptions},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;
use validator::Validate;

use super::{
    access::Caller,
    rate_limit::{EventKind, RateLimiter, Scope},
    validation::{first_failure, trim_in_place, trimmed_non_empty},
};

/// Attempts at finding an unused slug before letting the insert decide.
const SLUG_ATTEMPTS: usize = 10;

const MAX_PROMPT_LEN: usize = 500;
const MAX_OPTION_LEN: usize = 140;

/// Reason stored on polls archived by their owner.
pub const ARCHIVE_REASON_USER_DELETE: &str = "user_delete";

/// Input for creating a poll.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePollInput {
    #[validate(length(min = 3, max = 140))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 25))]
    pub questions: Vec<QuestionInput>,

    #[validate(nested)]
    pub settings: PollSettingsInput,
}

/// One question of a new poll.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(rename = "type")]
    pub question_type: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub is_required: bool,
    /// Type-specific settings, stored only when it is a JSON object.
    pub settings_json: Option<JsonValue>,
}

/// Poll-level settings of a new poll.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct PollSettingsInput {
    pub visibility: Option<String>,
    pub allow_comments: bool,
    #[validate(length(max = 2048))]
    pub preview_image_url: Option<String>,
    pub open_until: Option<DateTime<FixedOffset>>,
    #[validate(range(min = 1))]
    pub close_after_responses: Option<i32>,
}

impl CreatePollInput {
    fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        self.description = trimmed_non_empty(self.description.take());
        self.settings.preview_image_url = trimmed_non_empty(self.settings.preview_image_url.take());
    }
}

/// Input for editing a poll. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePollInput {
    #[validate(length(min = 3, max = 140))]
    pub title: Option<String>,

    /// An empty string clears the description.
    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub visibility: Option<String>,
    pub allow_comments: Option<bool>,
    pub status: Option<String>,
}

impl UpdatePollInput {
    fn normalize(&mut self) {
        if let Some(title) = self.title.as_mut() {
            trim_in_place(title);
        }
        if let Some(description) = self.description.as_mut() {
            trim_in_place(description);
        }
    }
}

/// A freshly created poll together with its one-time creator key.
#[derive(Debug, Clone)]
pub struct CreatedPoll {
    pub poll: poll::Model,
    pub questions: Vec<QuestionWithOptions>,
    /// Plaintext ownership secret; only its hash is stored.
    pub creator_key: String,
}

/// A poll with its ordered questions.
#[derive(Debug, Clone)]
pub struct PollDetail {
    pub poll: poll::Model,
    pub questions: Vec<QuestionWithOptions>,
    /// Whether the caller may manage the poll.
    pub is_owner: bool,
}

/// Whether `caller` may move a poll from `from` to `to`.
///
/// Owners move forward only: draft to open, open to closed. Admins may also
/// reopen a closed poll.
#[must_use]
pub fn status_transition_allowed(from: PollStatus, to: PollStatus, is_admin: bool) -> bool {
    match (from, to) {
        (a, b) if a == b => true,
        (PollStatus::Draft, PollStatus::Open) | (PollStatus::Open, PollStatus::Closed) => true,
        (PollStatus::Closed, PollStatus::Open) => is_admin,
        _ => false,
    }
}

fn parse_visibility(value: Option<&str>) -> AppResult<VisibilityMode> {
    value.map_or(Ok(VisibilityMode::Public), |v| {
        VisibilityMode::parse(v.trim()).ok_or(AppError::Validation("INVALID_SETTINGS"))
    })
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    view_repo: PollViewRepository,
    limiter: RateLimiter,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        view_repo: PollViewRepository,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            poll_repo,
            view_repo,
            limiter,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll with its questions and options.
    pub async fn create(&self, mut input: CreatePollInput, caller: &Caller) -> AppResult<CreatedPoll> {
        input.normalize();
        input.validate().map_err(|e| {
            first_failure(
                &e,
                &[
                    ("title", "INVALID_TITLE"),
                    ("description", "INVALID_DESCRIPTION"),
                    ("questions", "INVALID_QUESTIONS"),
                    ("settings", "INVALID_SETTINGS"),
                ],
            )
        })?;
        let visibility = parse_visibility(input.settings.visibility.as_deref())?;

        let types = input
            .questions
            .iter()
            .map(|q| QuestionType::parse(q.question_type.trim()))
            .collect::<Option<Vec<_>>>()
            .ok_or(AppError::Validation("INVALID_QUESTIONS"))?;

        let scope = Scope::of(caller);
        self.limiter.enforce(EventKind::PollCreate, scope).await?;

        let slug = self.unused_slug().await?;
        let creator_key = self.id_gen.generate_creator_key();
        let now = Utc::now().fixed_offset();

        let poll = poll::Model {
            id: self.id_gen.generate(),
            slug,
            title: input.title,
            description: input.description,
            status: PollStatus::Open,
            visibility_mode: visibility,
            allow_comments: input.settings.allow_comments,
            creator_key_hash: Some(sha256_hex(&creator_key)),
            created_by_user_id: caller.user_id.clone(),
            preview_image_url: input.settings.preview_image_url,
            open_until: input.settings.open_until,
            close_after_responses: input.settings.close_after_responses,
            archived_at: None,
            archived_by_user_id: None,
            archive_reason: None,
            created_at: now,
            updated_at: now,
        };

        let questions = self.build_questions(&poll.id, input.questions, &types);
        let poll = self
            .poll_repo
            .create_with_questions(poll, questions.clone())
            .await?;

        self.limiter.record(EventKind::PollCreateOk, scope).await?;
        info!(poll_id = %poll.id, slug = %poll.slug, questions = questions.len(), "Poll created");

        Ok(CreatedPoll {
            poll,
            questions,
            creator_key,
        })
    }

    async fn unused_slug(&self) -> AppResult<String> {
        let mut slug = self.id_gen.generate_slug();
        for _ in 0..SLUG_ATTEMPTS {
            if !self.poll_repo.slug_exists(&slug).await? {
                break;
            }
            slug = self.id_gen.generate_slug();
        }
        Ok(slug)
    }

    /// Questions keep their submitted index as position even when earlier
    /// ones are skipped; the same holds for options.
    fn build_questions(
        &self,
        poll_id: &str,
        inputs: Vec<QuestionInput>,
        types: &[QuestionType],
    ) -> Vec<QuestionWithOptions> {
        let now = Utc::now().fixed_offset();
        inputs
            .into_iter()
            .zip(types.iter().copied())
            .enumerate()
            .filter_map(|(position, (input, question_type))| {
                let prompt = input.prompt.trim();
                let prompt_len = prompt.chars().count();
                if prompt_len == 0 || prompt_len > MAX_PROMPT_LEN {
                    return None;
                }

                let question_id = self.id_gen.generate();
                let options = if question_type.has_options() {
                    input
                        .options
                        .iter()
                        .enumerate()
                        .filter_map(|(idx, label)| {
                            let label = label.trim();
                            let len = label.chars().count();
                            (1..=MAX_OPTION_LEN).contains(&len).then(|| poll_option::Model {
                                id: self.id_gen.generate(),
                                question_id: question_id.clone(),
                                position: idx as i32,
                                label: label.to_string(),
                                created_at: now,
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };

                Some(QuestionWithOptions {
                    question: question::Model {
                        id: question_id,
                        poll_id: poll_id.to_string(),
                        position: position as i32,
                        question_type,
                        prompt: prompt.to_string(),
                        is_required: input.is_required,
                        settings_json: input.settings_json.filter(JsonValue::is_object),
                        created_at: now,
                    },
                    options,
                })
            })
            .collect()
    }

    /// Load a poll and its questions by slug. Drafts are hidden from
    /// everyone but the owner and admins.
    pub async fn get_by_slug(&self, slug: &str, caller: &Caller) -> AppResult<PollDetail> {
        let poll = self
            .poll_repo
            .find_active_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound)?;

        let is_owner = caller.can_manage(&poll);
        if poll.status == PollStatus::Draft && !is_owner {
            return Err(AppError::NotFound);
        }

        let questions = self.poll_repo.find_questions(&poll.id).await?;
        Ok(PollDetail {
            poll,
            questions,
            is_owner,
        })
    }

    /// Edit a poll's title, description, visibility, comment switch or status.
    pub async fn update(
        &self,
        poll_id: &str,
        mut input: UpdatePollInput,
        caller: &Caller,
    ) -> AppResult<poll::Model> {
        input.normalize();
        input.validate().map_err(|e| {
            first_failure(
                &e,
                &[("title", "INVALID_TITLE"), ("description", "INVALID_DESCRIPTION")],
            )
        })?;

        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        if !caller.can_manage(&poll) {
            return Err(AppError::forbidden());
        }

        let status = input
            .status
            .as_deref()
            .map(|s| PollStatus::parse(s.trim()).ok_or(AppError::Validation("INVALID_STATUS")))
            .transpose()?;
        if let Some(to) = status
            && !status_transition_allowed(poll.status, to, caller.is_admin)
        {
            return Err(AppError::Validation("INVALID_STATUS"));
        }
        let visibility = input
            .visibility
            .as_deref()
            .map(|v| parse_visibility(Some(v)))
            .transpose()?;

        let mut active: poll::ActiveModel = poll.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description).filter(|d| !d.is_empty()));
        }
        if let Some(visibility) = visibility {
            active.visibility_mode = Set(visibility);
        }
        if let Some(allow_comments) = input.allow_comments {
            active.allow_comments = Set(allow_comments);
        }
        if let Some(status) = status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = self.poll_repo.update(active).await?;
        info!(poll_id = %updated.id, status = ?updated.status, "Poll updated");
        Ok(updated)
    }

    /// Archive a poll on behalf of its owner or an admin.
    pub async fn archive(&self, poll_id: &str, caller: &Caller) -> AppResult<()> {
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        if !caller.can_manage(&poll) {
            return Err(AppError::forbidden());
        }

        let now = Utc::now().fixed_offset();
        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(PollStatus::Closed);
        active.archived_at = Set(Some(now));
        active.archived_by_user_id = Set(caller.user_id.clone());
        active.archive_reason = Set(Some(ARCHIVE_REASON_USER_DELETE.to_string()));
        active.updated_at = Set(now);
        self.poll_repo.update(active).await?;

        self.limiter
            .record(EventKind::PollArchive, Scope::of(caller))
            .await?;
        info!(poll_id = %poll_id, by_admin = caller.is_admin, "Poll archived");
        Ok(())
    }

    /// Record a view of a poll. Repeat views from one client count once.
    pub async fn record_view(&self, poll_id: &str, caller: &Caller) -> AppResult<()> {
        self.limiter
            .enforce(EventKind::PollView, Scope::of(caller))
            .await?;
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;

        self.view_repo
            .record(poll_view::Model {
                id: self.id_gen.generate(),
                poll_id: poll.id,
                ip_hash: caller.ip_hash.clone(),
                user_agent_hash: Some(caller.ua_hash.clone()),
                created_at: Utc::now().fixed_offset(),
            })
            .await?;
        Ok(())
    }

    /// Number of distinct clients that viewed a poll.
    pub async fn view_count(&self, poll_id: &str) -> AppResult<u64> {
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        self.view_repo.count_by_poll(&poll.id).await
    }
}
