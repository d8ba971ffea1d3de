//! Business logic services.

#![allow(missing_docs)]

pub mod access;
pub mod account;
pub mod aggregate;
pub mod comment;
pub mod mailer;
pub mod moderation;
pub mod poll;
pub mod rate_limit;
pub mod response;
pub mod storage;
pub mod ticket;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use access::{Caller, ResultsAccess, results_access};
pub use account::{AccountService, CredentialsInput, Registration, SignIn, normalize_email};
pub use aggregate::{EmojiCount, LabelCount, QuestionSummary, aggregate};
pub use comment::{COMMENT_LIST_LIMIT, CommentService, CreateCommentInput};
pub use mailer::{Mailer, MailerService, NoOpMailer, SmtpMailer};
pub use moderation::{AdminStats, ModerationService, PAGE_SIZE, Page, PollListItem, TicketFilter};
pub use poll::{
    CreatePollInput, CreatedPoll, PollDetail, PollService, PollSettingsInput, QuestionInput,
    UpdatePollInput,
};
pub use rate_limit::{EventKind, Limits, RateLimiter, Scope};
pub use response::{AnswerValue, PollResults, RespondInput, ResponseService};
pub use storage::{SignedUpload, UploadService};
pub use ticket::{ReportInput, TicketService};
