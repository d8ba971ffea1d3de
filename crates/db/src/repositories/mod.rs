//! Repositories wrapping sea-orm queries per aggregate.

pub mod abuse_event;
pub mod comment;
pub mod poll;
pub mod poll_view;
pub mod response;
pub mod ticket;
pub mod user;

pub use abuse_event::AbuseEventRepository;
pub use comment::{CommentFilter, CommentRepository};
pub use poll::{PollFilter, PollRepository, QuestionWithOptions};
pub use poll_view::PollViewRepository;
pub use response::ResponseRepository;
pub use ticket::TicketRepository;
pub use user::UserRepository;

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};

/// Case-insensitive substring match on a text column.
pub(crate) fn contains_ci(column: impl IntoColumnRef, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}
