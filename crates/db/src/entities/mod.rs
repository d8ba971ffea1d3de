//! Database entities.

pub mod abuse_event;
pub mod answer;
pub mod comment;
pub mod poll;
pub mod poll_option;
pub mod poll_view;
pub mod question;
pub mod response;
pub mod ticket;
pub mod user;
pub mod user_role;

pub use abuse_event::Entity as AbuseEvent;
pub use answer::Entity as Answer;
pub use comment::Entity as Comment;
pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use poll_view::Entity as PollView;
pub use question::Entity as Question;
pub use response::Entity as Response;
pub use ticket::Entity as Ticket;
pub use user::Entity as User;
pub use user_role::Entity as UserRole;
