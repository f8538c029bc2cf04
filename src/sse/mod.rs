pub mod models;
pub use models::*;

mod sse_broadcaster;
pub use sse_broadcaster::*;

mod announcements_sse;

pub use announcements_sse::{announcements_sse, poll_announcements_sse};
