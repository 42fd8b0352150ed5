pub mod dashboard;
pub mod event;
pub mod user;

pub use dashboard::{Dashboard, DashboardStats};
pub use event::{Event, EventPatch, EventStatus, EventSummary, EventVisibility, NewEvent};
pub use user::{ApiToken, User, UserInfo};
