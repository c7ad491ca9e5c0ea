pub mod assignment;
pub mod blocking;
pub mod booking;
pub mod busy;
pub mod capacity;
pub mod duration;
pub mod layout;
pub mod notification;
pub mod qualification;
pub mod search;
pub mod slots;
pub mod store;
pub mod time;
pub mod working_window;

pub use booking::SchedulingService;
pub use capacity::CapacityFilter;
pub use notification::{LogNotifier, NotificationDispatcher, WebhookNotifier};
pub use store::{SchedulingStore, SupabaseSchedulingStore};
