pub mod snapshot;
pub mod served;

pub use snapshot::{DailyMax, HourlyAverage, Snapshot, DEFAULT_MAX_PLAYERS};
pub use served::{ServedSnapshot, Source};
