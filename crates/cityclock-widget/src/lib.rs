//! Widget extension core for CityClock.
//!
//! Runs in its own process. Reads the shared container through its own
//! schema, projects a timeline for the OS, and may refresh the primary
//! city's temperature through a narrow write.

pub mod refresh;
pub mod reload;
pub mod schema;
pub mod timeline;

pub use refresh::{PrimaryWeatherRefresher, WidgetRefreshOutcome};
pub use reload::ReloadWatch;
pub use schema::{lead_city, WidgetCity, WidgetLocation, WidgetReader};
pub use timeline::{
    placeholder_entry, CitySnapshot, EntryContent, Timeline, TimelineEntry, TimelineProvider,
    TimelineSettings,
};
