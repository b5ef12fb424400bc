//! Timeline projection for the widget.
//!
//! The OS asks for a bounded list of future-dated entries and a hint for
//! when to ask again. Every entry carries the same stored readings; only
//! the entry date changes, and with it the derived age, freshness and local
//! time. Nothing is predicted.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use cityclock_core::{age, classify, Config, FreshnessState};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::schema::{lead_city, WidgetCity, WidgetReader};

#[derive(Debug, Clone)]
pub struct TimelineSettings {
    pub entry_count: usize,
    pub entry_interval: TimeDelta,
    pub refresh_horizon: TimeDelta,
    pub stale_threshold: Duration,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TimelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            entry_count: config.timeline.entry_count.max(1) as usize,
            entry_interval: TimeDelta::minutes(i64::from(config.timeline.entry_interval_minutes)),
            refresh_horizon: TimeDelta::minutes(i64::from(config.timeline.refresh_horizon_minutes)),
            stale_threshold: config.freshness.threshold(),
        }
    }
}

/// One city as displayed at one entry date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySnapshot {
    pub id: Uuid,
    pub name: String,
    pub country_code: String,
    pub is_primary: bool,
    pub temperature: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub freshness: FreshnessState,
    /// Whole minutes since `last_updated`, at the entry date
    pub age_minutes: Option<i64>,
    /// Wall-clock time in the city at the entry date
    pub local_time: NaiveDateTime,
    /// Timezone actually used for `local_time`
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryContent {
    /// Nothing to show yet; the widget asks the user to open the app.
    Placeholder,
    Cities {
        lead: CitySnapshot,
        others: Vec<CitySnapshot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub content: EntryContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub next_refresh_after: DateTime<Utc>,
}

pub struct TimelineProvider {
    reader: WidgetReader,
    settings: TimelineSettings,
}

impl TimelineProvider {
    pub fn new(reader: WidgetReader, settings: TimelineSettings) -> Self {
        Self { reader, settings }
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub fn build_timeline(&self, now: DateTime<Utc>) -> Timeline {
        let cities = self.reader.cities();
        let next_refresh_after = now
            .checked_add_signed(self.settings.refresh_horizon)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let Some(lead) = lead_city(&cities).filter(|c| c.temperature.is_some()) else {
            tracing::debug!("No readings yet, projecting placeholder");
            return Timeline {
                entries: vec![placeholder_entry(now)],
                next_refresh_after,
            };
        };

        // Stops at the last entry date chrono can represent
        let entries: Vec<TimelineEntry> = (0..self.settings.entry_count)
            .map_while(|i| {
                let offset = i32::try_from(i).ok()?;
                let date = now.checked_add_signed(self.settings.entry_interval.checked_mul(offset)?)?;
                Some(TimelineEntry {
                    date,
                    content: EntryContent::Cities {
                        lead: self.snapshot(lead, date),
                        others: cities
                            .iter()
                            .filter(|c| c.id != lead.id)
                            .map(|c| self.snapshot(c, date))
                            .collect(),
                    },
                })
            })
            .collect();

        tracing::debug!(
            "Projected {} entries for {} cities",
            entries.len(),
            cities.len()
        );
        Timeline {
            entries,
            next_refresh_after,
        }
    }

    fn snapshot(&self, city: &WidgetCity, date: DateTime<Utc>) -> CitySnapshot {
        let (local_time, time_zone) = local_time(&city.time_zone_identifier, date);
        CitySnapshot {
            id: city.id,
            name: city.name.clone(),
            country_code: city.country_code.clone(),
            is_primary: city.is_primary,
            temperature: city.temperature,
            last_updated: city.last_updated,
            freshness: classify(city.last_updated, date, self.settings.stale_threshold),
            age_minutes: age(city.last_updated, date).map(|a| a.num_minutes()),
            local_time,
            time_zone,
        }
    }
}

/// The single entry shown while the app has never produced a reading.
pub fn placeholder_entry(now: DateTime<Utc>) -> TimelineEntry {
    TimelineEntry {
        date: now,
        content: EntryContent::Placeholder,
    }
}

/// Local wall-clock time for an IANA identifier, UTC if it is unknown.
fn local_time(identifier: &str, date: DateTime<Utc>) -> (NaiveDateTime, String) {
    match identifier.parse::<Tz>() {
        Ok(tz) => (date.with_timezone(&tz).naive_local(), tz.name().to_string()),
        Err(_) => {
            tracing::debug!("Unknown timezone '{}', using UTC", identifier);
            (date.naive_utc(), "UTC".to_string())
        }
    }
}
