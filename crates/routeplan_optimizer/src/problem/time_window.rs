use jiff::civil::Time;
use serde::Serialize;

pub const SECONDS_PER_DAY: i64 = 86_400;

pub fn seconds_from_midnight(time: Time) -> i64 {
    i64::from(time.hour()) * 3600 + i64::from(time.minute()) * 60 + i64::from(time.second())
}

/// Closed interval of seconds from the planning day's midnight.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub const FULL_DAY: TimeWindow = TimeWindow {
        start: 0,
        end: SECONDS_PER_DAY,
    };

    pub fn new(start: i64, end: i64) -> Self {
        TimeWindow { start, end }
    }

    pub fn from_times(start: Time, end: Time) -> Self {
        TimeWindow {
            start: seconds_from_midnight(start),
            end: seconds_from_midnight(end),
        }
    }

    /// Opening hours of a location. Missing bounds open up to the full day, a closing time
    /// before the opening time falls back to the full day.
    pub fn from_opening_hours(opening: Option<Time>, closing: Option<Time>) -> Self {
        let window = TimeWindow {
            start: opening.map_or(0, seconds_from_midnight),
            end: closing.map_or(SECONDS_PER_DAY, seconds_from_midnight),
        };

        if window.is_empty() {
            TimeWindow::FULL_DAY
        } else {
            window
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, time: i64) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn intersection(&self, other: &TimeWindow) -> Option<TimeWindow> {
        let intersection = TimeWindow {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        };

        (!intersection.is_empty()).then_some(intersection)
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.intersection(other).is_some()
    }
}
