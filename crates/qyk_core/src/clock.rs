use chrono::{DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of the current instant and of the local wall-clock rules used to
/// turn an `hour:minute` into an instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Wall-clock reading of `instant` in the device's local time zone.
    fn local_naive(&self, instant: DateTime<Utc>) -> NaiveDateTime;

    /// Instant at which the local wall clock shows `local`.
    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc>;
}

/// Device clock in the system time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

// Longest DST gap we walk across before giving up on local rules.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_MAX_STEPS: usize = 12;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_naive(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc> {
        resolve_in_zone(&Local, local)
    }
}

/// Instant at which `zone`'s wall clock shows `local`. A time shown twice
/// (DST fall-back) resolves to its first occurrence; a time skipped by a
/// spring-forward gap moves to the first wall-clock time after it that exists.
pub fn resolve_in_zone<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = local;
    for _ in 0..GAP_MAX_STEPS {
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(at) => return at.with_timezone(&Utc),
            LocalResult::Ambiguous(first, second) => {
                return first.with_timezone(&Utc).min(second.with_timezone(&Utc));
            }
            LocalResult::None => candidate = candidate + Duration::minutes(GAP_STEP_MINUTES),
        }
    }
    tracing::warn!(%local, "local time could not be resolved, treating as UTC");
    Utc.from_utc_datetime(&local)
}

/// Clock pinned to a fixed UTC offset whose instant only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    offset: FixedOffset,
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(offset: FixedOffset, instant: DateTime<Utc>) -> Self {
        Self {
            offset,
            instant: Mutex::new(instant),
        }
    }

    /// Clock whose local wall time currently reads `local`.
    pub fn at_local(offset: FixedOffset, local: NaiveDateTime) -> Self {
        Self::new(offset, utc_for_offset(offset, local))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.instant.lock() = instant;
    }

    pub fn set_local(&self, local: NaiveDateTime) {
        self.set(self.resolve_local(local));
    }

    pub fn advance(&self, by: Duration) {
        let mut instant = self.instant.lock();
        *instant = *instant + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock()
    }

    fn local_naive(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc> {
        utc_for_offset(self.offset, local)
    }
}

fn utc_for_offset(offset: FixedOffset, local: NaiveDateTime) -> DateTime<Utc> {
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&(local - shift))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;

    fn local(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fixed_clock_round_trips_local_time() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let clock = FixedClock::at_local(offset, local(8, 59));
        assert_eq!(clock.local_naive(clock.now()), local(8, 59));
        assert_eq!(clock.now().naive_utc(), local(6, 59));
    }

    fn utc(month: u32, day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2025, month, day)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    fn new_york(month: u32, day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn repeated_local_time_resolves_to_first_occurrence() {
        // 01:30 happens at 05:30 UTC (EDT) and again at 06:30 UTC (EST).
        let resolved = resolve_in_zone(&New_York, new_york(11, 2, 1, 30));
        assert_eq!(resolved, utc(11, 2, 5, 30));
    }

    #[test]
    fn skipped_local_time_moves_to_end_of_gap() {
        // 02:00..03:00 does not exist; 03:00 EDT is 07:00 UTC.
        let resolved = resolve_in_zone(&New_York, new_york(3, 9, 2, 30));
        assert_eq!(resolved, utc(3, 9, 7, 0));
    }

    #[test]
    fn ordinary_local_time_resolves_directly() {
        let resolved = resolve_in_zone(&New_York, new_york(6, 10, 9, 0));
        assert_eq!(resolved, utc(6, 10, 13, 0));
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::at_local(FixedOffset::west_opt(5 * 3600).unwrap(), local(23, 30));
        clock.advance(Duration::hours(1));
        assert_eq!(
            clock.local_naive(clock.now()),
            NaiveDate::from_ymd_opt(2025, 3, 15)
                .unwrap()
                .and_hms_opt(0, 30, 0)
                .unwrap()
        );
    }
}
