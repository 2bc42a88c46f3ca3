use chrono::{Local, NaiveDateTime, TimeDelta};

use crate::error::ScheduleError;

/// How far ahead of the reference instant an appointment may be booked.
pub const BOOKING_WINDOW_DAYS: i64 = 7;

/// Checks that `requested` lies inside the booking window `(now, now + 7 days]`.
///
/// The lower bound is exclusive: an appointment exactly at `now` is rejected.
/// The upper bound is a plain 7 x 24h offset from `now`, not truncated to a
/// calendar day. Near the end of the representable range, where that offset
/// does not exist, there is no upper bound.
pub fn validate(requested: NaiveDateTime, now: NaiveDateTime) -> Result<(), ScheduleError> {
    if requested <= now {
        return Err(ScheduleError::PastDate { requested, now });
    }

    let Some(latest) = now.checked_add_signed(TimeDelta::days(BOOKING_WINDOW_DAYS)) else {
        return Ok(());
    };
    if requested > latest {
        return Err(ScheduleError::TooFarAhead { requested, latest });
    }

    Ok(())
}

/// Same as [`validate`] against the local wall clock.
pub fn validate_now(requested: NaiveDateTime) -> Result<(), ScheduleError> {
    validate(requested, Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(22, 10, 0, 0)
    }

    #[test]
    fn test_validate_rejects_exactly_now() {
        assert_eq!(
            validate(now(), now()),
            Err(ScheduleError::PastDate {
                requested: now(),
                now: now()
            })
        );
    }

    #[test]
    fn test_validate_rejects_five_minutes_ago() {
        let err = validate(at(22, 9, 55, 0), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::PastDate { .. }));
    }

    #[test]
    fn test_validate_accepts_one_second_after_now() {
        assert!(validate(at(22, 10, 0, 1), now()).is_ok());
    }

    #[test]
    fn test_validate_accepts_exactly_seven_days_ahead() {
        assert!(validate(at(29, 10, 0, 0), now()).is_ok());
    }

    #[test]
    fn test_validate_rejects_seven_days_and_one_second() {
        let err = validate(at(29, 10, 0, 1), now()).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::TooFarAhead {
                requested: at(29, 10, 0, 1),
                latest: at(29, 10, 0, 0),
            }
        );
    }

    #[test]
    fn test_validate_window_is_not_calendar_truncated() {
        // Later on day +7 than the reference hour is already out of range.
        assert!(validate(at(29, 23, 0, 0), now()).is_err());
        assert!(validate(at(29, 9, 59, 59), now()).is_ok());
    }

    #[test]
    fn test_validate_at_the_end_of_the_calendar() {
        let now = NaiveDateTime::MAX - TimeDelta::days(1);
        assert!(validate(NaiveDateTime::MAX, now).is_ok());
        assert!(matches!(
            validate(now, NaiveDateTime::MAX),
            Err(ScheduleError::PastDate { .. })
        ));
        assert!(validate(NaiveDateTime::MAX, NaiveDateTime::MAX).is_err());
    }

    #[test]
    fn test_validate_now_rejects_the_distant_past() {
        assert!(validate_now(at(1, 0, 0, 0)).is_err());
    }
}
