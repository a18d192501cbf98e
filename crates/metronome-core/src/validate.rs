use std::time::Duration;

use crate::TimingError;

const NEGATIVE: &str = "must not be negative";
const TOO_LARGE: &str = "is too large";

/// Largest seconds count a timespec holds (time_t is a signed 64-bit integer)
const MAX_OS_SECONDS: u64 = i64::MAX as u64;

/// Fractional seconds as a Duration, rejecting negative, NaN, infinite and
/// unrepresentable values
pub(crate) fn seconds(what: &'static str, secs: f64) -> Result<Duration, TimingError> {
    if secs.is_nan() || secs.is_infinite() {
        return Err(TimingError::invalid(what, secs, "must be a finite number"));
    }
    if secs < 0.0 {
        return Err(TimingError::invalid(what, secs, NEGATIVE));
    }
    // 2^63 as f64; anything at or past it can't be a signed 64-bit time_t
    if secs >= MAX_OS_SECONDS as f64 {
        return Err(TimingError::invalid(what, secs, TOO_LARGE));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| TimingError::invalid(what, secs, TOO_LARGE))
}

/// A Duration the kernel can take as a timespec
pub(crate) fn duration(what: &'static str, duration: Duration) -> Result<Duration, TimingError> {
    if duration.as_secs() > MAX_OS_SECONDS {
        return Err(TimingError::invalid(what, format!("{duration:?}"), TOO_LARGE));
    }
    Ok(duration)
}

/// Whole seconds as accepted by alarm(2)
pub(crate) fn whole_seconds(what: &'static str, secs: i64) -> Result<u32, TimingError> {
    if secs < 0 {
        return Err(TimingError::invalid(what, secs, NEGATIVE));
    }
    u32::try_from(secs).map_err(|_| TimingError::invalid(what, secs, TOO_LARGE))
}

pub(crate) fn micros(what: &'static str, micros: i64) -> Result<u64, TimingError> {
    u64::try_from(micros).map_err(|_| TimingError::invalid(what, micros, NEGATIVE))
}

/// A period must be at least one microsecond; zero would disarm the timer
pub(crate) fn period(what: &'static str, period: Duration) -> Result<u64, TimingError> {
    match u64::try_from(period.as_micros()) {
        Ok(0) => Err(TimingError::invalid(
            what,
            format!("{period:?}"),
            "must be at least one microsecond",
        )),
        Ok(micros) => Ok(micros),
        Err(_) => Err(TimingError::invalid(what, format!("{period:?}"), TOO_LARGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_accepts_fractions() {
        assert_eq!(seconds("d", 1.25).unwrap(), Duration::from_millis(1250));
        assert_eq!(seconds("d", 0.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_seconds_rejects_bad_values() {
        for bad in [-0.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert!(matches!(
                seconds("d", bad),
                Err(TimingError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn test_seconds_beyond_time_t_are_rejected() {
        // Fits a Duration but not a signed 64-bit time_t
        assert!(matches!(
            seconds("d", 1e19),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(seconds("d", 9.0e18).is_ok());
    }

    #[test]
    fn test_duration_beyond_time_t_is_rejected() {
        assert!(duration("d", Duration::from_secs(u64::MAX)).is_err());
        assert!(duration("d", Duration::from_secs(i64::MAX as u64)).is_ok());
    }

    #[test]
    fn test_whole_seconds_range() {
        assert_eq!(whole_seconds("d", 3).unwrap(), 3);
        assert!(whole_seconds("d", -1).is_err());
        assert!(whole_seconds("d", i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_period_rejects_sub_microsecond() {
        assert!(period("step", Duration::from_nanos(999)).is_err());
        assert_eq!(period("step", Duration::from_millis(2)).unwrap(), 2000);
    }
}
