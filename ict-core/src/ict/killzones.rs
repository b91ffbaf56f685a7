//! ICT kill zones: the UTC windows around session opens where liquidity
//! and volatility are highest. Grounded on `src/detectors/ict_killzones.py`.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

const LONDON_START: (u32, u32) = (8, 0);
const LONDON_END: (u32, u32) = (9, 0);
const NY_AM_START: (u32, u32) = (15, 0);
const NY_AM_END: (u32, u32) = (16, 0);
const NY_PM_START: (u32, u32) = (19, 0);
const NY_PM_END: (u32, u32) = (20, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillZone {
    London,
    NyAm,
    NyPm,
}

fn time_of(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("static kill zone boundary is always valid")
}

fn in_range(t: NaiveTime, start: (u32, u32), end: (u32, u32)) -> bool {
    t >= time_of(start.0, start.1) && t < time_of(end.0, end.1)
}

pub fn is_london_killzone(timestamp: DateTime<Utc>) -> bool {
    in_range(timestamp.time(), LONDON_START, LONDON_END)
}

pub fn is_newyork_killzone(timestamp: DateTime<Utc>) -> bool {
    in_range(timestamp.time(), NY_AM_START, NY_AM_END) || in_range(timestamp.time(), NY_PM_START, NY_PM_END)
}

/// The single active kill zone at `timestamp`, if any — kill zones never overlap.
pub fn get_active_killzone(timestamp: DateTime<Utc>) -> Option<KillZone> {
    let t = timestamp.time();
    if in_range(t, LONDON_START, LONDON_END) {
        Some(KillZone::London)
    } else if in_range(t, NY_AM_START, NY_AM_END) {
        Some(KillZone::NyAm)
    } else if in_range(t, NY_PM_START, NY_PM_END) {
        Some(KillZone::NyPm)
    } else {
        None
    }
}

pub fn is_killzone_active(timestamp: DateTime<Utc>) -> bool {
    get_active_killzone(timestamp).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 26, h, m, 0).unwrap()
    }

    #[test]
    fn london_killzone_is_0800_to_0859_utc() {
        assert!(!is_london_killzone(at(7, 59)));
        assert!(is_london_killzone(at(8, 0)));
        assert!(is_london_killzone(at(8, 59)));
        assert!(!is_london_killzone(at(9, 0)));
    }

    #[test]
    fn ny_sessions_cover_am_and_pm_windows() {
        assert!(is_newyork_killzone(at(15, 30)));
        assert!(is_newyork_killzone(at(19, 30)));
        assert!(!is_newyork_killzone(at(17, 0)));
    }

    #[test]
    fn active_killzone_identifies_the_specific_window() {
        assert_eq!(get_active_killzone(at(8, 30)), Some(KillZone::London));
        assert_eq!(get_active_killzone(at(15, 30)), Some(KillZone::NyAm));
        assert_eq!(get_active_killzone(at(19, 30)), Some(KillZone::NyPm));
        assert_eq!(get_active_killzone(at(12, 0)), None);
        assert!(!is_killzone_active(at(12, 0)));
    }
}
