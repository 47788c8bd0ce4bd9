//! Age-based group assignment.

use chrono::{Datelike, NaiveDate};

/// The age bounds of a group, as stored in `groups.age_range_min/max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeBand<Id> {
    pub id: Id,
    pub min_age: i32,
    pub max_age: i32,
}

/// Whole years between `dob` and `on`. Negative when `dob` is in the future.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Pick the group whose inclusive age range contains `age`.
///
/// Bands are checked in ascending `min_age` order, so overlapping ranges
/// resolve to the youngest group.
pub fn select_group_for_age<Id: Clone>(bands: &[AgeBand<Id>], age: i32) -> Option<Id> {
    let mut sorted: Vec<&AgeBand<Id>> = bands.iter().collect();
    sorted.sort_by_key(|b| b.min_age);
    sorted
        .into_iter()
        .find(|b| b.min_age <= age && age <= b.max_age)
        .map(|b| b.id.clone())
}

/// Validate a group's age range.
pub fn validate_age_range(min_age: i32, max_age: i32) -> Result<(), String> {
    if min_age < 0 {
        return Err("ageRangeMin must not be negative".to_string());
    }
    if min_age > max_age {
        return Err("ageRangeMin must not exceed ageRangeMax".to_string());
    }
    Ok(())
}

/// Whether a child of `gender` may join a session with `restriction`.
///
/// No restriction (or `"all"`/`"mixed"`) admits everyone; a child with no
/// recorded gender only matches unrestricted sessions.
pub fn gender_allowed(restriction: Option<&str>, gender: Option<&str>) -> bool {
    let restriction = match restriction.map(str::trim) {
        None | Some("") => return true,
        Some(r) if r.eq_ignore_ascii_case("all") || r.eq_ignore_ascii_case("mixed") => {
            return true
        }
        Some(r) => r,
    };
    gender.is_some_and(|g| g.trim().eq_ignore_ascii_case(restriction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bands() -> Vec<AgeBand<&'static str>> {
        vec![
            AgeBand { id: "juniors", min_age: 7, max_age: 10 },
            AgeBand { id: "little-lambs", min_age: 0, max_age: 3 },
            AgeBand { id: "preschool", min_age: 3, max_age: 6 },
        ]
    }

    #[test]
    fn age_counts_completed_birthdays() {
        assert_eq!(age_on(date(2020, 6, 15), date(2026, 6, 14)), 5);
        assert_eq!(age_on(date(2020, 6, 15), date(2026, 6, 15)), 6);
        assert_eq!(age_on(date(2020, 2, 29), date(2025, 2, 28)), 4);
    }

    #[test]
    fn selects_youngest_matching_band() {
        let bands = bands();
        assert_eq!(select_group_for_age(&bands, 1), Some("little-lambs"));
        assert_eq!(select_group_for_age(&bands, 3), Some("little-lambs"));
        assert_eq!(select_group_for_age(&bands, 5), Some("preschool"));
        assert_eq!(select_group_for_age(&bands, 10), Some("juniors"));
    }

    #[test]
    fn no_band_for_out_of_range_age() {
        assert_eq!(select_group_for_age(&bands(), 14), None);
        assert_eq!(select_group_for_age::<&str>(&[], 5), None);
    }

    #[test]
    fn age_range_validation() {
        assert!(validate_age_range(3, 6).is_ok());
        assert!(validate_age_range(4, 4).is_ok());
        assert!(validate_age_range(7, 3).is_err());
        assert!(validate_age_range(-1, 3).is_err());
    }

    #[test]
    fn gender_restriction() {
        assert!(gender_allowed(None, None));
        assert!(gender_allowed(Some("all"), Some("male")));
        assert!(gender_allowed(Some("Female"), Some("female")));
        assert!(!gender_allowed(Some("female"), Some("male")));
        assert!(!gender_allowed(Some("female"), None));
    }
}
