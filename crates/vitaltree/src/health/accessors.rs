//! Pure read-side views over the health collections.
//!
//! Sorting uses a stable sort on `timestamp` only, so readings that share a
//! timestamp keep their insertion order. "Latest" means the maximum
//! timestamp, and among equal timestamps the one inserted last.

use super::model::{HealthProfile, User, VitalRecord};

/// Profiles owned by `user` or shared with the user's email, in stored order.
#[must_use]
pub fn profiles_visible_to<'a>(
    profiles: &'a [HealthProfile],
    user: &User,
) -> Vec<&'a HealthProfile> {
    profiles.iter().filter(|p| p.is_visible_to(user)).collect()
}

/// Readings for one profile, oldest first (chart order).
#[must_use]
pub fn records_for<'a>(records: &'a [VitalRecord], profile_id: &str) -> Vec<&'a VitalRecord> {
    let mut selected: Vec<&VitalRecord> = records
        .iter()
        .filter(|r| r.patient_id == profile_id)
        .collect();
    selected.sort_by_key(|r| r.timestamp);
    selected
}

/// Readings for one profile, newest first (history table order).
#[must_use]
pub fn records_for_desc<'a>(
    records: &'a [VitalRecord],
    profile_id: &str,
) -> Vec<&'a VitalRecord> {
    let mut selected = records_for(records, profile_id);
    selected.reverse();
    selected
}

/// The most recent reading for a profile, if any.
#[must_use]
pub fn last_record_for<'a>(
    records: &'a [VitalRecord],
    profile_id: &str,
) -> Option<&'a VitalRecord> {
    // max_by_key keeps the last of equal maxima
    records
        .iter()
        .filter(|r| r.patient_id == profile_id)
        .max_by_key(|r| r.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::model::Gender;

    fn record(id: &str, patient: &str, timestamp: i64) -> VitalRecord {
        VitalRecord {
            id: id.to_string(),
            patient_id: patient.to_string(),
            timestamp,
            systolic: 120,
            diastolic: 80,
            heart_rate: 70,
            oxygen_saturation: 98,
            notes: None,
        }
    }

    fn profile(id: &str, owner: &str, shared: &[&str]) -> HealthProfile {
        HealthProfile {
            id: id.to_string(),
            name: id.to_uppercase(),
            gender: Gender::Other,
            date_of_birth: "1980-01-01".to_string(),
            blood_type: None,
            notes: None,
            owner_id: owner.to_string(),
            shared_with: shared.iter().map(ToString::to_string).collect(),
        }
    }

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_visibility_filter() {
        let profiles = vec![profile("p", "u1", &["e2"])];

        assert_eq!(profiles_visible_to(&profiles, &user("u1", "e1")).len(), 1);
        assert_eq!(profiles_visible_to(&profiles, &user("u2", "e2")).len(), 1);
        assert!(profiles_visible_to(&profiles, &user("u3", "e3")).is_empty());
    }

    #[test]
    fn test_visibility_keeps_stored_order() {
        let profiles = vec![
            profile("a", "u1", &[]),
            profile("b", "u9", &[]),
            profile("c", "u9", &["e1"]),
        ];
        let ids: Vec<&str> = profiles_visible_to(&profiles, &user("u1", "e1"))
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_last_record_selection() {
        let records = vec![
            record("r100", "p", 100),
            record("r300", "p", 300),
            record("r200", "p", 200),
        ];
        assert_eq!(last_record_for(&records, "p").unwrap().id, "r300");
    }

    #[test]
    fn test_last_record_empty() {
        let records = vec![record("r1", "other", 5)];
        assert!(last_record_for(&records, "p").is_none());
    }

    #[test]
    fn test_last_record_tie_prefers_later_insert() {
        let records = vec![record("first", "p", 10), record("second", "p", 10)];
        assert_eq!(last_record_for(&records, "p").unwrap().id, "second");
    }

    #[test]
    fn test_records_for_sorted_ascending_and_filtered() {
        let records = vec![
            record("c", "p", 30),
            record("x", "q", 1),
            record("a", "p", 10),
            record("b", "p", 20),
        ];
        let ids: Vec<&str> = records_for(&records, "p")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_records_for_stable_on_ties() {
        let records = vec![record("one", "p", 5), record("two", "p", 5)];
        let ids: Vec<&str> = records_for(&records, "p")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_records_for_desc() {
        let records = vec![record("a", "p", 1), record("b", "p", 3), record("c", "p", 2)];
        let ids: Vec<&str> = records_for_desc(&records, "p")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        // Newest-first head agrees with last_record_for
        assert_eq!(ids[0], last_record_for(&records, "p").unwrap().id);
    }
}
