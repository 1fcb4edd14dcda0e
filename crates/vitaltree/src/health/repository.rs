//! Health tracker persistence.
//!
//! [`HealthRepository`] reads and writes the `vt_user`, `vt_patients` and
//! `vt_records` collections. Each mutation loads the whole collection, edits
//! it in memory, and writes it back.

use chrono::{Local, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::{
    load_collection, load_json, save_json, KeyValueStore, PROFILES_KEY, RECORDS_KEY, USER_KEY,
};

use super::accessors;
use super::model::{
    HealthProfile, NewProfile, NewRecord, User, VitalRecord, DEFAULT_DIASTOLIC,
    DEFAULT_HEART_RATE, DEFAULT_OXYGEN_SATURATION, DEFAULT_SYSTOLIC,
};

/// Health tracker operations over a key-value store.
#[derive(Debug)]
pub struct HealthRepository<S> {
    store: S,
}

impl<S: KeyValueStore> HealthRepository<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // === Session ===

    /// Sign in with an email address. No verification takes place.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank email, or a store error.
    pub fn login(&self, email: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::validation("email must not be empty"));
        }
        let user = User::from_email(email, name);
        save_json(&self.store, USER_KEY, &user)?;
        info!("Logged in as {}", user.email);
        Ok(user)
    }

    /// The persisted session user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session cannot be read.
    pub fn current_user(&self) -> Result<Option<User>> {
        load_json(&self.store, USER_KEY)
    }

    /// Like [`current_user`](Self::current_user) but fails when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotLoggedIn`] when there is no session.
    pub fn require_user(&self) -> Result<User> {
        self.current_user()?.ok_or(Error::NotLoggedIn)
    }

    /// Clear the session. Returns `true` if someone was signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn logout(&self) -> Result<bool> {
        self.store.remove(USER_KEY)
    }

    // === Profiles ===

    /// All stored profiles, regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn profiles(&self) -> Result<Vec<HealthProfile>> {
        load_collection(&self.store, PROFILES_KEY)
    }

    /// Profiles `user` may see.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn profiles_visible_to(&self, user: &User) -> Result<Vec<HealthProfile>> {
        let profiles = self.profiles()?;
        Ok(accessors::profiles_visible_to(&profiles, user)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Look up a profile by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn profile(&self, id: &str) -> Result<Option<HealthProfile>> {
        Ok(self.profiles()?.into_iter().find(|p| p.id == id))
    }

    fn require_profile(&self, id: &str) -> Result<HealthProfile> {
        self.profile(id)?
            .ok_or_else(|| Error::not_found("profile", id))
    }

    /// Insert or replace a profile by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    pub fn save_profile(&self, profile: &HealthProfile) -> Result<()> {
        let mut profiles = self.profiles()?;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => existing.clone_from(profile),
            None => profiles.push(profile.clone()),
        }
        save_json(&self.store, PROFILES_KEY, &profiles)?;
        debug!("Saved profile {}", profile.id);
        Ok(())
    }

    /// Create a profile owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    pub fn create_profile(&self, input: NewProfile, owner: &User) -> Result<HealthProfile> {
        let name = input.name.trim();
        let profile = HealthProfile {
            id: Uuid::new_v4().to_string(),
            name: if name.is_empty() {
                "Unknown".to_string()
            } else {
                name.to_string()
            },
            gender: input.gender,
            date_of_birth: input
                .date_of_birth
                .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string()),
            blood_type: input.blood_type.filter(|b| !b.is_empty()),
            notes: input.notes.filter(|n| !n.is_empty()),
            owner_id: owner.id.clone(),
            shared_with: Vec::new(),
        };
        self.save_profile(&profile)?;
        info!("Created profile {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Grant `email` access to a profile. Any string is accepted; an email that
    /// is already listed is not added twice.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown profile, or a store error.
    pub fn share_profile(&self, profile_id: &str, email: &str) -> Result<HealthProfile> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::validation("email must not be empty"));
        }
        let mut profile = self.require_profile(profile_id)?;
        if !profile.shared_with.iter().any(|e| e == email) {
            profile.shared_with.push(email.to_string());
            self.save_profile(&profile)?;
        }
        Ok(profile)
    }

    /// Revoke `email`'s access to a profile.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown profile, or a store error.
    pub fn unshare_profile(&self, profile_id: &str, email: &str) -> Result<HealthProfile> {
        let email = email.trim();
        let mut profile = self.require_profile(profile_id)?;
        let before = profile.shared_with.len();
        profile.shared_with.retain(|e| e != email);
        if profile.shared_with.len() != before {
            self.save_profile(&profile)?;
        }
        Ok(profile)
    }

    /// Delete a profile together with all of its readings.
    ///
    /// Returns the number of readings removed.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown profile, or a store error.
    pub fn delete_profile(&self, profile_id: &str) -> Result<usize> {
        let mut profiles = self.profiles()?;
        let before = profiles.len();
        profiles.retain(|p| p.id != profile_id);
        if profiles.len() == before {
            return Err(Error::not_found("profile", profile_id));
        }

        let mut records = self.records()?;
        let record_count = records.len();
        records.retain(|r| r.patient_id != profile_id);
        let removed = record_count - records.len();

        save_json(&self.store, PROFILES_KEY, &profiles)?;
        save_json(&self.store, RECORDS_KEY, &records)?;
        info!("Deleted profile {profile_id} and {removed} readings");
        Ok(removed)
    }

    // === Records ===

    /// All stored readings in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn records(&self) -> Result<Vec<VitalRecord>> {
        load_collection(&self.store, RECORDS_KEY)
    }

    /// Append a reading. Omitted values take the entry form defaults.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown profile, or a store error.
    pub fn add_record(&self, input: NewRecord) -> Result<VitalRecord> {
        self.require_profile(&input.patient_id)?;

        let record = VitalRecord {
            id: Uuid::new_v4().to_string(),
            patient_id: input.patient_id,
            timestamp: input
                .timestamp
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            systolic: input.systolic.unwrap_or(DEFAULT_SYSTOLIC),
            diastolic: input.diastolic.unwrap_or(DEFAULT_DIASTOLIC),
            heart_rate: input.heart_rate.unwrap_or(DEFAULT_HEART_RATE),
            oxygen_saturation: input
                .oxygen_saturation
                .unwrap_or(DEFAULT_OXYGEN_SATURATION),
            notes: input.notes.filter(|n| !n.is_empty()),
        };

        let mut records = self.records()?;
        records.push(record.clone());
        save_json(&self.store, RECORDS_KEY, &records)?;
        debug!("Added reading {} to {}", record.id, record.patient_id);
        Ok(record)
    }

    /// Remove a reading by id. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    pub fn delete_record(&self, record_id: &str) -> Result<bool> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Ok(false);
        }
        save_json(&self.store, RECORDS_KEY, &records)?;
        Ok(true)
    }

    /// Readings for a profile, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn records_for(&self, profile_id: &str) -> Result<Vec<VitalRecord>> {
        let records = self.records()?;
        Ok(accessors::records_for(&records, profile_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Readings for a profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn records_for_desc(&self, profile_id: &str) -> Result<Vec<VitalRecord>> {
        let records = self.records()?;
        Ok(accessors::records_for_desc(&records, profile_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The latest reading for a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn last_record_for(&self, profile_id: &str) -> Result<Option<VitalRecord>> {
        let records = self.records()?;
        Ok(accessors::last_record_for(&records, profile_id).cloned())
    }
}
