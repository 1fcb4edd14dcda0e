//! Health tracker entities.
//!
//! Field names are serialized in camelCase so documents stay compatible with
//! the `vt_patients` / `vt_records` layout.

use serde::{Deserialize, Serialize};

/// The signed-in user. The email address is the identity; there is no password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id (equal to the email address for locally created users).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl User {
    /// Build a user from an email address, defaulting the name to the local part.
    #[must_use]
    pub fn from_email(email: &str, name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(
                || email.split('@').next().unwrap_or(email).to_string(),
                str::to_string,
            );
        Self {
            id: email.to_string(),
            name,
            email: email.to_string(),
        }
    }
}

/// Gender recorded on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other or unspecified.
    #[default]
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A tracked individual whose vitals are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProfile {
    /// Profile id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// ISO date of birth (`YYYY-MM-DD`).
    pub date_of_birth: String,
    /// Blood type such as `A+`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Id of the user who created the profile.
    pub owner_id: String,
    /// Emails granted access to this profile.
    #[serde(default)]
    pub shared_with: Vec<String>,
}

impl HealthProfile {
    /// Whether `user` may see this profile: owner, or listed in `shared_with`.
    #[must_use]
    pub fn is_visible_to(&self, user: &User) -> bool {
        self.owner_id == user.id || self.shared_with.iter().any(|e| *e == user.email)
    }

    /// Whether `user` owns this profile.
    #[must_use]
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id == user.id
    }
}

/// One timestamped blood-pressure / heart-rate / oxygen-saturation reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalRecord {
    /// Record id.
    pub id: String,
    /// Owning profile id.
    pub patient_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Systolic pressure in mmHg.
    pub systolic: i32,
    /// Diastolic pressure in mmHg.
    pub diastolic: i32,
    /// Heart rate in bpm.
    pub heart_rate: i32,
    /// SpO2 in percent.
    pub oxygen_saturation: i32,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for creating a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProfile {
    /// Display name; blank becomes `Unknown`.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// ISO date of birth; `None` becomes today.
    pub date_of_birth: Option<String>,
    /// Blood type.
    pub blood_type: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

/// Input for adding a reading. Omitted values take the entry form defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecord {
    /// Owning profile id.
    pub patient_id: String,
    /// Epoch milliseconds; `None` means now.
    pub timestamp: Option<i64>,
    /// Systolic pressure, default 120.
    pub systolic: Option<i32>,
    /// Diastolic pressure, default 80.
    pub diastolic: Option<i32>,
    /// Heart rate, default 70.
    pub heart_rate: Option<i32>,
    /// SpO2, default 98.
    pub oxygen_saturation: Option<i32>,
    /// Notes.
    pub notes: Option<String>,
}

/// Entry form default for systolic pressure.
pub const DEFAULT_SYSTOLIC: i32 = 120;
/// Entry form default for diastolic pressure.
pub const DEFAULT_DIASTOLIC: i32 = 80;
/// Entry form default for heart rate.
pub const DEFAULT_HEART_RATE: i32 = 70;
/// Entry form default for oxygen saturation.
pub const DEFAULT_OXYGEN_SATURATION: i32 = 98;
