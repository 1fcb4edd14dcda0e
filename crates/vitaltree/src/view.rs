//! Current-screen state for both applications.
//!
//! Callers own the value and replace it with the result of a transition.
//! Nothing here is global.

use serde::{Deserialize, Serialize};

/// Which health tracker screen is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum HealthView {
    /// Email sign-in.
    #[default]
    Login,
    /// The list of visible profiles.
    Dashboard,
    /// One profile with its readings.
    ProfileDetail {
        /// Profile being shown.
        profile_id: String,
    },
}

impl HealthView {
    /// Initial view for a session state.
    #[must_use]
    pub fn initial(logged_in: bool) -> Self {
        if logged_in {
            Self::Dashboard
        } else {
            Self::Login
        }
    }

    /// Signing in always lands on the dashboard.
    #[must_use]
    pub fn after_login(self) -> Self {
        Self::Dashboard
    }

    /// Signing out always returns to the login screen.
    #[must_use]
    pub fn after_logout(self) -> Self {
        Self::Login
    }

    /// Open a profile's detail screen.
    #[must_use]
    pub fn open_profile(self, profile_id: impl Into<String>) -> Self {
        match self {
            Self::Login => Self::Login,
            Self::Dashboard | Self::ProfileDetail { .. } => Self::ProfileDetail {
                profile_id: profile_id.into(),
            },
        }
    }

    /// Leave the detail screen.
    #[must_use]
    pub fn back(self) -> Self {
        match self {
            Self::ProfileDetail { .. } => Self::Dashboard,
            other => other,
        }
    }

    /// The profile on screen, if any.
    #[must_use]
    pub fn profile_id(&self) -> Option<&str> {
        match self {
            Self::ProfileDetail { profile_id } => Some(profile_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for HealthView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Dashboard => write!(f, "dashboard"),
            Self::ProfileDetail { profile_id } => write!(f, "profile {profile_id}"),
        }
    }
}

/// Which family tree screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeView {
    /// Landing page.
    #[default]
    Home,
    /// The rendered diagram.
    View,
    /// People and family editor.
    Edit,
    /// Layout style editor.
    Settings,
}

impl TreeView {
    /// Every screen in menu order.
    pub const ALL: [Self; 4] = [Self::Home, Self::View, Self::Edit, Self::Settings];

    /// Switch to `target`. Any screen is reachable from any other.
    #[must_use]
    pub fn go(self, target: Self) -> Self {
        target
    }

    /// Back always means home.
    #[must_use]
    pub fn back(self) -> Self {
        Self::Home
    }
}

impl std::fmt::Display for TreeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Settings => write!(f, "settings"),
        }
    }
}
