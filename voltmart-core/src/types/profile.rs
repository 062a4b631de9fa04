//! User profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::Cacheable;

/// A marketplace member as shown on listing detail and profile screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Backend-assigned identifier
    pub id: Uuid,
    /// Public display name
    pub display_name: String,
    /// Avatar URL, if uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Number of listings currently active
    #[serde(default)]
    pub active_listings: u32,
    /// Member since
    pub joined_at: DateTime<Utc>,
}

impl Cacheable for Profile {
    const KIND: &'static str = "Profile";

    fn cache_id(&self) -> String {
        self.id.to_string()
    }
}
