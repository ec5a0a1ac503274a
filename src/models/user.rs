use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    // Digits with optional leading +, spaces, dashes and parentheses. Empty is allowed.
    static ref PHONE_REGEX: regex::Regex = regex::Regex::new(r"^(\+?[0-9][0-9 ()-]{2,24})?$").unwrap();
}

/// Application-side profile of a user. The identity record itself lives with
/// the identity provider; the two are created and deleted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Filled in by the service from the identity directory.
    #[serde(default)]
    pub user_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,
    #[validate(regex(path = "PHONE_REGEX", message = "Phone must contain digits, spaces, dashes or parentheses"))]
    #[serde(default)]
    pub phone: String,
    #[validate(length(max = 300))]
    #[serde(default)]
    pub address: String,
}
