//! Shareable assignment links.
//!
//! A teacher pairs a student name with round settings; the pair travels as an
//! opaque `assignment` query parameter. Decoding never fails loudly: a bad
//! token simply means there is no assignment.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use url::Url;

use math_core::model::GameSettings;

use crate::error::AssignmentError;

pub const QUERY_KEY: &str = "assignment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub student_name: String,
    pub settings: GameSettings,
}

impl Assignment {
    #[must_use]
    pub fn new(student_name: impl Into<String>, settings: GameSettings) -> Self {
        Self {
            student_name: student_name.into(),
            settings,
        }
    }
}

/// JSON, then URL-safe base64 without padding.
///
/// # Errors
///
/// Returns `AssignmentError::Encode` if serialization fails.
pub fn encode_assignment(assignment: &Assignment) -> Result<String, AssignmentError> {
    let json = serde_json::to_vec(assignment)?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(json))
}

/// Inverse of [`encode_assignment`].
///
/// Standard padded base64 is accepted too. Tokens that do not decode to valid
/// settings yield `None`.
#[must_use]
pub fn decode_assignment(token: &str) -> Option<Assignment> {
    let token = token.trim();
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .or_else(|_| general_purpose::STANDARD.decode(token))
        .map_err(|err| tracing::warn!(error = %err, "assignment token is not base64"))
        .ok()?;
    let assignment: Assignment = serde_json::from_slice(&bytes)
        .map_err(|err| tracing::warn!(error = %err, "assignment token is not valid json"))
        .ok()?;
    if let Err(err) = assignment.settings.validate() {
        tracing::warn!(error = %err, "assignment carries invalid settings");
        return None;
    }
    Some(assignment)
}

/// Append the encoded assignment to `base_url`, keeping existing query pairs.
///
/// # Errors
///
/// Returns `AssignmentError` if `base_url` is not a URL or encoding fails.
pub fn assignment_link(base_url: &str, assignment: &Assignment) -> Result<String, AssignmentError> {
    let mut url = Url::parse(base_url)?;
    let token = encode_assignment(assignment)?;
    url.query_pairs_mut().append_pair(QUERY_KEY, &token);
    Ok(url.into())
}

/// Read an assignment out of a link; `None` when absent or corrupt.
#[must_use]
pub fn assignment_from_url(link: &str) -> Option<Assignment> {
    let url = Url::parse(link).ok()?;
    let token = url
        .query_pairs()
        .find(|(key, _)| key == QUERY_KEY)
        .map(|(_, value)| value.into_owned())?;
    decode_assignment(&token)
}
