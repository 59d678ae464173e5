/// Institution ID recorded when Link does not report which institution was
/// linked.
pub const UNKNOWN_INSTITUTION: &str = "unknown_institution";

/// The long-lived access token for a single linked institution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub institution_id: String,
    pub access_token: String,
}

impl Credential {
    pub fn new(institution_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            institution_id: institution_id.into(),
            access_token: access_token.into(),
        }
    }

    /// The access token with everything but its last four characters hidden.
    pub fn masked_token(&self) -> String {
        let visible = self.access_token.len().saturating_sub(4);
        match self.access_token.get(visible..) {
            Some(tail) if visible > 0 => format!("****{}", tail),
            _ => "****".to_string(),
        }
    }
}
