#[cfg(test)]
#[path = "user_test.rs"]
mod user_test;

/// Identity of the local user, handed to the chat page by its host.
///
/// Read-only for the lifetime of the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser(String);

impl CurrentUser {
    /// Accept a raw `usuario` value; blank names are rejected.
    #[must_use]
    pub fn from_param(raw: Option<&str>) -> Option<Self> {
        let name = raw?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self(name.to_owned()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}
