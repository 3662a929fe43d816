use std::collections::BTreeSet;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Rejected attempt to build a [`Principal`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("principal user id must not be blank")]
    BlankUserId,
}

/// `Principal` is the verified identity of the caller for one request.
///
/// Produced by token validation upstream of the team access subsystem and
/// consumed read-only here. Directory lookups by email require `email`; the
/// legacy fallback reads `groups`. `user_id` is never blank, so it is safe
/// to key per-caller state on it.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(try_from = "PrincipalRepr")]
pub struct Principal {
    /// Stable user identifier (e.g. the directory object id or `NAVident`).
    user_id: String,
    /// Human-readable name, for audit logs only.
    display_name: String,
    /// Email, if the token carried one.
    #[serde(default)]
    email: Option<String>,
    /// External-directory group identifiers asserted by the token.
    #[serde(default)]
    groups: BTreeSet<String>,
    /// Original bearer token, forwarded for "current caller" directory queries.
    /// Never serialized; `SecretString` redacts it in `Debug`.
    #[serde(skip)]
    bearer_token: Option<SecretString>,
}

impl Principal {
    /// Create a new `Principal` builder
    #[must_use]
    pub fn builder() -> PrincipalBuilder {
        PrincipalBuilder::default()
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Email used as the directory lookup key.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Get the original bearer token (for "current caller" forwarding).
    #[must_use]
    pub fn bearer_token(&self) -> Option<&SecretString> {
        self.bearer_token.as_ref()
    }
}

#[derive(Default)]
pub struct PrincipalBuilder {
    user_id: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
    groups: BTreeSet<String>,
    bearer_token: Option<SecretString>,
}

impl PrincipalBuilder {
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the email. Blank values are treated as "no email".
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        let trimmed = email.trim();
        self.email = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    #[must_use]
    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.groups.insert(group_id.into());
        self
    }

    #[must_use]
    pub fn groups<I, S>(mut self, group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(group_ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`PrincipalError::BlankUserId`] when no non-blank user id was set.
    pub fn build(self) -> Result<Principal, PrincipalError> {
        let user_id = self
            .user_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or(PrincipalError::BlankUserId)?;
        Ok(Principal {
            display_name: self.display_name.unwrap_or_else(|| user_id.clone()),
            user_id,
            email: self.email,
            groups: self.groups,
            bearer_token: self.bearer_token,
        })
    }
}

#[derive(Deserialize)]
struct PrincipalRepr {
    user_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    groups: BTreeSet<String>,
}

impl TryFrom<PrincipalRepr> for Principal {
    type Error = PrincipalError;

    fn try_from(repr: PrincipalRepr) -> Result<Self, Self::Error> {
        let mut builder = Principal::builder().user_id(repr.user_id).groups(repr.groups);
        if let Some(display_name) = repr.display_name {
            builder = builder.display_name(display_name);
        }
        if let Some(email) = repr.email {
            builder = builder.email(email);
        }
        builder.build()
    }
}
