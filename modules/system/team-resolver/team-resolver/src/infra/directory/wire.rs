//! GraphQL request/response shapes of the team-membership directory.

use access_security::TeamSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use team_resolver_sdk::LookupError;

pub const TEAMS_BY_EMAIL: &str = "query($email: String!) { \
    user(email: $email) { teams(first: 100) { nodes { team { slug } } } } }";

pub const TEAMS_OF_CALLER: &str = "query { \
    me { __typename ... on User { teams(first: 100) { nodes { team { slug } } } } } }";

/// `__typename` of a human user in the caller shape.
pub const USER_TYPENAME: &str = "User";

#[derive(Debug, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Value,
    #[serde(skip)]
    pub operation: &'static str,
}

impl GraphQlRequest {
    #[must_use]
    pub fn teams_by_email(email: &str) -> Self {
        Self {
            query: TEAMS_BY_EMAIL,
            variables: serde_json::json!({ "email": email }),
            operation: "teams_by_email",
        }
    }

    #[must_use]
    pub fn teams_of_caller() -> Self {
        Self {
            query: TEAMS_OF_CALLER,
            variables: serde_json::json!({}),
            operation: "teams_of_caller",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<RemoteError>>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ByEmailData {
    user: Option<TeamsHolder>,
}

#[derive(Debug, Deserialize)]
struct CallerData {
    me: Option<Caller>,
}

#[derive(Debug, Deserialize)]
struct Caller {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    teams: Option<Connection>,
}

#[derive(Debug, Deserialize)]
struct TeamsHolder {
    teams: Option<Connection>,
}

#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(default)]
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    team: Option<TeamRef>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    slug: String,
}

impl Connection {
    fn slugs(conn: Option<Self>) -> TeamSet {
        conn.map(|c| c.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|node| node.team.map(|t| t.slug))
            .collect()
    }
}

/// Decode the envelope and surface embedded application errors.
///
/// An `errors` list wins over any partial `data`.
fn open<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<Option<T>, LookupError> {
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    match envelope.errors {
        Some(errors) if !errors.is_empty() => Err(LookupError::Remote(
            errors.into_iter().map(|e| e.message).collect(),
        )),
        _ => Ok(envelope.data),
    }
}

/// Team set of a by-email response. An unknown user is an empty set.
pub fn parse_by_email(body: &[u8]) -> Result<TeamSet, LookupError> {
    let data = open::<ByEmailData>(body)?
        .ok_or_else(|| LookupError::Decode("response has neither data nor errors".to_owned()))?;
    Ok(Connection::slugs(data.user.and_then(|u| u.teams)))
}

/// Team set of a caller response. Non-user callers have no teams.
pub fn parse_caller(body: &[u8]) -> Result<TeamSet, LookupError> {
    let data = open::<CallerData>(body)?
        .ok_or_else(|| LookupError::Decode("response has neither data nor errors".to_owned()))?;
    match data.me {
        Some(caller) if caller.typename == USER_TYPENAME => Ok(Connection::slugs(caller.teams)),
        Some(caller) => {
            tracing::debug!(typename = %caller.typename, "Directory caller is not a user");
            Ok(TeamSet::new())
        }
        None => Ok(TeamSet::new()),
    }
}
