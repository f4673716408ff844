use std::collections::{BTreeMap, HashMap};

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::error::ServerError;
use crate::state::AppState;

/// Authenticated caller, attached to the request as an extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

/// Credentials presented with a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Basic { user: String, password: String },
    Anonymous,
}

impl Credentials {
    /// Extract HTTP Basic credentials from request headers.
    ///
    /// A missing or malformed `Authorization` header yields `Anonymous`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic)
            .unwrap_or(Self::Anonymous)
    }
}

fn parse_basic(value: &str) -> Option<Credentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some(Credentials::Basic {
        user: user.to_string(),
        password: password.to_string(),
    })
}

/// Table of accepted Basic-auth users.
///
/// Only BLAKE3 digests of the passwords are kept; digests compare in
/// constant time.
#[derive(Clone, Default)]
pub struct CredentialTable {
    users: HashMap<String, blake3::Hash>,
}

impl CredentialTable {
    pub fn new(users: &BTreeMap<String, String>) -> Self {
        Self {
            users: users
                .iter()
                .map(|(user, password)| (user.clone(), blake3::hash(password.as_bytes())))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Resolve credentials to an identity, or `None` if they are not accepted.
    pub fn authenticate(&self, credentials: &Credentials) -> Option<Identity> {
        let Credentials::Basic { user, password } = credentials else {
            return None;
        };
        let expected = self.users.get(user)?;
        (*expected == blake3::hash(password.as_bytes())).then(|| Identity { name: user.clone() })
    }
}

impl std::fmt::Debug for CredentialTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialTable")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reject requests that do not carry accepted Basic credentials.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::from_headers(request.headers());
    match state.credentials.authenticate(&credentials) {
        Some(identity) => {
            debug!(user = %identity.name, "authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            if let Credentials::Basic { user, .. } = &credentials {
                warn!(%user, "rejected credentials");
            }
            ServerError::Unauthorized.into_response()
        }
    }
}
