//! Outbound request auth material.
//!
//! The API transport is out of scope; this module stops at its boundary by
//! assembling everything an authenticated call must carry: the `Cookie`
//! header, the `SAPISIDHASH` authorization value, the account-index header,
//! and the optional brand-identity body field.

use serde_json::Value;
use tracing::instrument;

use crate::account::AccountAddressing;
use crate::signer::{self, SignerError};
use crate::sync::SessionSynchronizer;

/// Body field path carrying the brand identity token.
pub const ON_BEHALF_OF_FIELD: &str = "onBehalfOfUser";

/// Errors for auth material assembly.
#[derive(Debug, thiserror::Error)]
pub enum AuthMaterialError {
    /// No auth secret is visible for the request domain. The caller must
    /// treat this as "signed out", not as a signing failure.
    #[error("no authenticated session for this domain")]
    NoSession,

    /// Signing failed.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The request URL could not be reduced to a signable origin.
    #[error("request URL has no usable origin: {0}")]
    BadRequestUrl(String),
}

/// Everything the transport attaches to one authenticated request.
#[derive(Debug, Clone)]
pub struct AuthMaterial {
    /// `Cookie` header value.
    pub cookie_header: String,
    /// `Authorization` header value, `SAPISIDHASH` scheme included.
    pub authorization: String,
    /// `X-Goog-AuthUser` header value.
    pub auth_user_index: u32,
    /// Brand identity token for the request body, when brand addressing is
    /// active.
    pub on_behalf_of: Option<String>,
}

impl AuthMaterial {
    /// Writes the brand token into `context.user.onBehalfOfUser` of a
    /// request body. A body without the intermediate objects gains them;
    /// nothing is written when brand addressing is inactive.
    pub fn apply_to_body(&self, body: &mut Value) {
        let Some(token) = &self.on_behalf_of else {
            return;
        };
        let Some(root) = body.as_object_mut() else {
            return;
        };

        let context = root
            .entry("context")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        let Some(context) = context.as_object_mut() else {
            return;
        };

        let user = context
            .entry("user")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        let Some(user) = user.as_object_mut() else {
            return;
        };

        user.insert(ON_BEHALF_OF_FIELD.to_string(), Value::String(token.clone()));
    }
}

/// Assembles the auth material for a request to `request_url` at `now`.
///
/// The signing secret is looked up before anything is signed; its absence is
/// a distinct "please sign in" state rather than a signature failure.
///
/// # Errors
///
/// Returns [`AuthMaterialError::BadRequestUrl`] for a URL without an origin,
/// and [`AuthMaterialError::NoSession`] when the jar holds no auth secret
/// for the request domain.
#[instrument(level = "debug", skip(sync, accounts), fields(request_url))]
pub fn auth_material(
    sync: &SessionSynchronizer,
    accounts: &AccountAddressing,
    request_url: &str,
    now: u64,
) -> Result<AuthMaterial, AuthMaterialError> {
    let origin = signer::origin_of(request_url)
        .ok_or_else(|| AuthMaterialError::BadRequestUrl(request_url.to_string()))?;
    let domain = origin
        .split("://")
        .nth(1)
        .map(|host| host.split(':').next().unwrap_or(host).to_string())
        .ok_or_else(|| AuthMaterialError::BadRequestUrl(request_url.to_string()))?;

    let secret = sync
        .get_auth_secret(&domain)
        .ok_or(AuthMaterialError::NoSession)?;
    let cookie_header = sync
        .build_cookie_header(&domain)
        .ok_or(AuthMaterialError::NoSession)?;

    let authorization = signer::authorization_header(&secret, &origin, now)?;

    Ok(AuthMaterial {
        cookie_header,
        authorization,
        auth_user_index: accounts.auth_user_index(),
        on_behalf_of: accounts.brand_token(),
    })
}
