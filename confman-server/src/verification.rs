//! Two-channel account verification
//!
//! Registration issues one code per channel. The email code goes out through
//! the notifier; the phone channel is simulated, so its code is handed back
//! to the caller. A verify request is all-or-nothing: every supplied code is
//! checked before any flag is written.

use confman_common::auth::codes::codes_match;
use confman_common::auth::{generate_code, Channel};
use confman_common::db::User;
use confman_common::time;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{codes, users};
use crate::error::{ApiError, ApiResult};
use crate::notifier::EmailMessage;
use crate::AppState;

/// What happened to a freshly issued set of codes
#[derive(Debug, Clone)]
pub struct IssuedCodes {
    /// Email code accepted by the notifier
    pub email_delivered: Option<bool>,
    /// Simulated SMS: returned to the caller
    pub phone_code: Option<String>,
}

/// Issue codes for every channel the user has not verified yet
pub async fn issue_codes(state: &AppState, user: &User) -> ApiResult<IssuedCodes> {
    let mut issued = IssuedCodes {
        email_delivered: None,
        phone_code: None,
    };

    if !user.is_email_verified {
        issued.email_delivered = Some(issue_email(state, user).await?);
    }
    if !user.is_phone_verified {
        issued.phone_code = Some(issue_code(state, user.id, Channel::Phone).await?);
    }

    Ok(issued)
}

/// Re-issue one channel's code, replacing any outstanding one
pub async fn resend_code(state: &AppState, user: &User, channel: Channel) -> ApiResult<IssuedCodes> {
    let already_verified = match channel {
        Channel::Email => user.is_email_verified,
        Channel::Phone => user.is_phone_verified,
    };
    if already_verified {
        return Err(ApiError::validation(
            "channel",
            format!("{} is already verified", channel),
        ));
    }

    Ok(match channel {
        Channel::Email => IssuedCodes {
            email_delivered: Some(issue_email(state, user).await?),
            phone_code: None,
        },
        Channel::Phone => IssuedCodes {
            email_delivered: None,
            phone_code: Some(issue_code(state, user.id, Channel::Phone).await?),
        },
    })
}

async fn issue_code(state: &AppState, user_id: Uuid, channel: Channel) -> ApiResult<String> {
    let code = generate_code();
    let expires_at = time::now() + chrono::Duration::seconds(state.config.verification.code_ttl_secs);
    codes::upsert_code(&state.db, user_id, channel, &code, expires_at).await?;
    Ok(code)
}

/// Store and send the email code; delivery failure is reported, not raised
async fn issue_email(state: &AppState, user: &User) -> ApiResult<bool> {
    let code = issue_code(state, user.id, Channel::Email).await?;
    let message = EmailMessage::verification_code(&user.email, &user.username, &code);

    match state.notifier.send(&message).await {
        Ok(()) => Ok(true),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Verification email not delivered");
            Ok(false)
        }
    }
}

/// Check the supplied codes and, if all match, set the matching flags
///
/// Codes for channels that are already verified are ignored.
pub async fn verify_codes(
    state: &AppState,
    user_id: Uuid,
    email_code: Option<&str>,
    phone_code: Option<&str>,
) -> ApiResult<User> {
    if email_code.is_none() && phone_code.is_none() {
        return Err(ApiError::validation("code", "emailCode or phoneCode is required"));
    }

    let user = users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    let supplied = [
        (Channel::Email, email_code, user.is_email_verified),
        (Channel::Phone, phone_code, user.is_phone_verified),
    ];
    let stored = codes::get_codes(&state.db, user_id).await?;
    let now = time::now();

    let mut matched = Vec::new();
    for (channel, submitted, verified) in supplied {
        let Some(submitted) = submitted else { continue };
        if verified {
            continue;
        }

        let field = channel.code_field();
        let Some(code) = stored.iter().find(|c| c.channel == channel) else {
            return Err(ApiError::validation(field, "no active code; request a new one"));
        };
        if code.is_expired(now) {
            return Err(ApiError::validation(field, "code expired"));
        }
        if !codes_match(submitted, &code.code) {
            let discarded = codes::record_failure(
                &state.db,
                user_id,
                channel,
                state.config.verification.max_attempts,
            )
            .await?;
            warn!(user_id = %user_id, %channel, discarded, "Verification code mismatch");
            let message = if discarded {
                "too many failed attempts; request a new code"
            } else {
                "invalid verification code"
            };
            return Err(ApiError::validation(field, message));
        }
        matched.push(channel);
    }

    if matched.is_empty() {
        return Ok(user);
    }

    let mut tx = state.db.begin().await?;
    users::mark_verified(
        &mut tx,
        user_id,
        matched.contains(&Channel::Email),
        matched.contains(&Channel::Phone),
    )
    .await?;
    for channel in &matched {
        codes::delete_code(&mut tx, user_id, *channel).await?;
    }
    tx.commit().await?;

    info!(user_id = %user_id, channels = ?matched, "Verification channels confirmed");

    users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}
