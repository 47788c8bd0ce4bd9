//! Handlers for the `/auth` resource (login, MFA verification, logout).
//!
//! Login is two-step: a correct password yields an MFA challenge, and only
//! a verified challenge yields an access token.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use rkids_core::codes::{codes_match, generate_otp, OTP_LEN};
use rkids_core::notification::mfa_code_message;
use rkids_core::roles::normalize_role;
use rkids_db::models::user::UserResponse;
use rkids_db::repositories::UserRepo;
use rkids_events::MinistryEvent;
use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditEntry, ClientInfo, ACTION_LOGIN};
use crate::auth::jwt::{generate_access_token, generate_challenge_token, hash_challenge_token};
use crate::auth::password::verify_password;
use crate::codes::{self, CodePurpose, MfaChallenge, Redemption};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const MFA_EXPIRED: &str = "MFA code expired. Please login again.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Response to a successful password check: an MFA challenge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Opaque challenge token to send back with the code.
    pub token: String,
    #[serde(rename = "requiresMFA")]
    pub requires_mfa: bool,
    /// Only present when `EXPOSE_DEV_CODES` is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Request body for `POST /auth/verify-mfa`.
#[derive(Debug, Deserialize)]
pub struct VerifyMfaRequest {
    pub token: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/login
///
/// Check email + password and issue an MFA challenge. The six-digit code
/// is emailed to the user, or echoed in the response in development.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    let email = input
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    let password = input.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let user = UserRepo::find_for_login(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }

    // Invited users have no password until they accept the invitation.
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };
    let password_valid = verify_password(&password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let code = generate_otp(OTP_LEN);
    let (token, token_hash) = generate_challenge_token();
    let challenge = MfaChallenge {
        user_id: user.id,
        church_id: user.church_id,
        code: code.clone(),
    };
    let (_, expires_at) = codes::issue(
        state.codes.as_ref(),
        CodePurpose::Mfa,
        &challenge,
        state.config.codes.mfa_expiry_mins,
        || token_hash.clone(),
    )
    .await?;

    let expose = state.config.codes.expose_dev_codes;
    if !expose {
        state.event_bus.publish(
            MinistryEvent::new("auth.mfa_code", user.church_id, mfa_code_message(&code))
                .for_user(user.id),
        );
    }

    tracing::info!(user_id = %user.id, "MFA challenge issued");

    Ok(Json(DataResponse {
        data: LoginResponse {
            token,
            requires_mfa: true,
            otp_code: expose.then_some(code),
            expires_at,
        },
    }))
}

/// POST /api/auth/verify-mfa
///
/// Exchange a challenge token + code for an access token. A wrong code
/// leaves the challenge in place; an expired one is removed.
pub async fn verify_mfa(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<VerifyMfaRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let token = input
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized(MFA_EXPIRED))?;
    let submitted = input.code.as_deref().map(str::trim).unwrap_or_default();
    let key = hash_challenge_token(token);
    let now = Utc::now();

    let challenge: MfaChallenge =
        match codes::peek_valid(state.codes.as_ref(), CodePurpose::Mfa, &key, now).await? {
            Redemption::Valid(challenge) => challenge,
            Redemption::Expired | Redemption::Missing => {
                return Err(AppError::unauthorized(MFA_EXPIRED))
            }
        };

    if !codes_match(&challenge.code, submitted) {
        return Err(AppError::unauthorized("Invalid verification code"));
    }

    // A concurrent verification may have consumed it between peek and take.
    if state.codes.take(CodePurpose::Mfa, &key).await?.is_none() {
        return Err(AppError::unauthorized(MFA_EXPIRED));
    }

    let user = UserRepo::find_by_id(&state.pool, challenge.church_id, challenge.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::unauthorized("User session expired. Please login again."))?;

    UserRepo::record_login(&state.pool, user.id).await?;

    let role = normalize_role(&user.role);
    let access_token = generate_access_token(user.id, user.church_id, &role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: user.church_id,
            user_id: Some(user.id),
            action: ACTION_LOGIN,
            entity_type: "user",
            entity_id: Some(user.id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    tracing::info!(user_id = %user.id, role = %role, "User logged in");

    Ok(Json(DataResponse {
        data: AuthResponse {
            token: access_token,
            expires_in: state.config.jwt.expires_in_secs(),
            user: UserResponse::from(user),
        },
    }))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(auth_user: AuthUser) -> Json<DataResponse<SuccessResponse>> {
    tracing::debug!(user_id = %auth_user.user_id, "User logged out");
    Json(SuccessResponse::ok())
}
