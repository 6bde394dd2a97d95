use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        repo_types::User,
        services::{hash_password, is_valid_email, verify_password, JwtKeys},
    },
    error::Error,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    payload.email = payload.email.trim().to_string();
    payload.name = payload.name.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(Error::validation("Invalid email"));
    }

    if payload.password.len() < 6 {
        warn!("password too short");
        return Err(Error::validation("Password too short"));
    }

    if payload.name.is_empty() {
        return Err(Error::validation("Name is required"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(Error::validation("Email already registered"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, &hash, &payload.name).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser {
                id: user.id,
                email: user.email,
                name: user.name,
            },
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, Error> {
    payload.email = payload.email.trim().to_string();

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(Error::Auth("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(Error::Auth("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        user: PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
        },
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_serializes_user_and_token() {
        let response = AuthResponse {
            user: PublicUser {
                id: uuid::Uuid::new_v4(),
                email: "test@example.com".to_string(),
                name: "Test".to_string(),
            },
            token: "tok".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"token\":\"tok\""));
        assert!(!json.contains("password"));
    }
}
