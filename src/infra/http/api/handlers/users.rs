use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::users::AuthUser;

use super::super::error::{ApiError, user_to_api};
use super::super::extract::ValidJson;
use super::super::models::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse,
};
use super::super::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .register(request.into())
        .await
        .map_err(user_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully",
            user,
            success: true,
        }),
    ))
}

pub async fn login(
    State(state): State<ApiState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .users
        .login(&request.phone_number, &request.password)
        .await
        .map_err(user_to_api)?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: outcome.user,
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        success: true,
    }))
}

pub async fn refresh(
    State(state): State<ApiState>,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let access_token = state
        .users
        .refresh(&request.refresh_token)
        .await
        .map_err(user_to_api)?;

    Ok(Json(RefreshResponse {
        message: "Token refreshed successfully",
        access_token,
        success: true,
    }))
}

pub async fn logout(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.logout(&user).await.map_err(user_to_api)?;

    Ok(Json(MessageResponse {
        message: "Logout successful",
        success: true,
    }))
}
