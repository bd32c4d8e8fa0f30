use axum::{Extension, Json, extract::State};
use contribution::models::User;
use validator::Validate;

use crate::dto::{ApiResponse, UpdateWalletRequest};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// PUT /api/users/me/wallet
pub async fn update_wallet(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateWalletRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;
    let user = state.users.set_wallet(current.id, &req.wallet_address).await?;
    Ok(Json(ApiResponse::new(user)))
}
