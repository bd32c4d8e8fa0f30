use axum::{
    Json,
    extract::{Path, State},
};
use contribution::service::NftMetadata;

use crate::error::Result;
use crate::state::AppState;

/// GET /api/nft/metadata/{id}
///
/// 直接返回 ERC-721 元数据，不包信封，tokenURI 指向此处
pub async fn metadata(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<NftMetadata>> {
    Ok(Json(state.contributions.metadata(id).await?))
}
