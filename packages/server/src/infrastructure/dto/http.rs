//! HTTP API response DTOs

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub kind: String,
    pub member_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub user_id: String,
    pub user_name: String,
    pub user_type: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub kind: String,
    pub members: Vec<MemberDetailDto>,
    pub metadata: Value,
    pub created_by: Option<String>,
    pub created_at: String,
}
