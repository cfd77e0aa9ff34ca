use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    farmer::{FarmerRecord, MemberType},
    ids::{FarmerId, WorkspaceId},
    pagination::Pagination,
};

#[derive(Debug, Clone)]
pub struct FarmerListQuery {
    pub workspace_id: WorkspaceId,
    pub member_type: Option<MemberType>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateFarmerParams {
    pub workspace_id: WorkspaceId,
    pub id: FarmerId,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub land_area: Option<f64>,
    pub avg_yield_sold_to_market: Option<f64>,
    pub member_type: Option<MemberType>,
    pub national_id: Option<String>,
    pub joined_at: Option<i64>,
    pub updated_at: i64,
}

#[async_trait]
pub trait FarmerRepository: Send + Sync {
    async fn insert_farmer(&self, record: &FarmerRecord) -> Result<()>;

    async fn fetch_farmer(&self, workspace_id: &str, id: &str) -> Result<Option<FarmerRecord>>;

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<FarmerRecord>>;

    async fn list_farmers(
        &self,
        query: &FarmerListQuery,
        pagination: Pagination,
    ) -> Result<(Vec<FarmerRecord>, i64)>;

    async fn update_farmer(&self, params: UpdateFarmerParams) -> Result<bool>;

    async fn delete_farmer(&self, workspace_id: &str, id: &str) -> Result<bool>;
}

pub type FarmerRepositoryRef = Arc<dyn FarmerRepository>;
