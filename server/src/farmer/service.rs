use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use agrocoop_core::{
    farmer::{FarmerChanges, FarmerFilter, FarmerRecord, FarmerStore, NewFarmer},
    ids::WorkspaceId,
    pagination::{Page, Pagination},
    permissions::Permission,
};

use crate::{AppError, access::AccessService, state::AppState};

const DUPLICATE_NATIONAL_ID: &str = "A farmer with this national ID already exists.";

pub struct FarmerService {
    farmer_store: FarmerStore,
    access: Arc<AccessService>,
}

impl FarmerService {
    pub fn new(farmer_store: FarmerStore, access: Arc<AccessService>) -> Self {
        Self {
            farmer_store,
            access,
        }
    }

    pub async fn fetch_farmer(
        &self,
        workspace_id: &str,
        farmer_id: &str,
    ) -> Result<FarmerRecord, AppError> {
        self.farmer_store
            .find(workspace_id, farmer_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::farmer_not_found(workspace_id, farmer_id))
    }

    /// National IDs are unique across all workspaces; a duplicate is
    /// rejected before anything is written.
    pub async fn create_farmer(
        &self,
        user_id: &str,
        workspace_id: &str,
        input: NewFarmer,
    ) -> Result<FarmerRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::CreateFarmer])
            .await?;
        self.ensure_national_id_available(&input.national_id, None)
            .await?;

        let farmer = self
            .farmer_store
            .create(&WorkspaceId::from(workspace_id), input)
            .await
            .map_err(|err| AppError::conflict_or_internal(err, DUPLICATE_NATIONAL_ID))?;
        info!(workspace_id, farmer_id = %farmer.id, "farmer registered");
        Ok(farmer)
    }

    pub async fn list_farmers(
        &self,
        user_id: &str,
        workspace_id: &str,
        filter: &FarmerFilter,
        pagination: Pagination,
    ) -> Result<Page<FarmerRecord>, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.farmer_store
            .list(workspace_id, filter, pagination)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn get_farmer(
        &self,
        user_id: &str,
        workspace_id: &str,
        farmer_id: &str,
    ) -> Result<FarmerRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;
        self.fetch_farmer(workspace_id, farmer_id).await
    }

    pub async fn update_farmer(
        &self,
        user_id: &str,
        workspace_id: &str,
        farmer_id: &str,
        changes: FarmerChanges,
    ) -> Result<FarmerRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::EditFarmer])
            .await?;
        let existing = self.fetch_farmer(workspace_id, farmer_id).await?;

        if let Some(national_id) = changes.national_id.as_deref() {
            self.ensure_national_id_available(national_id, Some(&existing))
                .await?;
        }

        self.farmer_store
            .update(workspace_id, farmer_id, changes)
            .await
            .map_err(|err| AppError::conflict_or_internal(err, DUPLICATE_NATIONAL_ID))?
            .ok_or_else(|| AppError::farmer_not_found(workspace_id, farmer_id))
    }

    pub async fn delete_farmer(
        &self,
        user_id: &str,
        workspace_id: &str,
        farmer_id: &str,
    ) -> Result<FarmerRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::DeleteFarmer])
            .await?;
        let farmer = self.fetch_farmer(workspace_id, farmer_id).await?;

        let deleted = self
            .farmer_store
            .delete(workspace_id, farmer_id)
            .await
            .map_err(AppError::from_anyhow)?;
        if !deleted {
            return Err(AppError::farmer_not_found(workspace_id, farmer_id));
        }

        info!(workspace_id, farmer_id, "farmer deleted");
        Ok(farmer)
    }

    async fn ensure_national_id_available(
        &self,
        national_id: &str,
        current: Option<&FarmerRecord>,
    ) -> Result<(), AppError> {
        let holder = self
            .farmer_store
            .find_by_national_id(national_id)
            .await
            .map_err(AppError::from_anyhow)?;

        match (holder, current) {
            (Some(holder), Some(current)) if holder.id == current.id => Ok(()),
            (Some(_), _) => Err(AppError::conflict(DUPLICATE_NATIONAL_ID)),
            (None, _) => Ok(()),
        }
    }
}

impl FromRef<AppState> for Arc<FarmerService> {
    fn from_ref(state: &AppState) -> Arc<FarmerService> {
        Arc::clone(&state.farmer_service)
    }
}

#[cfg(test)]
mod tests {
    use agrocoop_core::farmer::MemberType;
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{seed_workspace, setup_state};

    fn farmer(name: &str, national_id: &str) -> NewFarmer {
        NewFarmer {
            full_name: name.to_owned(),
            phone_number: "0712345678".to_owned(),
            email: "grower@coop.test".to_owned(),
            land_area: 2.0,
            avg_yield_sold_to_market: 1.5,
            member_type: MemberType::Farmer,
            national_id: national_id.to_owned(),
            joined_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_national_id_conflicts_without_writing() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;

        state
            .farmer_service
            .create_farmer(&owner_id, &workspace_id, farmer("Amina", "NID-1"))
            .await
            .expect("first farmer");
        let err = state
            .farmer_service
            .create_farmer(&owner_id, &workspace_id, farmer("Baraka", " NID-1 "))
            .await
            .expect_err("duplicate");
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let page = state
            .farmer_service
            .list_farmers(
                &owner_id,
                &workspace_id,
                &FarmerFilter::default(),
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(page.info.total_count, 1);
    }

    #[tokio::test]
    async fn national_id_change_checks_other_farmers() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;
        let amina = state
            .farmer_service
            .create_farmer(&owner_id, &workspace_id, farmer("Amina", "NID-1"))
            .await
            .expect("amina");
        state
            .farmer_service
            .create_farmer(&owner_id, &workspace_id, farmer("Baraka", "NID-2"))
            .await
            .expect("baraka");

        let unchanged = state
            .farmer_service
            .update_farmer(
                &owner_id,
                &workspace_id,
                &amina.id,
                FarmerChanges {
                    national_id: Some("NID-1".to_owned()),
                    land_area: Some(4.0),
                    ..FarmerChanges::default()
                },
            )
            .await
            .expect("keeping own id is fine");
        assert_eq!(unchanged.land_area, 4.0);

        let err = state
            .farmer_service
            .update_farmer(
                &owner_id,
                &workspace_id,
                &amina.id,
                FarmerChanges {
                    national_id: Some("NID-2".to_owned()),
                    ..FarmerChanges::default()
                },
            )
            .await
            .expect_err("taken");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
