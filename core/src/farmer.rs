use std::{fmt, str::FromStr};

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        Database,
        farmer_repo::{FarmerListQuery, FarmerRepositoryRef, UpdateFarmerParams},
    },
    ids::{FarmerId, WorkspaceId},
    pagination::{Page, Pagination},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    #[serde(rename = "farmer")]
    Farmer,
    #[serde(rename = "animal rearer")]
    AnimalRearer,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::AnimalRearer => "animal rearer",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Self::Farmer),
            "animal rearer" | "animal_rearer" => Ok(Self::AnimalRearer),
            other => bail!("unknown member type: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FarmerRecord {
    pub id: FarmerId,
    pub workspace_id: WorkspaceId,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub land_area: f64,
    pub avg_yield_sold_to_market: f64,
    pub member_type: MemberType,
    pub national_id: String,
    pub joined_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewFarmer {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub land_area: f64,
    pub avg_yield_sold_to_market: f64,
    pub member_type: MemberType,
    pub national_id: String,
    pub joined_at: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FarmerChanges {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub land_area: Option<f64>,
    pub avg_yield_sold_to_market: Option<f64>,
    pub member_type: Option<MemberType>,
    pub national_id: Option<String>,
    pub joined_at: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FarmerFilter {
    pub member_type: Option<MemberType>,
    pub keyword: Option<String>,
}

#[derive(Clone)]
pub struct FarmerStore {
    farmer_repo: FarmerRepositoryRef,
}

impl FarmerStore {
    pub fn new(database: &Database) -> Self {
        Self {
            farmer_repo: database.repositories().farmer_repo(),
        }
    }

    pub async fn create(&self, workspace_id: &WorkspaceId, input: NewFarmer) -> Result<FarmerRecord> {
        let now = Utc::now().timestamp();
        let record = FarmerRecord {
            id: FarmerId::generate(),
            workspace_id: workspace_id.clone(),
            full_name: input.full_name.trim().to_owned(),
            phone_number: input.phone_number.trim().to_owned(),
            email: input.email.trim().to_owned(),
            land_area: input.land_area,
            avg_yield_sold_to_market: input.avg_yield_sold_to_market,
            member_type: input.member_type,
            national_id: input.national_id.trim().to_owned(),
            joined_at: input.joined_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        self.farmer_repo.insert_farmer(&record).await?;
        Ok(record)
    }

    pub async fn find(&self, workspace_id: &str, id: &str) -> Result<Option<FarmerRecord>> {
        self.farmer_repo.fetch_farmer(workspace_id, id).await
    }

    /// National IDs are unique across every workspace.
    pub async fn find_by_national_id(&self, national_id: &str) -> Result<Option<FarmerRecord>> {
        self.farmer_repo
            .find_by_national_id(national_id.trim())
            .await
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        filter: &FarmerFilter,
        pagination: Pagination,
    ) -> Result<Page<FarmerRecord>> {
        let query = FarmerListQuery {
            workspace_id: WorkspaceId::from(workspace_id),
            member_type: filter.member_type,
            keyword: filter
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
        };
        let (items, total) = self.farmer_repo.list_farmers(&query, pagination).await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn update(
        &self,
        workspace_id: &str,
        id: &str,
        changes: FarmerChanges,
    ) -> Result<Option<FarmerRecord>> {
        let updated = self
            .farmer_repo
            .update_farmer(UpdateFarmerParams {
                workspace_id: WorkspaceId::from(workspace_id),
                id: FarmerId::from(id),
                full_name: changes.full_name.map(|value| value.trim().to_owned()),
                phone_number: changes.phone_number.map(|value| value.trim().to_owned()),
                email: changes.email.map(|value| value.trim().to_owned()),
                land_area: changes.land_area,
                avg_yield_sold_to_market: changes.avg_yield_sold_to_market,
                member_type: changes.member_type,
                national_id: changes.national_id.map(|value| value.trim().to_owned()),
                joined_at: changes.joined_at,
                updated_at: Utc::now().timestamp(),
            })
            .await?;

        if !updated {
            return Ok(None);
        }
        self.farmer_repo.fetch_farmer(workspace_id, id).await
    }

    pub async fn delete(&self, workspace_id: &str, id: &str) -> Result<bool> {
        self.farmer_repo.delete_farmer(workspace_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::errors::is_unique_violation, test_support::setup_database};

    fn new_farmer(name: &str, national_id: &str) -> NewFarmer {
        NewFarmer {
            full_name: name.to_owned(),
            phone_number: "0712345678".to_owned(),
            email: format!("{}@coop.test", name.to_lowercase().replace(' ', ".")),
            land_area: 2.5,
            avg_yield_sold_to_market: 40.0,
            member_type: MemberType::Farmer,
            national_id: national_id.to_owned(),
            joined_at: None,
        }
    }

    #[test]
    fn member_type_parses_both_spellings() {
        assert_eq!("Animal Rearer".parse::<MemberType>().unwrap(), MemberType::AnimalRearer);
        assert_eq!("animal_rearer".parse::<MemberType>().unwrap(), MemberType::AnimalRearer);
        assert!("fisher".parse::<MemberType>().is_err());
    }

    #[tokio::test]
    async fn duplicate_national_id_writes_nothing() {
        let (_dir, database) = setup_database().await;
        let store = FarmerStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let other = WorkspaceId::from("ws-2");

        store
            .create(&workspace, new_farmer("Amina Njeri", "NID-1"))
            .await
            .expect("first farmer");
        let err = store
            .create(&other, new_farmer("John Otieno", "NID-1"))
            .await
            .expect_err("duplicate national id");
        assert!(is_unique_violation(&err));

        let page = store
            .list(&other, &FarmerFilter::default(), Pagination::default())
            .await
            .expect("list");
        assert_eq!(page.info.total_count, 0);
    }

    #[tokio::test]
    async fn list_filters_by_keyword_and_type() {
        let (_dir, database) = setup_database().await;
        let store = FarmerStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");

        store
            .create(&workspace, new_farmer("Amina Njeri", "NID-1"))
            .await
            .expect("farmer");
        let mut rearer = new_farmer("Peter Kamau", "NID-2");
        rearer.member_type = MemberType::AnimalRearer;
        store.create(&workspace, rearer).await.expect("rearer");

        let by_keyword = store
            .list(
                &workspace,
                &FarmerFilter {
                    member_type: None,
                    keyword: Some("NJERI".to_owned()),
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(by_keyword.items.len(), 1);
        assert_eq!(by_keyword.items[0].national_id, "NID-1");

        let by_type = store
            .list(
                &workspace,
                &FarmerFilter {
                    member_type: Some(MemberType::AnimalRearer),
                    keyword: None,
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(by_type.info.total_count, 1);
        assert_eq!(by_type.items[0].full_name, "Peter Kamau");
    }

    #[tokio::test]
    async fn update_is_scoped_to_workspace() {
        let (_dir, database) = setup_database().await;
        let store = FarmerStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let farmer = store
            .create(&workspace, new_farmer("Amina Njeri", "NID-1"))
            .await
            .expect("farmer");

        let foreign = store
            .update(
                "ws-2",
                &farmer.id,
                FarmerChanges {
                    land_area: Some(9.0),
                    ..FarmerChanges::default()
                },
            )
            .await
            .expect("update");
        assert!(foreign.is_none());

        let updated = store
            .update(
                &workspace,
                &farmer.id,
                FarmerChanges {
                    land_area: Some(9.0),
                    ..FarmerChanges::default()
                },
            )
            .await
            .expect("update")
            .expect("farmer exists");
        assert_eq!(updated.land_area, 9.0);
        assert_eq!(updated.full_name, "Amina Njeri");
    }
}
