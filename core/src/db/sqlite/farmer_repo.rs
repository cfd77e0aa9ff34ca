use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::farmer_repo::{FarmerListQuery, FarmerRepository, UpdateFarmerParams},
    farmer::{FarmerRecord, MemberType},
    ids::{FarmerId, WorkspaceId},
    pagination::{Pagination, like_pattern},
};

const FARMER_COLUMNS: &str = "id, workspace_id, full_name, phone_number, email, land_area, \
     avg_yield_sold_to_market, member_type, national_id, joined_at, created_at, updated_at";

pub struct SqliteFarmerRepository {
    pool: Pool<Sqlite>,
}

impl SqliteFarmerRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_farmer_row(row: SqliteRow) -> Result<FarmerRecord> {
        let member_type: String = row.get("member_type");
        Ok(FarmerRecord {
            id: FarmerId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            full_name: row.get("full_name"),
            phone_number: row.get("phone_number"),
            email: row.get("email"),
            land_area: row.get("land_area"),
            avg_yield_sold_to_market: row.get("avg_yield_sold_to_market"),
            member_type: member_type
                .parse()
                .context("invalid member_type stored for farmer")?,
            national_id: row.get("national_id"),
            joined_at: row.get("joined_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a FarmerListQuery) {
        builder.push(" WHERE workspace_id = ");
        builder.push_bind(query.workspace_id.as_str());

        if let Some(member_type) = query.member_type {
            builder.push(" AND member_type = ");
            builder.push_bind(member_type.as_str());
        }
        if let Some(keyword) = query.keyword.as_deref() {
            builder.push(" AND LOWER(full_name) LIKE ");
            builder.push_bind(like_pattern(keyword));
            builder.push(" ESCAPE '\\'");
        }
    }
}

#[async_trait]
impl FarmerRepository for SqliteFarmerRepository {
    async fn insert_farmer(&self, record: &FarmerRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO farmers (
                 id,
                 workspace_id,
                 full_name,
                 phone_number,
                 email,
                 land_area,
                 avg_yield_sold_to_market,
                 member_type,
                 national_id,
                 joined_at,
                 created_at,
                 updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(record.workspace_id.as_str())
        .bind(&record.full_name)
        .bind(&record.phone_number)
        .bind(&record.email)
        .bind(record.land_area)
        .bind(record.avg_yield_sold_to_market)
        .bind(record.member_type.as_str())
        .bind(&record.national_id)
        .bind(record.joined_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_farmer(&self, workspace_id: &str, id: &str) -> Result<Option<FarmerRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {FARMER_COLUMNS} FROM farmers WHERE id = ? AND workspace_id = ?"
        ))
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_farmer_row).transpose()
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<FarmerRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {FARMER_COLUMNS} FROM farmers WHERE national_id = ?"
        ))
        .bind(national_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_farmer_row).transpose()
    }

    async fn list_farmers(
        &self,
        query: &FarmerListQuery,
        pagination: Pagination,
    ) -> Result<(Vec<FarmerRecord>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM farmers");
        Self::push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!("SELECT {FARMER_COLUMNS} FROM farmers"));
        Self::push_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        select.push_bind(pagination.limit());
        select.push(" OFFSET ");
        select.push_bind(pagination.skip());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Self::map_farmer_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn update_farmer(&self, params: UpdateFarmerParams) -> Result<bool> {
        let UpdateFarmerParams {
            workspace_id,
            id,
            full_name,
            phone_number,
            email,
            land_area,
            avg_yield_sold_to_market,
            member_type,
            national_id,
            joined_at,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE farmers SET updated_at = ");
        builder.push_bind(updated_at);

        if let Some(full_name) = full_name {
            builder.push(", full_name = ");
            builder.push_bind(full_name);
        }
        if let Some(phone_number) = phone_number {
            builder.push(", phone_number = ");
            builder.push_bind(phone_number);
        }
        if let Some(email) = email {
            builder.push(", email = ");
            builder.push_bind(email);
        }
        if let Some(land_area) = land_area {
            builder.push(", land_area = ");
            builder.push_bind(land_area);
        }
        if let Some(avg_yield) = avg_yield_sold_to_market {
            builder.push(", avg_yield_sold_to_market = ");
            builder.push_bind(avg_yield);
        }
        if let Some(member_type) = member_type {
            builder.push(", member_type = ");
            builder.push_bind(member_type.as_str());
        }
        if let Some(national_id) = national_id {
            builder.push(", national_id = ");
            builder.push_bind(national_id);
        }
        if let Some(joined_at) = joined_at {
            builder.push(", joined_at = ");
            builder.push_bind(joined_at);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.into_inner());
        builder.push(" AND workspace_id = ");
        builder.push_bind(workspace_id.into_inner());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_farmer(&self, workspace_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM farmers WHERE id = ? AND workspace_id = ?")
            .bind(id)
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
