// Farmer registry handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use agrocoop_core::farmer::{FarmerChanges, FarmerFilter, MemberType, NewFarmer};

use crate::{
    auth::authenticate,
    error::AppError,
    extract::{ValidatedJson, ValidatedQuery},
    farmer::service::FarmerService,
    types::{
        CreateFarmerRequest, FarmerListQuery, FarmerResponse, UpdateFarmerRequest,
        parse_optional_timestamp, to_pagination,
    },
};

impl FarmerListQuery {
    fn filter(&self) -> Result<FarmerFilter, AppError> {
        let member_type = self
            .member_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| {
                value
                    .parse::<MemberType>()
                    .map_err(|err| AppError::validation(format!("memberType: {err}")))
            })
            .transpose()?;

        Ok(FarmerFilter {
            member_type,
            keyword: self.keyword.clone(),
        })
    }
}

pub(crate) async fn create_farmer_handler(
    Path(workspace_id): Path<String>,
    State(farmers): State<Arc<FarmerService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<CreateFarmerRequest>,
) -> Result<Response, AppError> {
    let joined_at = parse_optional_timestamp("joinedDate", payload.joined_date.as_deref())?;
    let user_id = authenticate(&headers)?;

    let farmer = farmers
        .create_farmer(
            &user_id,
            &workspace_id,
            NewFarmer {
                full_name: payload.full_name.trim().to_string(),
                phone_number: payload.phone_number,
                email: payload.email,
                land_area: payload.land_area,
                avg_yield_sold_to_market: payload.avg_yield_sold_to_market,
                member_type: payload.member_type,
                national_id: payload.national_id.trim().to_string(),
                joined_at,
            },
        )
        .await?;

    let body = json!({
        "message": "Farmer created successfully",
        "farmer": FarmerResponse::from(farmer),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn list_farmers_handler(
    Path(workspace_id): Path<String>,
    State(farmers): State<Arc<FarmerService>>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<FarmerListQuery>,
) -> Result<Response, AppError> {
    let filter = query.filter()?;
    let pagination = to_pagination(query.page_size, query.page_number)?;
    let user_id = authenticate(&headers)?;

    let page = farmers
        .list_farmers(&user_id, &workspace_id, &filter, pagination)
        .await?
        .map(FarmerResponse::from);

    Ok(Json(json!({
        "message": "Farmers fetched successfully",
        "farmers": page.items,
        "pagination": page.info,
    }))
    .into_response())
}

pub(crate) async fn get_farmer_handler(
    Path((farmer_id, workspace_id)): Path<(String, String)>,
    State(farmers): State<Arc<FarmerService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let farmer = farmers
        .get_farmer(&user_id, &workspace_id, &farmer_id)
        .await?;

    Ok(Json(json!({
        "message": "Farmer fetched successfully",
        "farmer": FarmerResponse::from(farmer),
    }))
    .into_response())
}

pub(crate) async fn update_farmer_handler(
    Path((farmer_id, workspace_id)): Path<(String, String)>,
    State(farmers): State<Arc<FarmerService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateFarmerRequest>,
) -> Result<Response, AppError> {
    let joined_at = parse_optional_timestamp("joinedDate", payload.joined_date.as_deref())?;
    let user_id = authenticate(&headers)?;

    let farmer = farmers
        .update_farmer(
            &user_id,
            &workspace_id,
            &farmer_id,
            FarmerChanges {
                full_name: payload.full_name.map(|name| name.trim().to_string()),
                phone_number: payload.phone_number,
                email: payload.email,
                land_area: payload.land_area,
                avg_yield_sold_to_market: payload.avg_yield_sold_to_market,
                member_type: payload.member_type,
                national_id: payload.national_id.map(|id| id.trim().to_string()),
                joined_at,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Farmer updated successfully",
        "farmer": FarmerResponse::from(farmer),
    }))
    .into_response())
}

pub(crate) async fn delete_farmer_handler(
    Path((farmer_id, workspace_id)): Path<(String, String)>,
    State(farmers): State<Arc<FarmerService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let farmer = farmers
        .delete_farmer(&user_id, &workspace_id, &farmer_id)
        .await?;

    Ok(Json(json!({
        "message": "Farmer deleted successfully",
        "farmerId": farmer.id,
    }))
    .into_response())
}
