use crate::middlewares::{admin_context, auth_context};
use crate::models::*;
use crate::services::{
    CustomerPassResult, LoyaltyService, RecalculationSummary, RewardService, TierInitResult,
    TierService, TierTableView,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/loyalty/recalculate",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Compound recalculation finished", body = RecalculationSummary),
        (status = 403, description = "Admin only")
    )
)]
pub async fn recalculate(
    loyalty_service: web::Data<LoyaltyService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match loyalty_service.run_for_organization(ctx.organization_id).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/tiers",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Effective tier table", body = TierTableView)
    )
)]
pub async fn get_tiers(
    tier_service: web::Data<TierService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match tier_service.tier_table_view(ctx.organization_id).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": view
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/tiers/initialize",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Default tiers written", body = TierInitResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn initialize_tiers(
    tier_service: web::Data<TierService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match tier_service.initialize_default_tiers(ctx.organization_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/customers/{id}",
    tag = "loyalty",
    params(
        ("id" = i64, Path, description = "Customer id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Loyalty profile", body = CustomerLoyaltyProfile),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer_profile(
    loyalty_service: web::Data<LoyaltyService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match loyalty_service
        .customer_profile(ctx.organization_id, path.into_inner())
        .await
    {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/customers/{id}/enroll",
    tag = "loyalty",
    params(
        ("id" = i64, Path, description = "Customer id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Customer enrolled", body = CustomerPassResult),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn enroll_customer(
    loyalty_service: web::Data<LoyaltyService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match loyalty_service
        .enroll_customer(ctx.organization_id, path.into_inner())
        .await
    {
        Ok(pass) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": pass
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/customers/{id}/redeem",
    tag = "loyalty",
    params(
        ("id" = i64, Path, description = "Customer id")
    ),
    request_body = RedeemPointsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Points redeemed", body = RewardResponse),
        (status = 400, description = "Invalid amount or insufficient points")
    )
)]
pub async fn redeem_points(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<RedeemPointsRequest>,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match reward_service
        .redeem_points(ctx.organization_id, path.into_inner(), request.points)
        .await
    {
        Ok(reward) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": RewardResponse::from(reward)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn loyalty_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/loyalty")
            .route("/recalculate", web::post().to(recalculate))
            .route("/tiers", web::get().to(get_tiers))
            .route("/tiers/initialize", web::post().to(initialize_tiers))
            .route("/customers/{id}", web::get().to(get_customer_profile))
            .route("/customers/{id}/enroll", web::post().to(enroll_customer))
            .route("/customers/{id}/redeem", web::post().to(redeem_points)),
    );
}
