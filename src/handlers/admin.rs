use crate::middlewares::admin_context;
use crate::services::{ExpireResult, RepairResult, RewardService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/rewards/repair-expiry",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Expiry cleared on tier reward codes", body = RepairResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn repair_reward_expiry(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_context(&req)?;

    match reward_service.repair_tier_code_expiry().await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/rewards/expire",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Stale redemption codes expired", body = ExpireResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn expire_rewards(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_context(&req)?;

    match reward_service.expire_stale_rewards(Utc::now()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/rewards/repair-expiry", web::post().to(repair_reward_expiry))
            .route("/rewards/expire", web::post().to(expire_rewards)),
    );
}
