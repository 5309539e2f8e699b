use crate::middlewares::{admin_context, auth_context};
use crate::models::*;
use crate::services::{ActionPlanService, PlanGenerationResult};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/action-plans",
    tag = "action_plans",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Action plans of the caller's organization", body = [ActionPlanResponse])
    )
)]
pub async fn list_action_plans(
    action_plan_service: web::Data<ActionPlanService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match action_plan_service
        .list_action_plans(ctx.organization_id)
        .await
    {
        Ok(plans) => {
            let plans: Vec<ActionPlanResponse> =
                plans.into_iter().map(ActionPlanResponse::from).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": plans
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/action-plans/generate",
    tag = "action_plans",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plans generated or refreshed", body = PlanGenerationResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn generate_action_plans(
    action_plan_service: web::Data<ActionPlanService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match action_plan_service
        .generate_for_organization(ctx.organization_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn action_plan_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/action-plans")
            .route("", web::get().to(list_action_plans))
            .route("/generate", web::post().to(generate_action_plans)),
    );
}
