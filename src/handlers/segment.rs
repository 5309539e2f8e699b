use crate::middlewares::{admin_context, auth_context};
use crate::models::*;
use crate::services::{
    MetricsRecalcResult, SegmentationService, SegmentationSummary, TemplateInitResult,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/segments",
    tag = "segments",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Segments of the caller's organization", body = [SegmentResponse])
    )
)]
pub async fn list_segments(
    segmentation_service: web::Data<SegmentationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = auth_context(&req)?;

    match segmentation_service.list_segments(ctx.organization_id).await {
        Ok(segments) => {
            let segments: Vec<SegmentResponse> =
                segments.into_iter().map(SegmentResponse::from).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": segments
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/segments",
    tag = "segments",
    request_body = CreateSegmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Segment created", body = SegmentResponse),
        (status = 400, description = "Invalid segment definition"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_segment(
    segmentation_service: web::Data<SegmentationService>,
    req: HttpRequest,
    request: web::Json<CreateSegmentRequest>,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match segmentation_service
        .create_segment(ctx.organization_id, request.into_inner())
        .await
    {
        Ok(segment) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SegmentResponse::from(segment)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/segments/templates/initialize",
    tag = "segments",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Template segments created", body = TemplateInitResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn initialize_templates(
    segmentation_service: web::Data<SegmentationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match segmentation_service
        .initialize_templates(ctx.organization_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/segments/recalculate-customers",
    tag = "segments",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Customer metrics recomputed", body = MetricsRecalcResult),
        (status = 403, description = "Admin only")
    )
)]
pub async fn recalculate_customers(
    segmentation_service: web::Data<SegmentationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match segmentation_service
        .recalculate_all_customers(ctx.organization_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/segments/evaluate",
    tag = "segments",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Segments re-evaluated", body = SegmentationSummary),
        (status = 403, description = "Admin only")
    )
)]
pub async fn evaluate_segments(
    segmentation_service: web::Data<SegmentationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = admin_context(&req)?;

    match segmentation_service
        .assign_to_segments(ctx.organization_id)
        .await
    {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn segment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/segments")
            .route("", web::get().to(list_segments))
            .route("", web::post().to(create_segment))
            .route("/templates/initialize", web::post().to(initialize_templates))
            .route("/recalculate-customers", web::post().to(recalculate_customers))
            .route("/evaluate", web::post().to(evaluate_segments)),
    );
}
