use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::engine::{Comparison, MetricField, SegmentCondition, SegmentRule, TierDefinition};
use crate::entities::{ActionPlanStatus, LoyaltyTierLevel, RewardStatus, RewardType};
use crate::handlers;
use crate::models::*;
use crate::services::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::loyalty::recalculate,
        handlers::loyalty::get_tiers,
        handlers::loyalty::initialize_tiers,
        handlers::loyalty::get_customer_profile,
        handlers::loyalty::enroll_customer,
        handlers::loyalty::redeem_points,
        handlers::admin::repair_reward_expiry,
        handlers::admin::expire_rewards,
        handlers::segment::list_segments,
        handlers::segment::create_segment,
        handlers::segment::initialize_templates,
        handlers::segment::recalculate_customers,
        handlers::segment::evaluate_segments,
        handlers::action_plan::list_action_plans,
        handlers::action_plan::generate_action_plans,
        handlers::webhook::order_completed,
    ),
    components(
        schemas(
            LoyaltyTierLevel,
            RewardType,
            RewardStatus,
            ActionPlanStatus,
            TierDefinition,
            TierTableView,
            TierInitResult,
            RecalculationSummary,
            CustomerPassResult,
            CustomerLoyaltyProfile,
            NextTierProgress,
            RedeemPointsRequest,
            RewardResponse,
            RepairResult,
            ExpireResult,
            MetricField,
            Comparison,
            SegmentCondition,
            SegmentRule,
            CreateSegmentRequest,
            SegmentResponse,
            MetricsRecalcResult,
            SegmentEvaluation,
            SegmentationSummary,
            TemplateInitResult,
            ActionPlanResponse,
            PlanGenerationResult,
            OrderCompletedPayload,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "loyalty", description = "Points, tiers and rewards"),
        (name = "segments", description = "Customer segmentation"),
        (name = "action_plans", description = "Segment driven marketing plans"),
        (name = "admin", description = "Reward maintenance"),
        (name = "webhook", description = "Order events from the commerce platform"),
    ),
    info(
        title = "Loyalty Backend API",
        version = "1.0.0",
        description = "Loyalty tiers, points, segmentation and action plans"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
