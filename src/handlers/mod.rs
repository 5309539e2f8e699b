pub mod action_plan;
pub mod admin;
pub mod loyalty;
pub mod segment;
pub mod webhook;

pub use action_plan::action_plan_config;
pub use admin::admin_config;
pub use loyalty::loyalty_config;
pub use segment::segment_config;
pub use webhook::webhook_config;

use crate::config::WebhookConfig;
use crate::services::AppServices;
use actix_web::web;

/// Shares every service (and the webhook settings) with the handlers.
pub fn register_services(
    cfg: &mut web::ServiceConfig,
    services: &AppServices,
    webhook: &WebhookConfig,
) {
    cfg.app_data(web::Data::new(services.tiers.clone()))
        .app_data(web::Data::new(services.rewards.clone()))
        .app_data(web::Data::new(services.segmentation.clone()))
        .app_data(web::Data::new(services.action_plans.clone()))
        .app_data(web::Data::new(services.loyalty.clone()))
        .app_data(web::Data::new(webhook.clone()));
}
