use crate::config::WebhookConfig;
use crate::error::AppError;
use crate::models::OrderCompletedPayload;
use crate::services::{CustomerPassResult, LoyaltyService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use log::{info, warn};
use serde_json::json;

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Compares without short-circuiting on the first differing byte.
fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn verify_secret(req: &HttpRequest, config: &WebhookConfig) -> Result<(), AppError> {
    if config.secret.is_empty() {
        // 未配置密钥时 webhook 关闭
        return Err(AppError::Forbidden);
    }
    let provided = req
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .map(|v| v.as_bytes());
    match provided {
        Some(secret) if secrets_match(secret, config.secret.as_bytes()) => Ok(()),
        Some(_) => Err(AppError::AuthError("Invalid webhook secret".to_string())),
        None => Err(AppError::AuthError(format!(
            "Missing {WEBHOOK_SECRET_HEADER} header"
        ))),
    }
}

/// 订单完成回调：对该客户执行积分、等级与奖励计算
#[utoipa::path(
    post,
    path = "/webhook/orders/completed",
    tag = "webhook",
    request_body = OrderCompletedPayload,
    params(
        ("X-Webhook-Secret" = String, Header, description = "Shared webhook secret")
    ),
    responses(
        (status = 200, description = "Customer recalculated", body = CustomerPassResult),
        (status = 401, description = "Missing or wrong secret"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn order_completed(
    req: HttpRequest,
    config: web::Data<WebhookConfig>,
    loyalty_service: web::Data<LoyaltyService>,
    payload: web::Json<OrderCompletedPayload>,
) -> Result<HttpResponse> {
    if let Err(e) = verify_secret(&req, &config) {
        warn!("Rejected order webhook: {e}");
        return Ok(e.error_response());
    }

    let customer_id = payload.customer_id;
    info!("Order completed webhook for customer {customer_id}");

    match loyalty_service.run_for_customer(customer_id).await {
        Ok(pass) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": pass
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook").route("/orders/completed", web::post().to(order_completed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn config(secret: &str) -> WebhookConfig {
        WebhookConfig {
            secret: secret.to_string(),
        }
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match(b"hook-secret", b"hook-secret"));
        assert!(!secrets_match(b"hook-secreT", b"hook-secret"));
        assert!(!secrets_match(b"hook", b"hook-secret"));
        assert!(!secrets_match(b"", b"hook-secret"));
    }

    #[test]
    fn test_verify_secret() {
        let req = TestRequest::default()
            .insert_header((WEBHOOK_SECRET_HEADER, "hook-secret"))
            .to_http_request();
        assert!(verify_secret(&req, &config("hook-secret")).is_ok());
        assert!(matches!(
            verify_secret(&req, &config("other-secret")),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            verify_secret(&req, &config("")),
            Err(AppError::Forbidden)
        ));

        let bare = TestRequest::default().to_http_request();
        assert!(matches!(
            verify_secret(&bare, &config("hook-secret")),
            Err(AppError::AuthError(_))
        ));
    }
}
