use crate::reminder::ReminderScheduler;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct APIResponse {
    pub message: String,
    pub live_jobs: usize,
}

async fn status(scheduler: web::Data<Arc<ReminderScheduler>>) -> HttpResponse {
    HttpResponse::Ok().json(APIResponse {
        message: "Yo! The reminder bot is up!".into(),
        live_jobs: scheduler.live_jobs(),
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(status));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::now;
    use actix_web::{test, App};
    use chrono::Duration;
    use govbot_domain::OutboundMessage;
    use govbot_infra::StaticTimeSys;

    #[actix_web::test]
    async fn reports_live_jobs() {
        let (scheduler, _due) =
            ReminderScheduler::new(Arc::new(StaticTimeSys(now().timestamp_millis())));
        scheduler.schedule(42, "P1", now() + Duration::hours(1), OutboundMessage::text(42, "hi"));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::new(scheduler)))
                .service(web::scope("/api/v1").configure(configure_routes)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/").to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(res["live_jobs"], 1);
    }
}
