mod error;
mod interaction;
mod job_schedulers;
mod proposal;
mod reminder;
mod shared;
mod status;
mod subscriber;

use actix_web::{dev::Server, middleware, web, App, HttpServer};
pub use error::GovBotError;
use govbot_infra::GovBotContext;
use job_schedulers::{
    start_chat_updates_listener, start_due_reminders_consumer, start_offchain_poller,
    start_onchain_poller,
};
use reminder::reconcile_reminders::ReconcileRemindersUseCase;
pub use reminder::{DueReminders, ReminderScheduler};
use shared::usecase::execute;
use std::{net::TcpListener, sync::Arc};
use tracing::{error, info};
use tracing_actix_web::TracingLogger;

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    status::configure_routes(cfg);
}

pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    pub async fn new(context: GovBotContext) -> Result<Self, std::io::Error> {
        let (scheduler, due_reminders) = ReminderScheduler::new(context.sys.clone());
        let scheduler = Arc::new(scheduler);

        Application::reconcile_reminders(&context, &scheduler).await;
        let (server, port) = Application::configure_server(&context, scheduler.clone())?;
        Application::start_job_schedulers(context, scheduler, due_reminders);

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Rebuilds the reminder jobs lost by the previous process
    async fn reconcile_reminders(context: &GovBotContext, scheduler: &ReminderScheduler) {
        let usecase = ReconcileRemindersUseCase { scheduler };
        match execute(usecase, context).await {
            Ok(res) => info!(
                "Reconciled reminders at startup, {} jobs restored",
                res.restored_jobs
            ),
            Err(_) => error!("Starting without restored reminders"),
        }
    }

    fn start_job_schedulers(
        context: GovBotContext,
        scheduler: Arc<ReminderScheduler>,
        due_reminders: DueReminders,
    ) {
        start_due_reminders_consumer(context.clone(), scheduler.clone(), due_reminders);
        start_offchain_poller(context.clone(), scheduler.clone());
        start_onchain_poller(context.clone(), scheduler.clone());
        start_chat_updates_listener(context, scheduler);
    }

    fn configure_server(
        context: &GovBotContext,
        scheduler: Arc<ReminderScheduler>,
    ) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            App::new()
                .wrap(middleware::Compress::default())
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(scheduler.clone()))
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(1)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}
