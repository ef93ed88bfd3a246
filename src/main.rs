mod telemetry;

use govbot_core::Application;
use govbot_infra::setup_context;
use telemetry::{get_subscriber, init_subscriber};
use tracing::error;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("govbot".into(), "info".into());
    init_subscriber(subscriber)?;

    let context = setup_context().map_err(|e| {
        error!("Invalid configuration: {:?}", e);
        e
    })?;

    let app = Application::new(context).await?;
    app.start().await?;
    Ok(())
}
