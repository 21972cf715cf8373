use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use reepay_api::{data_objects::NewWebhookSettings, ReepayApi};
use rpg_engine::{
    traits::{OrderStore, ProcessorApi},
    AdminApi,
    CheckoutApi,
    MemoryStore,
    Reconciler,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        CancelRoute,
        CapturePartlyRoute,
        CaptureRoute,
        CheckoutRoute,
        ConfirmRoute,
        RefundPartlyRoute,
        RefundRoute,
        WebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let processor = ReepayApi::new(config.reepay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    register_webhook_url(&config, &processor).await;
    let store = MemoryStore::new();
    let srv = create_server_instance(config, store, processor)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Makes sure the processor delivers webhook events to this server. Failures are logged rather than fatal, since
/// the url may already be registered, or registration may be handled out of band.
async fn register_webhook_url(config: &ServerConfig, processor: &ReepayApi) {
    let Some(url) = config.webhook_url() else { return };
    match processor.fetch_webhook_settings().await {
        Ok(settings) if settings.urls.contains(&url) && !settings.disabled => {
            info!("🚀️ Webhook url {url} is already registered.");
        },
        Ok(settings) => {
            let mut urls = settings.urls;
            if !urls.contains(&url) {
                urls.push(url.clone());
            }
            match processor.update_webhook_settings(NewWebhookSettings { urls, disabled: false }).await {
                Ok(_) => info!("🚀️ Registered webhook url {url} with the processor."),
                Err(e) => warn!("🚀️ Could not register webhook url {url}. {e}"),
            }
        },
        Err(e) => warn!("🚀️ Could not fetch webhook settings from the processor. {e}"),
    }
}

pub fn create_server_instance<S, P>(config: ServerConfig, store: S, processor: P) -> Result<Server, ServerError>
where
    S: OrderStore + Send + 'static,
    P: ProcessorApi + Send + 'static,
{
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(
            store.clone(),
            processor.clone(),
            config.settle_config.clone(),
            config.locale.clone(),
            config.accept_url.clone(),
            config.cancel_url.clone(),
            config.skip_order_lines,
        );
        let reconciler = Reconciler::new(store.clone(), processor.clone(), config.settle_config.clone());
        let admin_api = AdminApi::new(store.clone(), processor.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rpg::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconciler))
            .app_data(web::Data::new(admin_api));
        let admin_scope = web::scope("/api")
            .service(CaptureRoute::<S, P>::new())
            .service(CapturePartlyRoute::<S, P>::new())
            .service(CancelRoute::<S, P>::new())
            .service(RefundRoute::<S, P>::new())
            .service(RefundPartlyRoute::<S, P>::new());
        app.service(health)
            .service(WebhookRoute::<S, P>::new())
            .service(CheckoutRoute::<S, P>::new())
            .service(ConfirmRoute::<S, P>::new())
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
