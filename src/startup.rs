use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::email_client::{EmailClient, NotificationDispatcher};
use crate::repository::PostgresSubscriberRepository;
use crate::routes::{
    handle_confirm_subscription, handle_create_subscription, handle_unsubscribe,
    handle_unsubscribe_link, health_check, list_subscribers, publish_newsletter, AdminApiKey,
};
use crate::subscription::SubscriptionManager;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let sender_email = config
            .get_email_client_sender()
            .map_err(anyhow::Error::msg)?;
        let email_client = EmailClient::new(
            config.get_email_client_base_url(),
            sender_email,
            config.get_email_client_api(),
            config.get_email_client_timeout(),
        )?;

        let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(email_client);
        let manager = SubscriptionManager::new(
            Arc::new(PostgresSubscriberRepository::new(db_pool)),
            dispatcher.clone(),
            config.get_app_base_url(),
            config.get_confirmation_token_ttl(),
        );

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            manager,
            dispatcher,
            AdminApiKey(config.get_admin_api_key()),
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    manager: SubscriptionManager,
    dispatcher: Arc<dyn NotificationDispatcher>,
    admin_api_key: AdminApiKey,
) -> Result<Server, std::io::Error> {
    let manager = web::Data::new(manager);
    let dispatcher: web::Data<dyn NotificationDispatcher> = web::Data::from(dispatcher);
    let admin_api_key = web::Data::new(admin_api_key);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route(
                "/subscriptions/confirm",
                web::get().to(handle_confirm_subscription),
            )
            .route(
                "/subscriptions/unsubscribe",
                web::get().to(handle_unsubscribe_link),
            )
            .route(
                "/subscriptions/unsubscribe",
                web::post().to(handle_unsubscribe),
            )
            .service(
                web::scope("/admin")
                    .route("/subscribers", web::get().to(list_subscribers))
                    .route("/newsletters", web::post().to(publish_newsletter)),
            )
            .app_data(manager.clone())
            .app_data(dispatcher.clone())
            .app_data(admin_api_key.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}

/// Applies the schema migrations shipped in `migrations/`.
pub async fn migrate(db_pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db_pool).await
}
