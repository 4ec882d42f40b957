use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hr_portal::config::Config;
use hr_portal::db::init_db;
use hr_portal::docs::ApiDoc;
use hr_portal::ledger::{LeaveLedger, LeavePolicy};
use hr_portal::routes::{self, RateLimiters};
use hr_portal::store::MySqlStore;
use hr_portal::workflow::{DbNotifier, DbSideEffects, RequestWorkflow};

#[get("/")]
async fn index() -> impl Responder {
    "HR Portal"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections)
        .await
        .context("failed to connect to database")?;
    let limiters = RateLimiters::from_config(&config)?;

    let policy = LeavePolicy::with_monetization_cap(config.leave_monetization_cap);

    let store = Arc::new(MySqlStore::new(pool.clone()));
    let notifier = Arc::new(DbNotifier::new(pool.clone()));
    let ledger = Arc::new(LeaveLedger::new(store.clone(), policy));
    let effects = Arc::new(DbSideEffects::new(
        pool.clone(),
        ledger.clone(),
        notifier.clone(),
    ));
    let workflow = RequestWorkflow::new(store, effects, notifier);

    let ledger_data = Data::from(ledger);
    let workflow_data = Data::new(workflow);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(ledger_data.clone())
            .app_data(workflow_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
