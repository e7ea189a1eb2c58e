use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use ticketing_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::SmsService,
    handlers,
    middlewares::{SessionMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::SessionIssuer,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let session_issuer = SessionIssuer::from_config(&config.session);

    let sms_service = SmsService::new(config.sms.clone());
    if !sms_service.is_configured() {
        log::warn!("No SMS provider configured, verification codes are only logged");
    }
    if config.auth.expose_dev_code {
        log::warn!("auth.expose_dev_code is on: verification codes are returned to clients");
    }

    let auth_service = AuthService::new(
        pool.clone(),
        session_issuer.clone(),
        sms_service,
        config.auth.clone(),
    );
    let order_service = OrderService::new(pool.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddleware::new(session_issuer.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(handlers::json_config())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .configure(swagger_config)
            .configure(handlers::routes)
            .default_service(web::to(handlers::not_found))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
