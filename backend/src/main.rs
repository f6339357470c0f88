use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{App, HttpServer, web};
use actix_web_httpauth::middleware::HttpAuthentication;
use seg_backend::auth::basic_auth_validator;
use seg_backend::config::AppConfig;
use seg_backend::routes::{ProjectSchemas, configure_routes};
use seg_backend::startup::build_backend;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(format!("Invalid configuration: {}", e))
    })?;

    let backend = build_backend(&config).await.map_err(|e| {
        log::error!("Failed to start {} backend: {}", config.backend, e);
        std::io::Error::other(format!("Backend startup failed: {}", e))
    })?;
    let backend = web::Data::from(backend);
    let schemas = web::Data::new(ProjectSchemas::default());

    let basic_auth = config.basic_auth.clone();
    if basic_auth.is_some() {
        log::info!("Basic authentication enabled");
    } else {
        log::warn!("BASIC_AUTH_USER / BASIC_AUTH_PASS not set; requests are not authenticated");
    }

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting {} on {}", backend.model_class(), bind_address);

    HttpServer::new(move || {
        let auth_config = basic_auth.clone();
        let schemas = schemas.clone();
        App::new()
            .wrap(Condition::new(
                auth_config.is_some(),
                HttpAuthentication::basic(basic_auth_validator),
            ))
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(backend.clone())
            .configure(move |cfg| {
                if let Some(auth) = auth_config {
                    cfg.app_data(web::Data::new(auth));
                }
                configure_routes(cfg, schemas);
            })
    })
    .bind(&bind_address)?
    .run()
    .await
}
