use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use async_openai::{config::OpenAIConfig, Client};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod ai;
mod config;
mod error;
mod middleware;
mod models;
mod prompts;
mod routes;
mod types;

use config::AppConfig;
use middleware::auth::Authentication;

pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub oai_client: Client<OpenAIConfig>,
    pub http: reqwest::Client,
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let addr = config.server_addr()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;

    sqlx::migrate!().run(&pool).await.context("running migrations")?;

    let oai_client = ai::responder::chat_client(&config);
    let http = reqwest::Client::new();

    let app_state = Arc::new(AppState {
        pool,
        config: config.clone(),
        oai_client,
        http,
    });
    let shared_config = Arc::new(config);

    info!("Listening on {}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(app_state.clone()))
            .service(health)
            .service(
                web::scope("/api")
                    .wrap(Authentication {
                        config: shared_config.clone(),
                    })
                    .service(
                        web::scope("/auth")
                            .service(routes::auth::register)
                            .service(routes::auth::login)
                            .service(routes::auth::me)
                            .service(routes::auth::update_profile),
                    )
                    .service(
                        web::scope("/appointments")
                            // `/related` before `/{appointment_id}` so the
                            // literal segment is not captured as an id
                            .service(routes::appointments::related_users)
                            .service(routes::appointments::list_appointments)
                            .service(routes::appointments::create_appointment)
                            .service(routes::appointments::get_appointment)
                            .service(routes::appointments::update_appointment)
                            .service(routes::appointments::delete_appointment)
                            .service(routes::appointments::attach_document)
                            .service(routes::appointments::remove_document),
                    )
                    .service(
                        web::scope("/chat")
                            .service(routes::chat::get_messages)
                            .service(routes::chat::send_message),
                    )
                    .service(
                        web::scope("/extract")
                            .service(routes::extraction::methods)
                            .service(routes::extraction::extract),
                    ),
            )
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
