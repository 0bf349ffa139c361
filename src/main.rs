mod context;
mod error;
mod handlers;
mod middlewares;
pub mod models;
pub mod request;
pub mod response;
pub mod services;

use actix_web::web::{delete, get, post, put, resource, scope, Data};
use actix_web::HttpServer;
use middlewares::jwt::Jwt;
use sqlx::postgres::PgPoolOptions;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "actix_web=info,pollhub=info");
    }
    env_logger::init();
    let database_url = dotenv::var("DATABASE_URL").expect("environment variable DATABASE_URL not been set");
    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    sqlx::migrate!().run(&pool).await.expect("failed to run migrations");
    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(actix_web::middleware::NormalizePath::trim())
            .app_data(Data::new(pool.clone()))
            .service(
                scope("accounts")
                    .service(resource("register").route(post().to(handlers::register)))
                    .service(resource("login").route(post().to(handlers::login)))
                    .service(resource("logout").route(post().to(handlers::logout))),
            )
            .service(
                scope("api")
                    .service(resource("my-polls").wrap(Jwt).route(get().to(handlers::poll::my_polls)))
                    .service(
                        scope("polls")
                            .service(resource("").route(get().to(handlers::poll::list)))
                            .service(resource("create").wrap(Jwt).route(post().to(handlers::poll::create)))
                            .service(
                                scope("{poll_id}")
                                    .service(
                                        resource("")
                                            .route(get().to(handlers::poll::detail))
                                            .route(put().to(handlers::poll::update))
                                            .route(delete().to(handlers::poll::remove)),
                                    )
                                    .service(resource("vote").wrap(Jwt).route(post().to(handlers::vote::cast)))
                                    .service(resource("toggle").wrap(Jwt).route(put().to(handlers::poll::toggle)))
                                    .service(resource("results").route(get().to(handlers::poll::results))),
                            ),
                    )
                    .service(
                        scope("statistics")
                            .service(resource("").route(get().to(handlers::statistics::dashboard)))
                            .service(resource("detailed").route(get().to(handlers::statistics::detailed)))
                            .service(resource("top-polls").route(get().to(handlers::statistics::top_polls))),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
