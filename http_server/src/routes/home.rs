use actix_web::{web, HttpResponse};

const LANDING_MESSAGE: &str =
    "Register with your name, email and location to receive severe weather alerts for your area.";

async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(LANDING_MESSAGE)
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/health_check").route(web::get().to(health_check)));
}
