mod home;
mod registration;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.configure(home::init_routes)
        .configure(registration::init_routes);
}
