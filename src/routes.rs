use actix_web::{web, Scope};

use crate::handlers::{health, search};

pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health::health)
        .service(search::search)
        .service(search::analyze)
}
