use actix_web::{post, web, HttpResponse};

use crate::error::Result;
use crate::models::{AnalyzeRequest, SearchRequest};
use crate::services::SearchService;

#[post("/search")]
pub async fn search(
    service: web::Data<SearchService>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse> {
    let response = service.search(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/query/analyze")]
pub async fn analyze(
    service: web::Data<SearchService>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse> {
    let processed = service.analyze(&body.query).await?;
    Ok(HttpResponse::Ok().json(processed))
}
