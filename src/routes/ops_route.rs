use actix_web::{delete, get, post, web, HttpResponse};
use serde::Serialize;

use crate::services::JobPipeline;

#[derive(Serialize)]
struct CacheSize {
    entries: usize,
}

#[derive(Serialize)]
struct ClearedEntries {
    evicted: usize,
    remaining: usize,
}

#[derive(Serialize)]
struct QueueDepth {
    depth: usize,
}

#[get("/size")]
pub async fn cache_size(pipeline: web::Data<JobPipeline>) -> HttpResponse {
    HttpResponse::Ok().json(CacheSize {
        entries: pipeline.cache_size(),
    })
}

#[post("/clear-expired")]
pub async fn clear_expired(pipeline: web::Data<JobPipeline>) -> HttpResponse {
    let evicted = pipeline.clear_expired_cache();
    log::info!("Cleared {} expired cache entries", evicted);

    HttpResponse::Ok().json(ClearedEntries {
        evicted,
        remaining: pipeline.cache_size(),
    })
}

#[delete("")]
pub async fn clear_cache(pipeline: web::Data<JobPipeline>) -> HttpResponse {
    pipeline.clear_cache();
    HttpResponse::Ok().body("Done")
}

#[get("/depth")]
pub async fn queue_depth(pipeline: web::Data<JobPipeline>) -> HttpResponse {
    HttpResponse::Ok().json(QueueDepth {
        depth: pipeline.queue_depth(),
    })
}
