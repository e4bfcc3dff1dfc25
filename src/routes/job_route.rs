use actix_web::{get, post, web, HttpResponse};
use sqlx::PgPool;

use crate::{dal::job_db, domain::filter::FilterRequest, services::JobPipeline};

#[post("/query")]
pub async fn query_jobs(
    pipeline: web::Data<JobPipeline>,
    body: web::Json<FilterRequest>,
) -> HttpResponse {
    match pipeline.query(&body).await {
        Ok(jobs) => HttpResponse::Ok().json(jobs),
        Err(e) => {
            log::error!("Fatal error in job fetching: {:?}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[post("/search")]
pub async fn search_jobs(
    pipeline: web::Data<JobPipeline>,
    body: web::Json<FilterRequest>,
) -> HttpResponse {
    match pipeline.search(&body).await {
        Ok(jobs) => HttpResponse::Ok().json(jobs),
        Err(e) => {
            log::error!("Fatal error in job search: {:?}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[get("")]
pub async fn list_jobs(pool: web::Data<PgPool>) -> HttpResponse {
    match job_db::get_all_jobs(&pool).await {
        Ok(jobs) => HttpResponse::Ok().json(jobs),
        Err(e) => {
            log::error!("Error selecting jobs from db: {:?}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}
