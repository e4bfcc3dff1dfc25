use std::net::TcpListener;

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::PgPool;

use crate::{
    routes::{default_route, job_route, ops_route},
    services::JobPipeline,
};

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    pipeline: Data<JobPipeline>,
) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(
                web::scope("/jobs")
                    .service(job_route::query_jobs)
                    .service(job_route::search_jobs)
                    .service(job_route::list_jobs),
            )
            .service(
                web::scope("/cache")
                    .service(ops_route::cache_size)
                    .service(ops_route::clear_expired)
                    .service(ops_route::clear_cache),
            )
            .service(web::scope("/queue").service(ops_route::queue_depth))
            .app_data(db_pool.clone())
            .app_data(pipeline.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
