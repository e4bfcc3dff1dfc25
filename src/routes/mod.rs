pub mod default_route;
pub mod job_route;
pub mod ops_route;
