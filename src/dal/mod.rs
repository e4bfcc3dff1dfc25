pub mod job_db;
