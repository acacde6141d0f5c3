pub mod config;
pub mod domain;
pub mod email_client;
pub mod repository;
pub mod routes;
pub mod startup;
pub mod subscription;
pub mod telemetry;
