#[path = "../support/mod.rs"]
mod support;

mod docker_e2e;
mod logs;
mod plan;
