pub mod admin;
pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod forms;
pub mod groups;
pub mod handlers;
pub mod media;
pub mod models;
pub mod posts;
pub mod templates;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
use spin_sdk::{
    http::{IntoResponse, Request},
    http_component,
};

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let store = core::store::Store::open_default()?;
    if config::seed_demo_data() {
        core::db::init_test_data(&store)?;
    }
    Ok(handlers::dispatch(&store, req))
}
