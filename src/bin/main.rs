#[cfg(not(target_arch = "wasm32"))]
mod native {
    use actix_web::{App, HttpServer};
    use tracing_subscriber::EnvFilter;
    use yatube::config;
    use yatube::core::{db, store::Store};
    use yatube::server;

    fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    pub async fn run() -> std::io::Result<()> {
        dotenvy::dotenv().ok();
        init_tracing();

        let store = Store::default();
        if config::seed_demo_data() {
            if let Err(e) = db::init_test_data(&store) {
                tracing::error!(error = ?e, "failed to seed demo data");
            }
        }

        let addr = config::bind_address();
        tracing::info!("Server listening on http://{}", addr);

        HttpServer::new(move || App::new().configure(server::configure(store.clone())))
            .bind(addr)?
            .run()
            .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
