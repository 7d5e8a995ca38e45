//! Native actix-web front end. Requests are converted to Spin requests and
//! run through the same route table as the component.

use actix_web::{web, HttpRequest, HttpResponse};
use crate::core::store::Store;
use crate::handlers;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(
        req: &HttpRequest,
        body: actix_web::web::Bytes,
    ) -> anyhow::Result<Request> {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => anyhow::bail!("unsupported method {}", other),
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        Ok(builder.body(body.to_vec()).build())
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        for (name, value) in spin_resp.headers() {
            response.append_header((name.to_string(), value.as_bytes().to_vec()));
        }

        response.body(spin_resp.body().to_vec())
    }
}

/// Catch-all service: every path goes through [`handlers::dispatch`].
pub async fn handle_all(
    store: web::Data<Store>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let spin_req = match adapter::actix_to_spin_request(&req, body) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "rejected request");
            return HttpResponse::MethodNotAllowed().finish();
        }
    };

    let resp = handlers::dispatch(store.get_ref(), spin_req);
    adapter::spin_to_actix_response(resp)
}

/// Registers the catch-all route and shared store on an actix `App`.
pub fn configure(store: Store) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(store))
            .default_service(web::route().to(handle_all));
    }
}
