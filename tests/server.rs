//! Requests through the native actix front end.

use actix_web::{test, App};
use yatube::core::db::init_test_data;
use yatube::core::store::Store;
use yatube::server;

#[actix_web::test]
async fn serves_seeded_index() {
    let store = Store::default();
    init_test_data(&store).unwrap();
    let app = test::init_service(App::new().configure(server::configure(store))).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("content-type").and_then(|h| h.to_str().ok()),
        Some("text/html; charset=utf-8")
    );

    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("My cat learned to open the fridge today."));
}

#[actix_web::test]
async fn login_sets_session_cookie() {
    let store = Store::default();
    init_test_data(&store).unwrap();
    let app = test::init_service(App::new().configure(server::configure(store))).await;

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("username=test&password=test")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 302);

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sessionid="));

    let req = test::TestRequest::get()
        .uri("/follow/")
        .insert_header(("cookie", cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Just joined"));
}

#[actix_web::test]
async fn unsupported_methods_are_rejected() {
    let app = test::init_service(App::new().configure(server::configure(Store::default()))).await;

    let req = test::TestRequest::delete().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 405);

    let req = test::TestRequest::get().uri("/nowhere/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}
