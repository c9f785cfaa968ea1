use axum::{body::Body, http::Request, response::Response};
use serde::de::DeserializeOwned;

pub fn build_post_request(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub fn build_get_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub async fn read_json<T: DeserializeOwned>(res: Response) -> T {
    let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}
