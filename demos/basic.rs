//! Minimal tsu-rpc example: routes running inside an RPC middleware chain.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/users/7 -H 'accept: application/yaml'
//!   curl -i -X POST http://localhost:3000/users -d '{"name":""}'
//!   curl -i http://localhost:3000/ping

use serde::Deserialize;
use tsu_rpc::bridge::{self, Json, Responder, Validate, Validator};
use tsu_rpc::rpc::message::{Field, Message, Value};
use tsu_rpc::rpc::{self, BoxError, errors};
use tsu_rpc::{Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/ping", ping)
        .layer(bridge::middlewares([
            rpc::middleware::logging(),
            rpc::middleware::recovery(),
        ]))
        .get("/users/{id}", get_user)
        .post("/users", create_user);

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        eprintln!("server error: {e}");
    }
}

// Outside the layer: never sees the RPC chain.
async fn ping(req: Request) -> Response {
    Responder::negotiated().success(&req, None)
}

/// `example.User`, written with default fields kept.
struct User {
    id: i64,
    name: String,
    admin: bool,
}

impl Message for User {
    fn full_name(&self) -> &'static str {
        "example.User"
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("id", Value::Int64(self.id)),
            Field::new("name", Value::String(&self.name)),
            Field::new("admin", Value::Bool(self.admin)),
        ]
    }
}

// GET /users/{id}: 42 exists, everything else is a negotiated 404.
async fn get_user(req: Request) -> Response {
    let responder = Responder::negotiated();
    match req.param("id") {
        Some("42") => {
            let user = User { id: 42, name: "alice".into(), admin: false };
            responder.success(&req, Some(&user))
        }
        Some(id) => {
            let err = errors::Error::not_found("USER_NOT_FOUND", format!("no user {id}"))
                .with_metadata("id", id);
            responder.error(&req, Some(&err))
        }
        None => responder.error(&req, Some(&errors::Error::bad_request("MISSING_ID", "id is required"))),
    }
}

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

impl Validator for CreateUser {
    fn validate(&self) -> Result<(), BoxError> {
        if self.name.trim().is_empty() {
            return Err(errors::Error::bad_request("INVALID_NAME", "name must not be empty").into());
        }
        Ok(())
    }
}

impl Validate for CreateUser {
    fn validator(&self) -> Option<&dyn Validator> {
        Some(self)
    }
}

// POST /users: parse, validate, echo back.
async fn create_user(req: Request) -> Response {
    let responder = Responder::negotiated();
    let input: CreateUser = match serde_json::from_slice(req.body()) {
        Ok(input) => input,
        Err(e) => return responder.error(&req, Some(&errors::Error::bad_request("MALFORMED", e.to_string()))),
    };
    if let Err(e) = bridge::validate(&input) {
        return responder.error(&req, Some(&*e));
    }
    responder.success(&req, Some(&Json(serde_json::json!({ "name": input.name }))))
}
