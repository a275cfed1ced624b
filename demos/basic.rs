//! Minimal linear-web example: a users controller and health checks.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/1
//!   curl -H 'accept: application/xml' http://localhost:3000/api/users/1
//!   curl -X POST http://localhost:3000/api/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"carol"}'
//!   curl 'http://localhost:3000/api/users?limit=1'
//!   curl -X DELETE http://localhost:3000/api/users/1
//!   curl http://localhost:3000/api/healthz

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use http::StatusCode;
use linear_web::health::Health;
use linear_web::{
    Args, Config, Controller, Dispatcher, HandlerError, MediaType, ParamType, ParameterBinding,
    Route, Scanner, Server,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize)]
#[serde(rename = "user")]
struct User {
    id: u64,
    name: String,
}

#[derive(Serialize)]
#[serde(rename = "users")]
struct UserList {
    user: Vec<User>,
}

#[derive(Deserialize)]
#[serde(rename = "user")]
struct NewUser {
    name: String,
}

#[derive(Default)]
struct Users {
    store: Mutex<BTreeMap<u64, User>>,
}

impl Users {
    fn list(&self, args: Args) -> Result<UserList, HandlerError> {
        let limit: usize = args.get("limit").unwrap_or(usize::MAX);
        let store = self.store.lock().map_err(|_| HandlerError::new("store poisoned"))?;
        Ok(UserList { user: store.values().take(limit).cloned().collect() })
    }

    // GET /users/{id}
    fn find(&self, args: Args) -> Result<User, HandlerError> {
        let id: u64 = args.get("id").unwrap_or_default();
        let store = self.store.lock().map_err(|_| HandlerError::new("store poisoned"))?;
        store
            .get(&id)
            .cloned()
            .ok_or_else(|| HandlerError::not_found(format!("user {id} not found")).with_code("user_not_found"))
    }

    // POST /users → 201
    fn create(&self, mut args: Args) -> Result<User, HandlerError> {
        let new = args.take_body::<NewUser>().ok_or_else(|| HandlerError::bad_request("body required"))?;
        let mut store = self.store.lock().map_err(|_| HandlerError::new("store poisoned"))?;
        let id = store.keys().next_back().map_or(1, |last| last + 1);
        let user = User { id, name: new.name };
        store.insert(id, user.clone());
        Ok(user)
    }

    // DELETE /users/{id} → 204
    fn remove(&self, args: Args) -> Result<(), HandlerError> {
        let id: u64 = args.get("id").unwrap_or_default();
        let mut store = self.store.lock().map_err(|_| HandlerError::new("store poisoned"))?;
        store.remove(&id).map(|_| ()).ok_or_else(|| HandlerError::not_found(format!("user {id} not found")))
    }
}

impl Controller for Users {
    fn path(&self) -> &str {
        "/users"
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        let both = [MediaType::Json, MediaType::Xml];
        let (list, find, create, remove) = (self.clone(), self.clone(), self.clone(), self);
        vec![
            Route::get("/")
                .produces(both)
                .param(ParameterBinding::query("limit", ParamType::UInt).optional())
                .handler(move |args: Args| list.list(args)),
            Route::get("/{id}")
                .produces(both)
                .param(ParameterBinding::path("id", ParamType::UInt))
                .handler(move |args: Args| find.find(args)),
            Route::post("/")
                .consumes(both)
                .produces(both)
                .param(ParameterBinding::body::<NewUser>("user"))
                .status(StatusCode::CREATED)
                .handler(move |args: Args| create.create(args)),
            Route::delete("/{id}")
                .param(ParameterBinding::path("id", ParamType::UInt))
                .status(StatusCode::NO_CONTENT)
                .handler(move |args: Args| remove.remove(args)),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), linear_web::Error> {
    tracing_subscriber::fmt::init();

    let config = Config { base_path: "/api".to_owned(), ..Config::default() };

    let users = Users::default();
    if let Ok(mut store) = users.store.lock() {
        store.insert(1, User { id: 1, name: "alice".into() });
    }

    let table = Scanner::from_config(&config)
        .controller(users)
        .controller(Health::new())
        .build()?;

    Server::from_config(&config)?
        .serve(Dispatcher::new(Arc::new(table)))
        .await
}
