use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::Value;

use crate::codes::Code;

/// Wire shape shared by every API response.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub msg: &'static str,
    pub data: Value,
}

/// HTTP status + application code + payload, rendered as an `Envelope`.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: Status,
    pub code: Code,
    pub data: Value,
}

impl ApiResponse {
    pub fn new(status: Status, code: Code, data: Value) -> Self {
        ApiResponse { status, code, data }
    }

    /// 200 + SUCCESS with a payload
    pub fn ok(data: Value) -> Self {
        Self::new(Status::Ok, Code::Success, data)
    }

    /// 200 + SUCCESS, `data: null`
    pub fn done() -> Self {
        Self::ok(Value::Null)
    }

    /// Business-level outcome (e.g. "does not exist"): HTTP 200, no payload.
    pub fn business(code: Code) -> Self {
        Self::new(Status::Ok, code, Value::Null)
    }

    pub fn invalid_params() -> Self {
        Self::new(Status::BadRequest, Code::InvalidParams, Value::Null)
    }

    pub fn server_error(code: Code) -> Self {
        Self::new(Status::InternalServerError, code, Value::Null)
    }
}

impl<'r> Responder<'r, 'static> for ApiResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status;
        let body = Envelope {
            code: self.code.value(),
            msg: self.code.msg(),
            data: self.data,
        };
        (status, Json(body)).respond_to(req)
    }
}
