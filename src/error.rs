use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        unexpected_error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        unexpected_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => {
                tracing::error!(code = self.code, cause = %self.message, "request failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Something went wrong, please try again.",
                )
            }
            NOT_FOUND => (StatusCode::NOT_FOUND, self.message.as_str()),
            PRICE_CHANGED => (StatusCode::CONFLICT, self.message.as_str()),
            QUOTE_EXPIRED => (StatusCode::GONE, self.message.as_str()),
            INSUFFICIENT_CREDIT | ACCOUNT_NOT_APPROVED => {
                (StatusCode::PAYMENT_REQUIRED, self.message.as_str())
            }
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

const UNEXPECTED: i32 = 0;
const ENV_VAR: i32 = 1;
const DATABASE: i32 = 2;
const REQWEST: i32 = 3;
const UPSTREAM: i32 = 4;
const DISTANCE_PROVIDER_UNAVAILABLE: i32 = 10;
const PAYMENT_GATEWAY_UNAVAILABLE: i32 = 11;
const LEDGER_UNAVAILABLE: i32 = 12;
const COMMIT_INCONSISTENCY: i32 = 13;
const DUPLICATE_REFERENCE: i32 = 14;

const INVALID_STATE: i32 = 100;
const INVALID_INPUT: i32 = 101;
const NOT_FOUND: i32 = 102;
const INVALID_DISTANCE: i32 = 110;
const UNKNOWN_VEHICLE: i32 = 111;
const UNKNOWN_SERVICE: i32 = 112;
const MISSING_TIME: i32 = 113;
const QUOTE_EXPIRED: i32 = 120;
const PRICE_CHANGED: i32 = 121;
const INSUFFICIENT_CREDIT: i32 = 130;
const ACCOUNT_NOT_APPROVED: i32 = 131;

fn error(code: i32, message: impl Into<String>) -> Error {
    Error {
        code,
        message: message.into(),
    }
}

pub fn unexpected_error<T: Debug>(cause: T) -> Error {
    error(UNEXPECTED, format!("unexpected error: {:?}", cause))
}

pub fn env_var_error(err: env::VarError) -> Error {
    error(ENV_VAR, format!("environment variable error: {}", err))
}

pub fn config_error(name: &str) -> Error {
    error(ENV_VAR, format!("malformed environment variable {}", name))
}

pub fn database_error<T: Debug>(cause: T) -> Error {
    error(DATABASE, format!("database error: {:?}", cause))
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    error(REQWEST, format!("reqwest error: {}", err))
}

pub fn upstream_error() -> Error {
    error(UPSTREAM, "upstream error")
}

pub fn distance_provider_unavailable_error<T: Debug>(cause: T) -> Error {
    error(
        DISTANCE_PROVIDER_UNAVAILABLE,
        format!("distance provider unavailable: {:?}", cause),
    )
}

pub fn payment_gateway_unavailable_error<T: Debug>(cause: T) -> Error {
    error(
        PAYMENT_GATEWAY_UNAVAILABLE,
        format!("payment gateway unavailable: {:?}", cause),
    )
}

pub fn ledger_unavailable_error<T: Debug>(cause: T) -> Error {
    error(LEDGER_UNAVAILABLE, format!("ledger unavailable: {:?}", cause))
}

pub fn commit_inconsistency_error(detail: impl Into<String>) -> Error {
    error(COMMIT_INCONSISTENCY, detail)
}

pub fn duplicate_reference_error() -> Error {
    error(DUPLICATE_REFERENCE, "booking reference already taken")
}

pub fn invalid_state_error() -> Error {
    error(INVALID_STATE, "operation not allowed in the current quote step")
}

pub fn invalid_input_error() -> Error {
    error(INVALID_INPUT, "invalid input")
}

pub fn not_found_error() -> Error {
    error(NOT_FOUND, "not found")
}

pub fn invalid_distance_error() -> Error {
    error(INVALID_DISTANCE, "distance must be greater than zero")
}

pub fn unknown_vehicle_error() -> Error {
    error(UNKNOWN_VEHICLE, "unknown vehicle")
}

pub fn unknown_service_error() -> Error {
    error(UNKNOWN_SERVICE, "unknown service")
}

pub fn missing_time_error() -> Error {
    error(MISSING_TIME, "a collection or delivery time is required")
}

pub fn quote_expired_error() -> Error {
    error(QUOTE_EXPIRED, "quote expired, please start again")
}

pub fn price_changed_error() -> Error {
    error(PRICE_CHANGED, "the price has changed, please review the new quote")
}

pub fn insufficient_credit_error() -> Error {
    error(
        INSUFFICIENT_CREDIT,
        "insufficient credit on account, please choose another payment method",
    )
}

pub fn account_not_approved_error() -> Error {
    error(ACCOUNT_NOT_APPROVED, "credit account is not approved")
}

impl Error {
    pub fn is_invalid_input_error(&self) -> bool {
        self.code == INVALID_INPUT
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == NOT_FOUND
    }

    pub fn is_invalid_state_error(&self) -> bool {
        self.code == INVALID_STATE
    }

    pub fn is_invalid_distance_error(&self) -> bool {
        self.code == INVALID_DISTANCE
    }

    pub fn is_unknown_vehicle_error(&self) -> bool {
        self.code == UNKNOWN_VEHICLE
    }

    pub fn is_unknown_service_error(&self) -> bool {
        self.code == UNKNOWN_SERVICE
    }

    pub fn is_missing_time_error(&self) -> bool {
        self.code == MISSING_TIME
    }

    pub fn is_quote_expired_error(&self) -> bool {
        self.code == QUOTE_EXPIRED
    }

    pub fn is_price_changed_error(&self) -> bool {
        self.code == PRICE_CHANGED
    }

    pub fn is_insufficient_credit_error(&self) -> bool {
        self.code == INSUFFICIENT_CREDIT
    }

    pub fn is_account_not_approved_error(&self) -> bool {
        self.code == ACCOUNT_NOT_APPROVED
    }

    pub fn is_distance_provider_unavailable_error(&self) -> bool {
        self.code == DISTANCE_PROVIDER_UNAVAILABLE
    }

    pub fn is_payment_gateway_unavailable_error(&self) -> bool {
        self.code == PAYMENT_GATEWAY_UNAVAILABLE
    }

    pub fn is_ledger_unavailable_error(&self) -> bool {
        self.code == LEDGER_UNAVAILABLE
    }

    pub fn is_commit_inconsistency_error(&self) -> bool {
        self.code == COMMIT_INCONSISTENCY
    }

    pub fn is_duplicate_reference_error(&self) -> bool {
        self.code == DUPLICATE_REFERENCE
    }

    pub fn is_user_facing(&self) -> bool {
        self.code >= 100
    }
}

#[test]
fn operational_errors_are_not_user_facing() {
    assert!(!ledger_unavailable_error("timeout").is_user_facing());
    assert!(!upstream_error().is_user_facing());
    assert!(quote_expired_error().is_user_facing());
    assert!(insufficient_credit_error().is_user_facing());
}

#[test]
fn generic_message_hides_operational_cause() {
    let response = ledger_unavailable_error("connection refused").into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = quote_expired_error().into_response();
    assert_eq!(response.status(), StatusCode::GONE);

    let response = insufficient_credit_error().into_response();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}
