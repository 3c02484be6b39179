//! JSON body extractor that runs `validator` rules before the handler sees
//! the value.
//!
//! Malformed JSON is a 400, a body that parses but breaks a rule is a 422
//! listing every offending field.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::ApiResponse;

pub struct ValidatedJson<T>(pub T);

pub enum BodyRejection {
    Malformed(JsonRejection),
    Invalid(ValidationErrors),
}

/// Flatten field errors into `field: message` pairs, sorted by field so the
/// response text is stable.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let parts: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();

    if parts.is_empty() {
        "Validation failed".to_string()
    } else {
        parts.join("; ")
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Malformed(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {}", rejection.body_text()),
            ),
            Self::Invalid(errors) => (StatusCode::UNPROCESSABLE_ENTITY, describe(&errors)),
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = BodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(BodyRejection::Malformed)?;
        value.validate().map_err(BodyRejection::Invalid)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::http::modules::bookings::CreateBookingRequest;
    use axum::body::{to_bytes, Body};
    use axum::routing::post;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn accept(ValidatedJson(body): ValidatedJson<CreateBookingRequest>) -> String {
        body.customer_name
    }

    async fn post_body(body: String) -> (StatusCode, String) {
        let app = Router::new().route("/bookings", post(accept));
        let request = axum::http::Request::post("/bookings")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn booking() -> Value {
        json!({
            "service_id": 1,
            "customer_name": "Kavya",
            "customer_email": "kavya@example.com",
            "customer_phone": "+919800000000",
            "event_date": "2024-03-01",
            "start_time": "11:00",
            "location": "Koramangala"
        })
    }

    #[tokio::test]
    async fn valid_booking_reaches_handler() {
        let (status, body) = post_body(booking().to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Kavya");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, _) = post_body("{not json".into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_violations_are_listed_by_field() {
        let mut body = booking();
        body["customer_email"] = json!("not-an-email");
        body["customer_phone"] = json!("12");
        body["guest_count"] = json!(0);

        let (status, text) = post_body(body.to_string()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let error = parsed["error"].as_str().unwrap();
        assert!(error.contains("customer_email: invalid email format"));
        assert!(error.contains("customer_phone"));
        assert!(error.contains("guest_count"));
        assert!(error.find("customer_email") < error.find("guest_count"));
    }
}
