// Subway
// Copyright 2026 The Subway Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Test utilities for the REST API.

use crate::db;
use crate::db::Db;
use crate::driver::{Chain, Driver};
use crate::model::{DayTime, Line, LineColor, LineDetails, LineName, LineStation, Station,
    StationName};
use crate::rest::{app, ErrorResponse};
use axum::extract::Request;
use axum::http::{self, HeaderName, HeaderValue};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 4096;

/// State of a running test, allowing interaction with the database underneath the app.
pub(crate) struct TestContext {
    /// The database backing the app.
    db: Arc<dyn Db + Send + Sync>,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the test environment.
    pub(crate) async fn setup() -> Self {
        let db = db::sqlite::testutils::setup().await;
        let driver = Driver::new(db.clone());
        let app = app(driver);
        Self { db, app }
    }

    /// Returns a copy of the app under test.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app under test.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Creates a station called `name` directly in the database.
    pub(crate) async fn create_station(&self, name: &'static str) -> Station {
        db::create_station(&mut self.db.ex().await.unwrap(), &StationName::from(name))
            .await
            .unwrap()
    }

    /// Creates a line called `name` directly in the database, with a fixed schedule.
    pub(crate) async fn create_line(&self, name: &'static str, color: &'static str) -> Line {
        let details = LineDetails::new(
            LineName::from(name),
            LineColor::from(color),
            DayTime::from("05:30"),
            DayTime::from("23:30"),
            10,
        );
        db::create_line(&mut self.db.ex().await.unwrap(), &details).await.unwrap()
    }

    /// Writes raw chain `links` for the line `line_id` directly in the database.
    pub(crate) async fn attach(&self, line_id: i64, links: &[LineStation]) {
        let mut ex = self.db.ex().await.unwrap();
        for link in links {
            db::put_line_station(&mut ex, line_id, link).await.unwrap();
        }
    }

    /// Returns the station ids of the line `line_id` in chain traversal order.
    pub(crate) async fn line_station_ids(&self, line_id: i64) -> Vec<i64> {
        let mut ex = self.db.ex().await.unwrap();
        let links = db::get_line_stations(&mut ex, line_id).await.unwrap();
        Chain::new(links).ordered().unwrap().iter().map(|link| *link.station_id()).collect()
    }
}

/// Builder for a single request to the API server.
#[must_use]
pub(crate) struct OneShotBuilder {
    /// The router for the app being tested.
    app: Router,

    /// Builder for the request that will be sent to the app.
    builder: axum::http::request::Builder,
}

impl OneShotBuilder {
    /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder }
    }

    /// Sets the header `name` to `value` in the outgoing request.
    pub(crate) fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Finishes building the request and sends it with an empty payload.
    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let request = self.builder.body(axum::body::Body::empty()).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a text payload.
    pub(crate) async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
            .body(axum::body::Body::from(text.into()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a JSON payload.
    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }
}

/// Type alias for the complex type returned by the `oneshot` function.
type HttpResponse = axum::response::Response;

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    /// Actual response that we received from the app.
    response: HttpResponse,

    /// Expected HTTP status code in the response above.
    exp_status: http::StatusCode,
}

impl From<HttpResponse> for ResponseChecker {
    fn from(response: HttpResponse) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    /// Sets the expected exit HTTP status to `status`.
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Performs common validation operations on the response.
    pub(crate) fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    /// Finishes checking the response and expects it to contain an empty body.
    pub(crate) async fn expect_empty(self) {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.is_empty(), "Body not empty; got {}", body);
    }

    /// Finishes checking the response and expects its body to be an `ErrorResponse` that
    /// matches `exp_re`.
    pub(crate) async fn expect_error(self, exp_re: &str) {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let response: ErrorResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                let body = String::from_utf8(body.to_vec()).unwrap();
                panic!("Invalid error response due to {}; content was {}", e, body);
            }
        };
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(
            re.is_match(&response.message),
            "Response content '{:?}' does not match re '{}'",
            response,
            exp_re
        );
    }

    /// Finishes checking the response and expects it to contain a valid JSON object of type `T`.
    pub(crate) async fn expect_json<T: DeserializeOwned>(self) -> T {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        serde_json::from_slice::<T>(&body).unwrap()
    }

    /// Finishes checking the response and expects its body to be valid UTF-8 and to match
    /// `exp_re`.
    pub(crate) async fn expect_text(self, exp_re: &str) {
        assert!(!exp_re.is_empty(), "Use expect_empty to validate empty responses");

        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(re.is_match(&body), "Body content '{}' does not match re '{}'", body, exp_re);
    }
}

/// Generates a test to verify that an API that does not expect a payload fails as necessary.
macro_rules! test_payload_must_be_empty {
    ( $app:expr, $route:expr ) => {
        #[tokio::test]
        async fn test_payload_must_be_empty() {
            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .send_text("should not be here")
                .await
                .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                .expect_error("should be empty")
                .await;
        }
    };
}

pub(crate) use test_payload_must_be_empty;

/// Generates a test to verify that an API that expects JSON fails when it gets something else.
macro_rules! test_payload_must_be_json {
    ( $app:expr, $route:expr ) => {
        #[tokio::test]
        async fn test_payload_must_be_json() {
            // These checks use expect_text instead of expect_error because JSON deserialization
            // errors are not funneled through RestError.

            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .send_text("this is not json")
                .await
                .expect_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE)
                .expect_text("Content-Type")
                .await;

            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                .send_text("this is not json")
                .await
                .expect_status(axum::http::StatusCode::BAD_REQUEST)
                .expect_text("expected ident")
                .await;
        }
    };
}

pub(crate) use test_payload_must_be_json;
