use crate::api_state::AppState;
use crate::models::api::*;
use crate::models::audit_entry::AuditLogEntry;
use crate::models::error::{AuditError, Result};
use crate::models::log_code::LogCode;
use crate::models::query_payload::{AuditFilter, QueryPayload};
use crate::models::severity::Severity;
use crate::repo::storage::{LOG_CODES_TABLE, LOG_TABLE};
use rocket::serde::json::Json;
use rocket::{Route, State};

pub fn routes() -> Vec<Route> {
    routes![get_severity, get_log_codes, get_audit_entries, health_check]
}

/// GET /audit/severity - Severity lookup table
#[get("/audit/severity")]
pub fn get_severity() -> Json<SeverityResponse> {
    Json(SeverityResponse {
        log_severity: Severity::ALL.into_iter().map(Into::into).collect(),
    })
}

/// GET /audit/logcode - Known audit log codes
#[get("/audit/logcode")]
pub async fn get_log_codes(state: &State<AppState>) -> Result<Json<LogCodeResponse>> {
    let log_code = state.query_tbl(LOG_CODES_TABLE).await?.rows_as::<LogCode>()?;
    Ok(Json(LogCodeResponse { log_code }))
}

/// GET /audit - Audit entries, newest first
#[get("/audit?<source>&<severity>&<limit>&<skip>")]
pub async fn get_audit_entries(
    source: Option<String>,
    severity: Option<String>,
    limit: Option<String>,
    skip: Option<String>,
    state: &State<AppState>,
) -> Result<Json<AuditResponse>> {
    let limit = parse_non_negative(limit.as_deref(), AuditError::InvalidLimit)?;
    let skip = parse_non_negative(skip.as_deref(), AuditError::InvalidSkip)?;
    let severity = parse_severity(severity.as_deref())?;

    let source = match non_blank(source.as_deref()) {
        Some(code) => {
            let known = state.query_tbl(LOG_CODES_TABLE).await?.rows_as::<LogCode>()?;
            if !known.iter().any(|log_code| log_code.code == code) {
                return Err(AuditError::InvalidSource(code.to_string()));
            }
            Some(code.to_string())
        }
        None => None,
    };

    // Only one filter is attached; source wins over severity
    let filter = source
        .map(AuditFilter::Source)
        .or(severity.map(AuditFilter::Severity));

    let payload = QueryPayload::audit_listing(filter, limit, skip).to_json()?;
    let audit = state
        .query_tbl_with_payload(LOG_TABLE, payload)
        .await?
        .rows_as::<AuditLogEntry>()?;

    let total_count = audit.first().and_then(|entry| entry.count).unwrap_or(0);

    Ok(Json(AuditResponse { total_count, audit }))
}

/// GET /health - Health check endpoint
#[get("/health")]
pub fn health_check() -> &'static str {
    "OK"
}

/// `None` for absent or whitespace-only parameters; other values pass through untouched
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_non_negative(value: Option<&str>, error: AuditError) -> Result<Option<u64>> {
    match non_blank(value) {
        Some(text) => match text.trim().parse::<i64>() {
            Ok(number) if number >= 0 => Ok(Some(number as u64)),
            _ => Err(error),
        },
        None => Ok(None),
    }
}

fn parse_severity(value: Option<&str>) -> Result<Option<Severity>> {
    non_blank(value)
        .map(|name| name.parse::<Severity>().map_err(AuditError::InvalidSeverity))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api::QueryResult;
    use crate::models::log_code::{default_log_codes, DEFAULT_LOG_CODES};
    use crate::repo::storage::StorageClient;
    use rocket::http::Status;
    use rocket::local::blocking::Client;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Records every call and serves canned rows
    struct MockStorage {
        listing: QueryResult,
        tables: Mutex<Vec<String>>,
        payloads: Mutex<Vec<(String, Value)>>,
    }

    impl MockStorage {
        fn new() -> Arc<Self> {
            Self::with_listing(vec![json!({
                "log": {"end_time": "2018-01-30 18:39:48.1517317788", "rowsRemaining": 0,
                        "start_time": "2018-01-30 18:39:48.1517317788", "rowsRemoved": 0,
                        "unsentRowsRemoved": 0, "rowsRetained": 0},
                "code": "PURGE", "level": "4", "id": 2,
                "ts": "2018-01-30 18:39:48.796263+05:30", "count": 1
            })])
        }

        fn with_listing(rows: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                listing: QueryResult { rows },
                tables: Mutex::new(Vec::new()),
                payloads: Mutex::new(Vec::new()),
            })
        }

        fn last_payload(&self) -> (String, Value) {
            self.payloads.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StorageClient for MockStorage {
        fn query_tbl(&self, table: &str) -> Result<QueryResult> {
            self.tables.lock().unwrap().push(table.to_string());
            let rows = default_log_codes()
                .into_iter()
                .map(|code| serde_json::to_value(code).unwrap())
                .collect();
            Ok(QueryResult { rows })
        }

        fn query_tbl_with_payload(&self, table: &str, payload: &str) -> Result<QueryResult> {
            let payload = serde_json::from_str(payload).unwrap();
            self.payloads
                .lock()
                .unwrap()
                .push((table.to_string(), payload));
            Ok(self.listing.clone())
        }
    }

    struct FailingStorage;

    impl StorageClient for FailingStorage {
        fn query_tbl(&self, _table: &str) -> Result<QueryResult> {
            Err(AuditError::DatabasePool("storage service unreachable".to_string()))
        }

        fn query_tbl_with_payload(&self, _table: &str, _payload: &str) -> Result<QueryResult> {
            Err(AuditError::DatabasePool("storage service unreachable".to_string()))
        }
    }

    fn client(storage: Arc<dyn StorageClient>) -> Client {
        let rocket = rocket::build()
            .manage(AppState::new(storage))
            .mount("/", routes());
        Client::tracked(rocket).expect("valid rocket instance")
    }

    fn assert_payload(request_params: &str, expected: Value) {
        let mock = MockStorage::new();
        let client = client(mock.clone());

        let response = client.get(format!("/audit{}", request_params)).dispatch();
        assert_eq!(response.status(), Status::Ok, "request {}", request_params);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["audit"].as_array().unwrap().len(), 1);

        let (table, payload) = mock.last_payload();
        assert_eq!(table, "log");
        assert_eq!(payload, expected, "request {}", request_params);
    }

    fn assert_bad_request(request_params: &str, message: &str) {
        let client = client(MockStorage::new());

        let response = client.get(format!("/audit{}", request_params)).dispatch();
        assert_eq!(response.status(), Status::BadRequest, "request {}", request_params);

        let body: ErrorResponse = response.into_json().unwrap();
        assert_eq!(body.error, message);
    }

    #[test]
    fn test_get_severity() {
        let client = client(Arc::new(FailingStorage));

        let response = client.get("/audit/severity").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(
            body,
            json!({"logSeverity": [
                {"index": 1, "name": "FATAL"},
                {"index": 2, "name": "ERROR"},
                {"index": 3, "name": "WARNING"},
                {"index": 4, "name": "INFORMATION"}
            ]})
        );
    }

    #[test]
    fn test_audit_log_codes() {
        let mock = MockStorage::new();
        let client = client(mock.clone());

        let response = client.get("/audit/logcode").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        let codes: Vec<&str> = body["logCode"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["code"].as_str().unwrap())
            .collect();
        let expected: Vec<&str> = DEFAULT_LOG_CODES.iter().map(|(code, _)| *code).collect();
        assert_eq!(codes.len(), 18);
        assert_eq!(codes, expected);

        assert_eq!(*mock.tables.lock().unwrap(), vec!["log_codes".to_string()]);
    }

    #[test]
    fn test_audit_log_codes_storage_failure() {
        let client = client(Arc::new(FailingStorage));

        let response = client.get("/audit/logcode").dispatch();
        assert_eq!(response.status(), Status::InternalServerError);

        let body: ErrorResponse = response.into_json().unwrap();
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn test_get_audit_without_params() {
        assert_payload(
            "",
            json!({"where": {"column": "1", "condition": "=", "value": "1"},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20}),
        );
    }

    #[test]
    fn test_get_audit_with_source() {
        assert_payload(
            "?source=PURGE",
            json!({"where": {"column": "1", "condition": "=", "value": "1",
                             "and": {"column": "code", "condition": "=", "value": "PURGE"}},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20}),
        );
    }

    #[test]
    fn test_get_audit_with_skip() {
        assert_payload(
            "?skip=1",
            json!({"where": {"column": "1", "condition": "=", "value": "1"},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20, "skip": 1}),
        );
    }

    #[test]
    fn test_get_audit_with_lowercase_severity() {
        assert_payload(
            "?severity=error",
            json!({"where": {"column": "1", "condition": "=", "value": "1",
                             "and": {"column": "level", "condition": "=", "value": 2}},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20}),
        );
    }

    #[test]
    fn test_get_audit_with_severity_and_limit() {
        assert_payload(
            "?severity=ERROR&limit=1",
            json!({"where": {"column": "1", "condition": "=", "value": "1",
                             "and": {"column": "level", "condition": "=", "value": 2}},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 1}),
        );
    }

    #[test]
    fn test_get_audit_with_severity_limit_and_skip() {
        assert_payload(
            "?severity=INFORMATION&limit=1&skip=1",
            json!({"where": {"column": "1", "condition": "=", "value": "1",
                             "and": {"column": "level", "condition": "=", "value": 4}},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 1, "skip": 1}),
        );
    }

    #[test]
    fn test_get_audit_with_blank_params() {
        assert_payload(
            "?source=&severity=&limit=&skip=",
            json!({"where": {"column": "1", "condition": "=", "value": "1"},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20}),
        );
    }

    #[test]
    fn test_get_audit_limit_zero_is_allowed() {
        assert_payload(
            "?limit=0",
            json!({"where": {"column": "1", "condition": "=", "value": "1"},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 0}),
        );
    }

    #[test]
    fn test_every_known_source_filters_on_code() {
        for (code, _) in DEFAULT_LOG_CODES {
            let mock = MockStorage::new();
            let client = client(mock.clone());

            let response = client.get(format!("/audit?source={}", code)).dispatch();
            assert_eq!(response.status(), Status::Ok);

            let (_, payload) = mock.last_payload();
            assert_eq!(payload["where"]["and"]["column"], "code");
            assert_eq!(payload["where"]["and"]["value"], code);
        }
    }

    #[test]
    fn test_every_severity_filters_on_level() {
        let cases = [
            ("fatal", 1),
            ("Error", 2),
            ("WARNING", 3),
            ("information", 4),
        ];
        for (name, index) in cases {
            let mock = MockStorage::new();
            let client = client(mock.clone());

            let response = client.get(format!("/audit?severity={}", name)).dispatch();
            assert_eq!(response.status(), Status::Ok);

            let (_, payload) = mock.last_payload();
            assert_eq!(payload["where"]["and"]["column"], "level");
            assert_eq!(payload["where"]["and"]["value"], index);
        }
    }

    #[test]
    fn test_source_takes_precedence_over_severity() {
        assert_payload(
            "?source=SRVFL&severity=ERROR",
            json!({"where": {"column": "1", "condition": "=", "value": "1",
                             "and": {"column": "code", "condition": "=", "value": "SRVFL"}},
                   "sort": {"column": "ts", "direction": "desc"}, "limit": 20}),
        );
    }

    #[test]
    fn test_log_codes_loaded_only_for_source() {
        let mock = MockStorage::new();
        let client = client(mock.clone());

        client.get("/audit?severity=FATAL").dispatch();
        assert!(mock.tables.lock().unwrap().is_empty());

        client.get("/audit?source=START").dispatch();
        assert_eq!(*mock.tables.lock().unwrap(), vec!["log_codes".to_string()]);
    }

    #[test]
    fn test_response_rows_drop_count_and_normalize_level() {
        let client = client(MockStorage::new());

        let response = client.get("/audit").dispatch();
        let body: Value = response.into_json().unwrap();

        let entry = &body["audit"][0];
        assert_eq!(entry["code"], "PURGE");
        assert_eq!(entry["level"], 4);
        assert_eq!(entry["id"], 2);
        assert_eq!(entry["ts"], "2018-01-30 18:39:48.796263+05:30");
        assert_eq!(entry["log"]["rowsRemoved"], 0);
        assert!(entry.get("count").is_none());
    }

    #[test]
    fn test_empty_listing_reports_zero_total() {
        let client = client(MockStorage::with_listing(Vec::new()));

        let response = client.get("/audit?source=BKEXC").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body, json!({"totalCount": 0, "audit": []}));
    }

    #[test]
    fn test_bad_source() {
        assert_bad_request("?source=BLA", "BLA is not a valid source");
        assert_bad_request("?source=1234", "1234 is not a valid source");
    }

    #[test]
    fn test_source_is_not_trimmed() {
        assert_bad_request("?source=%20PURGE", " PURGE is not a valid source");
        assert_bad_request("?source=PURGE%20", "PURGE  is not a valid source");
    }

    #[test]
    fn test_severity_is_not_trimmed() {
        assert_bad_request("?severity=%20error", "' error' is not a valid severity");
    }

    #[test]
    fn test_source_is_case_sensitive() {
        assert_bad_request("?source=purge", "purge is not a valid source");
    }

    #[test]
    fn test_bad_limit() {
        assert_bad_request("?limit=invalid", "Limit must be a positive integer");
        assert_bad_request("?limit=-1", "Limit must be a positive integer");
    }

    #[test]
    fn test_bad_skip() {
        assert_bad_request("?skip=invalid", "Skip/Offset must be a positive integer");
        assert_bad_request("?skip=-1", "Skip/Offset must be a positive integer");
    }

    #[test]
    fn test_bad_severity() {
        assert_bad_request("?severity=BLA", "'BLA' is not a valid severity");
    }

    #[test]
    fn test_limit_is_validated_first() {
        assert_bad_request(
            "?limit=x&skip=y&severity=BLA&source=BLA",
            "Limit must be a positive integer",
        );
        assert_bad_request(
            "?skip=y&severity=BLA&source=BLA",
            "Skip/Offset must be a positive integer",
        );
        assert_bad_request("?severity=BLA&source=BLA", "'BLA' is not a valid severity");
    }

    #[test]
    fn test_get_audit_storage_failure() {
        let client = client(Arc::new(FailingStorage));

        let response = client.get("/audit").dispatch();
        assert_eq!(response.status(), Status::InternalServerError);

        let body: ErrorResponse = response.into_json().unwrap();
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn test_malformed_rows_are_internal_errors() {
        let client = client(MockStorage::with_listing(vec![json!({"code": "PURGE"})]));

        let response = client.get("/audit").dispatch();
        assert_eq!(response.status(), Status::InternalServerError);
    }

    #[test]
    fn test_health_check() {
        let client = client(Arc::new(FailingStorage));

        let response = client.get("/health").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "OK");
    }

    #[test]
    fn test_parse_non_negative() {
        assert_eq!(parse_non_negative(None, AuditError::InvalidLimit).unwrap(), None);
        assert_eq!(parse_non_negative(Some("  "), AuditError::InvalidLimit).unwrap(), None);
        assert_eq!(parse_non_negative(Some("7"), AuditError::InvalidLimit).unwrap(), Some(7));
        assert_eq!(parse_non_negative(Some(" 3 "), AuditError::InvalidLimit).unwrap(), Some(3));
        assert!(parse_non_negative(Some("1.5"), AuditError::InvalidLimit).is_err());
    }

    #[test]
    fn test_non_blank_keeps_surrounding_whitespace() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(Some(" \t")), None);
        assert_eq!(non_blank(Some(" PURGE ")), Some(" PURGE "));
    }
}
