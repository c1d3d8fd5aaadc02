//! REST client for the remote scheduling system.
//!
//! Speaks the ConnectWise-style API surface the dispatcher needs:
//! - fetching a member's schedule entries from a lower-bound date
//! - fetching ticket detail (status, budget and actual hours)
//! - creating schedule entries for committed slots
//! - updating a ticket's status after dispatch
//!
//! Everything returned to callers is converted into `td-core` types at
//! this boundary; malformed wire data is refused here so the engine never
//! sees it.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration as StdDuration;

use base64::Engine as _;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use td_core::{
    CalendarEntry, DispatchRecord, EntryId, EntryType, MemberId, TicketDetail, TicketId,
};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// REST surface version path.
const API_PATH: &str = "v4_6_release/apis/3.0";
/// Page size for list queries; the fetched window is one run's worth of
/// entries, well under a page.
const PAGE_SIZE: u32 = 1000;

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provided credentials were unusable.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: &'static str },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse a response body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A fetched schedule entry is missing required fields. The occupancy
    /// model must not be built from partial data, so this aborts the run.
    #[error("malformed schedule entry {entry}: missing {field}")]
    MalformedEntry { entry: String, field: &'static str },
}

/// Connection settings for the remote system.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name, e.g. `na.myconnectwise.net`.
    pub site: String,
    pub company: String,
    pub public_key: String,
    pub private_key: String,
    pub client_id: String,
}

/// REST client.
///
/// Safe to share across tasks; clones share the underlying connection
/// pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base: String,
    authorization: String,
    client_id: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base", &self.base)
            .field("authorization", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error when any credential field is empty or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        for (value, reason) in [
            (&config.site, "site cannot be empty"),
            (&config.company, "company cannot be empty"),
            (&config.public_key, "public key cannot be empty"),
            (&config.private_key, "private key cannot be empty"),
            (&config.client_id, "client id cannot be empty"),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidCredentials { reason });
            }
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base: format!("https://{}/{API_PATH}", config.site),
            authorization: basic_auth(&config.company, &config.public_key, &config.private_key),
            client_id: config.client_id.clone(),
        })
    }

    /// Fetches the member's schedule entries starting around `start_date`.
    ///
    /// The query lower bound is pulled back one day so entries shifted by
    /// timezone skew at the boundary are not missed; the occupancy build
    /// tolerates entries starting before the nominal run date.
    pub async fn schedule_entries(
        &self,
        member: &MemberId,
        start_date: NaiveDate,
    ) -> Result<Vec<CalendarEntry>, ApiError> {
        let conditions = schedule_conditions(member, start_date);
        tracing::debug!(%conditions, "fetching schedule entries");
        let body = self
            .get(&format!("{}/schedule/entries", self.base), &conditions)
            .await?;
        let wires: Vec<ScheduleEntryWire> = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        wires.into_iter().map(CalendarEntry::try_from).collect()
    }

    /// Fetches detail for the given tickets.
    pub async fn tickets(&self, ids: &[TicketId]) -> Result<Vec<TicketDetail>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conditions = ticket_conditions(ids);
        tracing::debug!(%conditions, "fetching ticket detail");
        let body = self
            .get(&format!("{}/service/tickets", self.base), &conditions)
            .await?;
        let wires: Vec<TicketWire> = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        Ok(wires.into_iter().map(TicketDetail::from).collect())
    }

    /// Creates a schedule entry for a committed slot.
    pub async fn create_entry(&self, entry: &NewScheduleEntry) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/schedule/entries", self.base))
            .header("Authorization", &self.authorization)
            .header("clientId", &self.client_id)
            .json(entry)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Moves a ticket to a new status by name.
    pub async fn update_ticket_status(
        &self,
        ticket: &TicketId,
        status: &str,
    ) -> Result<(), ApiError> {
        let ops = [PatchOp {
            op: "replace",
            path: "status/name",
            value: status,
        }];
        let response = self
            .http
            .patch(format!("{}/service/tickets/{ticket}", self.base))
            .header("Authorization", &self.authorization)
            .header("clientId", &self.client_id)
            .json(&ops)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn get(&self, url: &str, conditions: &str) -> Result<String, ApiError> {
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(url)
            .query(&[("conditions", conditions), ("pageSize", page_size.as_str())])
            .header("Authorization", &self.authorization)
            .header("clientId", &self.client_id)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(parse_api_error(status.as_u16(), &body))
        }
    }
}

fn basic_auth(company: &str, public_key: &str, private_key: &str) -> String {
    let raw = format!("{company}+{public_key}:{private_key}");
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

/// Conditions for the member's entry window, lower bound pulled back one
/// day to absorb timezone skew.
fn schedule_conditions(member: &MemberId, start_date: NaiveDate) -> String {
    let lower = start_date - Duration::days(1);
    format!(
        "member/identifier = \"{member}\" AND dateStart >= [{}]",
        lower.format("%Y-%m-%d")
    )
}

fn ticket_conditions(ids: &[TicketId]) -> String {
    let joined = ids
        .iter()
        .map(TicketId::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!("id IN ({joined})")
}

fn parse_api_error(status: u16, body: &str) -> ApiError {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body).map_or_else(
        |_| ApiError::Api {
            status,
            message: body.to_string(),
        },
        |payload| ApiError::Api {
            status,
            message: payload.message,
        },
    )
}

/// Reference-by-identifier wire fragment (`{"identifier": "..."}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentifierRef {
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleEntryWire {
    id: Option<i64>,
    object_id: Option<i64>,
    #[serde(rename = "type")]
    entry_type: Option<IdentifierRef>,
    date_start: Option<DateTime<Utc>>,
    date_end: Option<DateTime<Utc>>,
    hours: Option<f64>,
}

impl TryFrom<ScheduleEntryWire> for CalendarEntry {
    type Error = ApiError;

    fn try_from(wire: ScheduleEntryWire) -> Result<Self, Self::Error> {
        let label = wire
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        let missing = |field: &'static str| ApiError::MalformedEntry {
            entry: label.clone(),
            field,
        };

        let entry_type = wire.entry_type.ok_or_else(|| missing("type"))?;
        let start = wire.date_start.ok_or_else(|| missing("dateStart"))?;
        let end = wire.date_end.ok_or_else(|| missing("dateEnd"))?;

        Ok(Self {
            id: wire.id.and_then(|id| EntryId::new(id.to_string()).ok()),
            entry_type: EntryType::from_code(&entry_type.identifier),
            ticket: wire
                .object_id
                .and_then(|id| TicketId::new(id.to_string()).ok()),
            start,
            end,
            hours: wire.hours.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketWire {
    id: i64,
    status: Option<NameRef>,
    budget_hours: Option<f64>,
    actual_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NameRef {
    name: String,
}

impl From<TicketWire> for TicketDetail {
    fn from(wire: TicketWire) -> Self {
        Self {
            // Numeric wire ids are never empty once rendered.
            id: TicketId::new(wire.id.to_string()).expect("rendered numeric id"),
            status: wire.status.map(|status| status.name).unwrap_or_default(),
            budget_hours: wire.budget_hours.unwrap_or(0.0),
            actual_hours: wire.actual_hours.unwrap_or(0.0),
        }
    }
}

/// Body for creating a schedule entry from a committed slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleEntry {
    object_id: TicketId,
    member: IdentifierRef,
    date_start: String,
    date_end: String,
    #[serde(rename = "type")]
    entry_type: IdentifierRef,
    span: IdentifierRef,
    /// The engine's own conflict avoidance is advisory; the remote system
    /// must accept the entry even if something changed underneath us.
    allow_schedule_conflicts_flag: bool,
    hours: f64,
}

impl NewScheduleEntry {
    /// Builds the wire body for a planned allocation.
    #[must_use]
    pub fn from_record(record: &DispatchRecord, member: &MemberId) -> Self {
        let start = record.start.with_timezone(&Utc);
        let minutes = (record.hours * 60.0).round() as i64;
        let end = start + Duration::minutes(minutes);
        Self {
            object_id: record.ticket.clone(),
            member: IdentifierRef {
                identifier: member.to_string(),
            },
            date_start: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            date_end: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry_type: IdentifierRef {
                identifier: "S".to_string(),
            },
            span: IdentifierRef {
                identifier: "N".to_string(),
            },
            allow_schedule_conflicts_flag: true,
            hours: record.hours,
        }
    }
}

/// Per-run ticket detail cache.
///
/// The remote system is queried at most once per ticket per run; repeated
/// fetches are answered from the cache.
#[derive(Debug)]
pub struct TicketStore<'a> {
    client: &'a Client,
    cache: HashMap<TicketId, TicketDetail>,
}

impl<'a> TicketStore<'a> {
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    /// Returns detail for the given tickets, querying only uncached ids.
    ///
    /// Tickets the remote system does not know are absent from the result.
    pub async fn fetch(&mut self, ids: &[TicketId]) -> Result<Vec<TicketDetail>, ApiError> {
        let missing: Vec<TicketId> = ids
            .iter()
            .filter(|id| !self.cache.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            for detail in self.client.tickets(&missing).await? {
                self.cache.insert(detail.id.clone(), detail);
            }
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.cache.get(id).cloned())
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct PatchOp<'a> {
    op: &'static str,
    path: &'static str,
    value: &'a str,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            site: "na.myconnectwise.net".to_string(),
            company: "acme".to_string(),
            public_key: "pub".to_string(),
            private_key: "priv".to_string(),
            client_id: "11112222-3333-4444-5555-666677778888".to_string(),
        }
    }

    #[test]
    fn client_rejects_empty_credentials() {
        let mut bad = config();
        bad.private_key = "  ".to_string();
        assert!(matches!(
            Client::new(&bad),
            Err(ApiError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn client_debug_redacts_authorization() {
        let client = Client::new(&config()).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("priv"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn basic_auth_encodes_company_and_keys() {
        // base64("acme+pub:priv")
        assert_eq!(basic_auth("acme", "pub", "priv"), "Basic YWNtZStwdWI6cHJpdg==");
    }

    #[test]
    fn schedule_conditions_pull_the_bound_back_a_day() {
        let member = MemberId::new("tchristensen").unwrap();
        let start = NaiveDate::from_ymd_opt(2017, 7, 12).unwrap();
        assert_eq!(
            schedule_conditions(&member, start),
            "member/identifier = \"tchristensen\" AND dateStart >= [2017-07-11]"
        );
    }

    #[test]
    fn schedule_conditions_cross_month_boundaries() {
        let member = MemberId::new("tchristensen").unwrap();
        let start = NaiveDate::from_ymd_opt(2017, 8, 1).unwrap();
        assert!(schedule_conditions(&member, start).contains("[2017-07-31]"));
    }

    #[test]
    fn ticket_conditions_join_ids() {
        let ids = [
            TicketId::new("339429").unwrap(),
            TicketId::new("340224").unwrap(),
        ];
        assert_eq!(ticket_conditions(&ids), "id IN (339429, 340224)");
    }

    #[test]
    fn schedule_entry_wire_converts_to_core() {
        let json = r#"{
            "id": 5512,
            "objectId": 339429,
            "type": {"identifier": "S"},
            "dateStart": "2017-07-12T16:00:00Z",
            "dateEnd": "2017-07-12T20:00:00Z",
            "hours": 4.0
        }"#;
        let wire: ScheduleEntryWire = serde_json::from_str(json).unwrap();
        let entry = CalendarEntry::try_from(wire).unwrap();

        assert_eq!(entry.id, Some(EntryId::new("5512").unwrap()));
        assert_eq!(entry.entry_type, EntryType::Schedule);
        assert_eq!(entry.ticket, Some(TicketId::new("339429").unwrap()));
        assert_eq!(entry.start, Utc.with_ymd_and_hms(2017, 7, 12, 16, 0, 0).unwrap());
        assert!((entry.hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn schedule_entry_missing_type_is_malformed() {
        let json = r#"{
            "id": 5512,
            "dateStart": "2017-07-12T16:00:00Z",
            "dateEnd": "2017-07-12T20:00:00Z"
        }"#;
        let wire: ScheduleEntryWire = serde_json::from_str(json).unwrap();
        let err = CalendarEntry::try_from(wire).unwrap_err();
        assert!(matches!(
            err,
            ApiError::MalformedEntry {
                field: "type",
                ..
            }
        ));
    }

    #[test]
    fn schedule_entry_missing_dates_is_malformed() {
        let json = r#"{"id": 5512, "type": {"identifier": "S"}}"#;
        let wire: ScheduleEntryWire = serde_json::from_str(json).unwrap();
        assert!(matches!(
            CalendarEntry::try_from(wire).unwrap_err(),
            ApiError::MalformedEntry {
                field: "dateStart",
                ..
            }
        ));
    }

    #[test]
    fn ticket_wire_defaults_missing_hours_to_zero() {
        let json = r#"{"id": 339429, "status": {"name": "In Progress"}, "budgetHours": 8.0}"#;
        let wire: TicketWire = serde_json::from_str(json).unwrap();
        let detail = TicketDetail::from(wire);

        assert_eq!(detail.id, TicketId::new("339429").unwrap());
        assert_eq!(detail.status, "In Progress");
        assert!((detail.budget_hours - 8.0).abs() < 1e-9);
        assert!(detail.actual_hours.abs() < 1e-9);
    }

    #[test]
    fn new_entry_spans_the_allocated_hours_in_utc() {
        let record = DispatchRecord {
            ticket: TicketId::new("339429").unwrap(),
            start: Los_Angeles.with_ymd_and_hms(2017, 7, 12, 9, 0, 0).unwrap(),
            hours: 2.5,
            simulated: false,
        };
        let member = MemberId::new("tchristensen").unwrap();
        let entry = NewScheduleEntry::from_record(&record, &member);

        assert_eq!(entry.date_start, "2017-07-12T16:00:00Z");
        assert_eq!(entry.date_end, "2017-07-12T18:30:00Z");
        assert!((entry.hours - 2.5).abs() < 1e-9);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["objectId"], "339429");
        assert_eq!(json["member"]["identifier"], "tchristensen");
        assert_eq!(json["type"]["identifier"], "S");
        assert_eq!(json["span"]["identifier"], "N");
        assert_eq!(json["allowScheduleConflictsFlag"], true);
    }

    #[test]
    fn api_error_extracts_server_message() {
        let err = parse_api_error(404, r#"{"code": "NotFound", "message": "ticket not found"}"#);
        assert!(matches!(
            err,
            ApiError::Api { status: 404, ref message } if message == "ticket not found"
        ));

        let raw = parse_api_error(500, "gateway exploded");
        assert!(matches!(
            raw,
            ApiError::Api { status: 500, ref message } if message == "gateway exploded"
        ));
    }
}
