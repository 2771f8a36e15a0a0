//! Hosted table API client.
//!
//! Speaks the PostgREST dialect used by Supabase: one URL per table under
//! `/rest/v1`, filters and ordering in the query string, and the project
//! key sent both as `apikey` and as a bearer token.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Bill, Doctor, NewBill, NewDoctor, RecordId};

const DOCTORS_TABLE: &str = "doctors";
const BILLS_TABLE: &str = "bills";

/// Client for a hosted table API.
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RestStore {
    /// Create a client for the project at `base_url`.
    pub fn new(base_url: &str, api_key: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// `{base}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn select<T: DeserializeOwned>(&self, table: &str, columns: &str, order: &str) -> StoreResult<Vec<T>> {
        let request = self
            .request(Method::GET, table)
            .query(&[("select", columns), ("order", order)]);
        decode(send(request)?)
    }

    fn insert<B: Serialize, T: DeserializeOwned>(&self, table: &str, body: &B) -> StoreResult<T> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body);

        let mut rows: Vec<T> = decode(send(request)?)?;
        if rows.is_empty() {
            return Err(StoreError::Decode(format!("insert into {} returned no row", table)));
        }
        Ok(rows.swap_remove(0))
    }

    fn delete(&self, table: &str, id: &RecordId) -> StoreResult<bool> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&[("id", filter.as_str())]);

        let rows: Vec<serde_json::Value> = decode(send(request)?)?;
        Ok(!rows.is_empty())
    }
}

fn send(request: RequestBuilder) -> StoreResult<Response> {
    let response = request
        .send()
        .map_err(|e| StoreError::Http(e.without_url().to_string()))?;

    let status = response.status();
    debug!(status = status.as_u16(), "Store responded");
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let text = response
        .text()
        .map_err(|e| StoreError::Http(e.without_url().to_string()))?;
    decode_body(&text)
}

fn decode_body<T: DeserializeOwned>(text: &str) -> StoreResult<T> {
    serde_json::from_str(text).map_err(|e| StoreError::Decode(e.to_string()))
}

impl RecordStore for RestStore {
    fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        self.select(DOCTORS_TABLE, "id,name", "name.asc")
    }

    fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor> {
        self.insert(DOCTORS_TABLE, doctor)
    }

    fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool> {
        self.delete(DOCTORS_TABLE, id)
    }

    fn list_bills(&self) -> StoreResult<Vec<Bill>> {
        self.select(BILLS_TABLE, "*", "bill_date.desc")
    }

    fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill> {
        self.insert(BILLS_TABLE, bill)
    }

    fn delete_bill(&self, id: &RecordId) -> StoreResult<bool> {
        self.delete(BILLS_TABLE, id)
    }
}
