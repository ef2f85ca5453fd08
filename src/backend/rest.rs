/**
 * PostgREST table client
 * Talks to the hosted project's `/rest/v1` endpoint
 */
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};

use super::{BackendError, BackendResult, Row, Select, Table, TableApi};
use crate::config::BackendConfig;

pub struct RestTables {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestTables {
    pub fn new(client: Client, base_url: &str, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(|source| BackendError::Http {
            context: table.name().to_string(),
            source,
        })?;
        check_status(response).await
    }
}

/// Query-string pairs for a select.
pub(crate) fn select_params(query: &Select) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        query.columns.unwrap_or("*").replace(' ', ""),
    )];
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{value}")));
    }
    if let Some(order) = query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-24/25` or `*/0`.
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

pub(crate) async fn check_status(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        message: upstream_message(&body).unwrap_or_else(|| status.to_string()),
    })
}

/// PostgREST and GoTrue report errors under different keys.
pub(crate) fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl TableApi for RestTables {
    async fn select(
        &self,
        table: Table,
        query: &Select,
        token: Option<&str>,
    ) -> BackendResult<Vec<Row>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&select_params(query));
        let response = self.send(table, self.authorize(request, token)).await?;
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn insert(&self, table: Table, row: Row, token: Option<&str>) -> BackendResult<Row> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(table, self.authorize(request, token)).await?;
        let mut rows = response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if rows.is_empty() {
            return Err(BackendError::Decode(format!(
                "insert into {table} returned no row"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        token: Option<&str>,
    ) -> BackendResult<Vec<Row>> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(table, self.authorize(request, token)).await?;
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn delete(&self, table: Table, id: &str, token: Option<&str>) -> BackendResult<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        self.send(table, self.authorize(request, token)).await?;
        Ok(())
    }

    async fn count(&self, table: Table, token: Option<&str>) -> BackendResult<u64> {
        let request = self
            .client
            .head(self.table_url(table))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let response = self.send(table, self.authorize(request, token)).await?;
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Decode(format!("count of {table} had no Content-Range")))
    }

    async fn ping(&self) -> BackendResult<Duration> {
        let start = Instant::now();
        let request = self
            .client
            .get(format!("{}/rest/v1/", self.base_url))
            .header("apikey", &self.anon_key);
        let response = request.send().await.map_err(|source| BackendError::Http {
            context: "rest root".to_string(),
            source,
        })?;
        check_status(response).await?;
        Ok(start.elapsed())
    }
}
