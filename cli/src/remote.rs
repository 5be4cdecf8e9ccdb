use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use sevenday_core::models::WeekRecord;
use sevenday_core::service::WeekBackend;
use sevenday_core::week::WeekKey;

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    weeks: &'a [WeekKey],
}

#[derive(Debug, Deserialize)]
struct WeekRow {
    week_start: WeekKey,
    record: WeekRecord,
}

/// HTTP client for a sevenday journal server, usable wherever a
/// [`WeekBackend`] is expected. The trait is synchronous, so the client
/// owns a small single-thread runtime and blocks on each call.
pub struct RemoteClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("sevenday-cli/{} (weekly journal)", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build client runtime")?;

        Ok(Self {
            client,
            rt,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub async fn fetch_async(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>> {
        let resp = self
            .get(&format!("/api/users/{user_id}/weeks/{week}"))
            .send()
            .await
            .context("Failed to reach journal server")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .context("Journal server rejected the fetch")?;
        let record = resp
            .json::<WeekRecord>()
            .await
            .context("Failed to parse week record response")?;
        Ok(Some(record))
    }

    pub async fn upsert_async(
        &self,
        user_id: &str,
        week: WeekKey,
        record: &WeekRecord,
    ) -> Result<()> {
        let resp = self
            .authorize(
                self.client
                    .put(format!("{}/api/users/{user_id}/weeks/{week}", self.base_url)),
            )
            .json(record)
            .send()
            .await
            .context("Failed to reach journal server")?;

        resp.error_for_status()
            .context("Journal server rejected the save")?;
        Ok(())
    }

    pub async fn list_async(&self, user_id: &str) -> Result<Vec<WeekKey>> {
        let resp = self
            .get(&format!("/api/users/{user_id}/weeks"))
            .send()
            .await
            .context("Failed to reach journal server")?
            .error_for_status()
            .context("Journal server rejected the listing")?;

        resp.json::<Vec<WeekKey>>()
            .await
            .context("Failed to parse week listing response")
    }

    pub async fn fetch_many_async(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>> {
        let resp = self
            .authorize(
                self.client
                    .post(format!("{}/api/users/{user_id}/weeks/batch", self.base_url)),
            )
            .json(&BatchRequest { weeks })
            .send()
            .await
            .context("Failed to reach journal server")?
            .error_for_status()
            .context("Journal server rejected the batch fetch")?;

        let rows = resp
            .json::<Vec<WeekRow>>()
            .await
            .context("Failed to parse batch response")?;
        Ok(rows
            .into_iter()
            .map(|row| (row.week_start, row.record))
            .collect())
    }
}

impl WeekBackend for RemoteClient {
    fn fetch(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>> {
        self.rt.block_on(self.fetch_async(user_id, week))
    }

    fn upsert(&self, user_id: &str, week: WeekKey, record: &WeekRecord) -> Result<()> {
        self.rt.block_on(self.upsert_async(user_id, week, record))
    }

    fn list_week_keys(&self, user_id: &str) -> Result<Vec<WeekKey>> {
        self.rt.block_on(self.list_async(user_id))
    }

    fn fetch_many(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>> {
        self.rt.block_on(self.fetch_many_async(user_id, weeks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Integration tests (need `sevenday serve --no-auth` on :8080) ---

    #[test]
    #[ignore = "requires a running sevenday server"]
    fn test_fetch_missing_week_is_none() {
        let client = RemoteClient::new("http://127.0.0.1:8080", None).unwrap();
        let week = WeekKey::parse("1999-01-03").unwrap();
        assert!(client.fetch("nobody", week).unwrap().is_none());
    }

    #[test]
    #[ignore = "requires a running sevenday server"]
    fn test_upsert_then_fetch_roundtrip() {
        let client = RemoteClient::new("http://127.0.0.1:8080", None).unwrap();
        let week = WeekKey::parse("2024-06-02").unwrap();

        let mut record = WeekRecord::default();
        record.grateful = "integration test".to_string();
        client.upsert("it-user", week, &record).unwrap();

        let loaded = client.fetch("it-user", week).unwrap().unwrap();
        assert_eq!(loaded.grateful, "integration test");
        assert!(client.list_week_keys("it-user").unwrap().contains(&week));
    }
}
