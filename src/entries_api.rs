use std::{env, fmt};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::{header::ACCEPT, Client};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;

use crate::time_entry::TimeEntry;

/// エンドポイントのURLを設定する環境変数名。
pub const ENDPOINT_ENV: &str = "TIME_ENTRIES_URL";

/// タイムエントリーを取得するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimeEntryRepository {
    /// 全てのタイムエントリーを取得する。
    async fn read_time_entries(&self) -> Result<Vec<TimeEntry>>;
}

/// エンドポイントのレスポンスに含まれる1件分のフィールド名。
///
/// フィールド名の大文字小文字は区別しない。
enum Field {
    Id,
    EmployeeName,
    StartTimeUtc,
    EndTimeUtc,
    EntryNotes,
    DeletedOn,
    Ignore,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        let field = match name.to_ascii_lowercase().as_str() {
            "id" => Field::Id,
            "employeename" => Field::EmployeeName,
            "startimeutc" | "starttimeutc" => Field::StartTimeUtc,
            "endtimeutc" => Field::EndTimeUtc,
            "entrynotes" => Field::EntryNotes,
            "deletedon" => Field::DeletedOn,
            _ => Field::Ignore,
        };
        Ok(field)
    }
}

/// 文字列以外で返されることがあるフィールドの値。
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    /// 文字列に変換する。空文字列は`None`とする。
    fn into_text(self) -> Option<String> {
        let text = match self {
            Scalar::Text(text) => text,
            Scalar::Integer(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Flag(value) => value.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

/// エンドポイントのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Default)]
struct ApiTimeEntry {
    id: Option<String>,
    employee_name: Option<String>,
    star_time_utc: Option<String>,
    end_time_utc: Option<String>,
    entry_notes: Option<String>,
    deleted_on: Option<String>,
}

impl<'de> Deserialize<'de> for ApiTimeEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ApiTimeEntryVisitor;

        impl<'de> Visitor<'de> for ApiTimeEntryVisitor {
            type Value = ApiTimeEntry;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a time entry object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<ApiTimeEntry, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entry = ApiTimeEntry::default();
                while let Some(field) = map.next_key::<Field>()? {
                    let slot = match field {
                        Field::Id => &mut entry.id,
                        Field::EmployeeName => &mut entry.employee_name,
                        Field::StartTimeUtc => &mut entry.star_time_utc,
                        Field::EndTimeUtc => &mut entry.end_time_utc,
                        Field::EntryNotes => &mut entry.entry_notes,
                        Field::DeletedOn => &mut entry.deleted_on,
                        Field::Ignore => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    *slot = map.next_value::<Option<Scalar>>()?.and_then(Scalar::into_text);
                }
                Ok(entry)
            }
        }

        deserializer.deserialize_map(ApiTimeEntryVisitor)
    }
}

impl From<ApiTimeEntry> for TimeEntry {
    fn from(entry: ApiTimeEntry) -> Self {
        TimeEntry {
            id: entry.id,
            employee_name: entry.employee_name,
            start_time_utc: entry.star_time_utc,
            end_time_utc: entry.end_time_utc,
            entry_notes: entry.entry_notes,
            deleted_on: entry.deleted_on,
        }
    }
}

/// タイムエントリーのエンドポイントと通信するためのクライアント。
///
/// エンドポイントのURLはアクセスキーを含むため、ログやエラーメッセージには出力しない。
///
/// # Examples
///
/// ```
/// let client = TimeEntriesClient::new(None).unwrap();
/// let time_entries = client.read_time_entries().await.unwrap();
/// ```
pub struct TimeEntriesClient {
    client: Client,
    api_url: String,
}

impl TimeEntriesClient {
    /// 新しい`TimeEntriesClient`を返す。
    ///
    /// `api_url`が指定されていない場合は環境変数`TIME_ENTRIES_URL`を利用し、
    /// 環境変数も設定されていない場合はエラーを返す。
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let api_url = match api_url {
            Some(api_url) => api_url,
            None => env::var(ENDPOINT_ENV)
                .with_context(|| format!("{} must be set when --url is omitted", ENDPOINT_ENV))?,
        };

        Ok(Self::with_url(api_url))
    }

    /// 指定したURLを利用する`TimeEntriesClient`を返す。
    pub fn with_url(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl TimeEntryRepository for TimeEntriesClient {
    async fn read_time_entries(&self) -> Result<Vec<TimeEntry>> {
        let api_time_entries = self
            .client
            .get(&self.api_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to the time entries endpoint")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("Request returned an error status")?
            .json::<Vec<ApiTimeEntry>>()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to deserialize response")?;
        info!("length of time entries: {}", api_time_entries.len());

        Ok(api_time_entries.into_iter().map(TimeEntry::from).collect())
    }
}
