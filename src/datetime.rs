use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// オフセット付きのタイムスタンプとして受け付けるフォーマット。
///
/// `%#z`は`Z`、コロンなしのオフセット、時のみのオフセットも受け付ける。
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// オフセットを持たないタイムスタンプとして受け付けるフォーマット。
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// ISO-8601形式のタイムスタンプをUTCの日時に変換する。
///
/// オフセット付き(RFC 3339、`Z`やコロンなしのオフセットを含む)の場合はUTCに変換し、
/// オフセットがない場合はUTCとして解釈する。
/// 日付と時刻の区切りは`T`と空白のどちらも受け付ける。
///
/// # Arguments
///
/// * `value` - 変換するタイムスタンプ
///
/// # Examples
///
/// ```
/// let start = parse_timestamp("2024-01-01T09:00:00Z").unwrap();
/// ```
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.to_utc());
    }
    if let Some(datetime) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Ok(datetime.to_utc());
    }

    match NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        Some(naive) => Ok(naive.and_utc()),
        None => bail!("Invalid timestamp: {:?}", value),
    }
}
