use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};

use crate::datetime::parse_timestamp;
use crate::time_entry::TimeEntry;

/// 日時として解釈できないタイムスタンプを持つエントリーの扱い。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// 集計全体をエラーとして中断する。
    #[default]
    Abort,
    /// そのエントリーだけを集計対象外とする。
    Skip,
}

/// 従業員ごとの集計結果。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmployeeStats {
    total_hours: f64,
    total_entries: usize,
    working_dates: HashSet<NaiveDate>,
}

impl EmployeeStats {
    /// 有効なエントリー1件分を加算する。
    fn record(&mut self, start: DateTime<Utc>, hours: f64) {
        self.total_hours += hours;
        self.total_entries += 1;
        self.working_dates.insert(start.date_naive());
    }

    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// 稼働日数。開始日時の日付(UTC)の重複を除いた数。
    pub fn working_days(&self) -> usize {
        self.working_dates.len()
    }

    /// 稼働日あたりの平均時間。稼働日がない場合は0を返す。
    pub fn average_hours_per_day(&self) -> f64 {
        match self.working_days() {
            0 => 0.0,
            days => self.total_hours / days as f64,
        }
    }
}

/// ランキングの1行。
#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeSummary {
    pub name: String,
    pub stats: EmployeeStats,
}

/// 全従業員の合計値。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Totals {
    pub total_hours: f64,
    pub employee_count: usize,
    pub average_hours_per_employee: f64,
}

/// 合計時間の降順に並べた従業員と全体の合計値。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranking {
    employees: Vec<EmployeeSummary>,
    totals: Totals,
}

impl Ranking {
    /// 合計時間の降順に並べた従業員を返す。
    pub fn employees(&self) -> &[EmployeeSummary] {
        &self.employees
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// 合計時間が最も多い従業員。従業員がいない場合は`None`を返す。
    pub fn top_performer(&self) -> Option<&EmployeeSummary> {
        self.employees.first()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}

/// 集計途中の状態。従業員は最初に現れた順に保持する。
#[derive(Default)]
struct Accumulator {
    positions: HashMap<String, usize>,
    employees: Vec<EmployeeSummary>,
}

impl Accumulator {
    fn record(&mut self, name: &str, start: DateTime<Utc>, hours: f64) {
        let position = match self.positions.get(name).copied() {
            Some(position) => position,
            None => {
                self.positions.insert(name.to_string(), self.employees.len());
                self.employees.push(EmployeeSummary {
                    name: name.to_string(),
                    stats: EmployeeStats::default(),
                });
                self.employees.len() - 1
            }
        };
        self.employees[position].stats.record(start, hours);
    }

    fn into_ranking(self) -> Ranking {
        let mut employees = self.employees;
        // 安定ソートなので同じ合計時間の従業員は最初に現れた順のままになる
        employees.sort_by(|a, b| b.stats.total_hours.total_cmp(&a.stats.total_hours));

        let total_hours = employees.iter().map(|e| e.stats.total_hours).sum::<f64>();
        let employee_count = employees.len();
        let average_hours_per_employee = match employee_count {
            0 => 0.0,
            count => total_hours / count as f64,
        };

        Ranking {
            employees,
            totals: Totals {
                total_hours,
                employee_count,
                average_hours_per_employee,
            },
        }
    }
}

/// 集計対象となるエントリーの従業員名、開始日時、時間数。
struct WorkInterval<'a> {
    employee_name: &'a str,
    start: DateTime<Utc>,
    hours: f64,
}

/// タイムエントリーを従業員ごとに集計し、合計時間の降順に並べる。
///
/// 次の条件を全て満たすエントリーだけを集計対象とし、それ以外は読み飛ばす。
///
/// - 従業員名がある
/// - 開始日時と終了日時がある
/// - 論理削除されていない
/// - 開始日時と終了日時が日時として解釈できる
/// - 終了日時から開始日時を引いた時間が0より大きい
///
/// 日時として解釈できない場合の扱いは`policy`に従う。
///
/// # Arguments
///
/// * `entries` - 集計するタイムエントリー
/// * `policy` - 日時として解釈できないタイムスタンプの扱い
///
/// # Examples
///
/// ```
/// let ranking = aggregate(&entries, TimestampPolicy::Abort).unwrap();
/// ```
pub fn aggregate(entries: &[TimeEntry], policy: TimestampPolicy) -> Result<Ranking> {
    let accumulator = entries
        .iter()
        .try_fold(Accumulator::default(), |mut accumulate, entry| {
            if let Some(interval) = work_interval(entry, policy)? {
                accumulate.record(interval.employee_name, interval.start, interval.hours);
            }
            Ok::<_, anyhow::Error>(accumulate)
        })?;

    Ok(accumulator.into_ranking())
}

/// エントリーが集計対象であれば、その従業員名と時間を返す。
fn work_interval(
    entry: &TimeEntry,
    policy: TimestampPolicy,
) -> Result<Option<WorkInterval<'_>>> {
    let (Some(employee_name), Some(start), Some(end)) = (
        entry.employee_name.as_deref(),
        entry.start_time_utc.as_deref(),
        entry.end_time_utc.as_deref(),
    ) else {
        debug!(
            "Skip entry {}: missing employee name or time",
            entry.display_id()
        );
        return Ok(None);
    };
    if entry.is_deleted() {
        debug!("Skip entry {}: deleted", entry.display_id());
        return Ok(None);
    }

    let parsed = parse_timestamp(start)
        .and_then(|start| parse_timestamp(end).map(|end| (start, end)));
    let (start, end) = match (parsed, policy) {
        (Ok(times), _) => times,
        (Err(err), TimestampPolicy::Skip) => {
            warn!("Skip entry {}: {}", entry.display_id(), err);
            return Ok(None);
        }
        (Err(err), TimestampPolicy::Abort) => {
            return Err(err.context(format!(
                "Failed to parse timestamps of entry {}",
                entry.display_id()
            )))
        }
    };

    let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
    if hours <= 0.0 {
        debug!("Skip entry {}: non-positive duration", entry.display_id());
        return Ok(None);
    }

    debug!(
        "Count entry {} for {}: {:.2}h {}",
        entry.display_id(),
        employee_name,
        hours,
        entry.entry_notes.as_deref().unwrap_or_default()
    );
    Ok(Some(WorkInterval {
        employee_name,
        start,
        hours,
    }))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{aggregate, TimestampPolicy};
    use crate::time_entry::TimeEntry;

    /// テスト用にタイムエントリーを作成する。
    fn entry(id: &str, name: Option<&str>, start: Option<&str>, end: Option<&str>) -> TimeEntry {
        TimeEntry {
            id: Some(id.to_string()),
            employee_name: name.map(str::to_string),
            start_time_utc: start.map(str::to_string),
            end_time_utc: end.map(str::to_string),
            entry_notes: None,
            deleted_on: None,
        }
    }

    fn work(id: &str, name: &str, start: &str, end: &str) -> TimeEntry {
        entry(id, Some(name), Some(start), Some(end))
    }

    fn deleted(id: &str, name: &str, start: &str, end: &str) -> TimeEntry {
        TimeEntry {
            deleted_on: Some("2024-01-05T00:00:00".to_string()),
            ..work(id, name, start, end)
        }
    }

    /// 有効なエントリーと無効なエントリーが混在したデータ。
    fn mixed_entries() -> Vec<TimeEntry> {
        vec![
            work("1", "Alice", "2024-01-01T09:00:00", "2024-01-01T17:00:00"),
            work("2", "Bob", "2024-01-01T08:00:00", "2024-01-01T18:30:00"),
            work("3", "Alice", "2024-01-01T18:00:00", "2024-01-01T19:15:00"),
            deleted("4", "Bob", "2024-01-02T08:00:00", "2024-01-02T18:00:00"),
            entry("5", None, Some("2024-01-02T08:00:00"), Some("2024-01-02T09:00:00")),
            work("6", "Dave", "2024-01-03T12:00:00", "2024-01-03T11:00:00"),
            work("7", "Carol", "2024-01-03T22:00:00Z", "2024-01-04T02:00:00Z"),
            entry("8", Some("Carol"), Some("2024-01-04T09:00:00"), None),
            work("9", "alice", "2024-01-04T09:00:00", "2024-01-04T10:00:00"),
        ]
    }

    /// 仕様のシナリオ通りに集計されることを確認する。
    #[test]
    fn test_aggregate_scenario() {
        let mut carol = work("4", "Carol", "2024-01-01T09:00", "2024-01-01T12:00");
        carol.deleted_on = Some("2024-01-03T00:00".to_string());
        let entries = vec![
            work("1", "Alice", "2024-01-01T09:00", "2024-01-01T17:00"),
            work("2", "Alice", "2024-01-02T09:00", "2024-01-02T13:00"),
            work("3", "Bob", "2024-01-01T09:00", "2024-01-01T09:00"),
            carol,
        ];

        let ranking = aggregate(&entries, TimestampPolicy::Abort).unwrap();

        assert_eq!(ranking.employees().len(), 1);
        let alice = &ranking.employees()[0];
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.stats.total_hours(), 12.0);
        assert_eq!(alice.stats.total_entries(), 2);
        assert_eq!(alice.stats.working_days(), 2);
        assert_eq!(alice.stats.average_hours_per_day(), 6.0);
        assert_eq!(ranking.top_performer().map(|e| e.name.as_str()), Some("Alice"));
    }

    /// 同じ日のエントリーは稼働日数として1日と数えることを確認する。
    #[test]
    fn test_aggregate_same_day_entries() {
        let entries = vec![
            work("1", "Alice", "2024-01-01T09:00:00", "2024-01-01T12:00:00"),
            work("2", "Alice", "2024-01-01T13:00:00", "2024-01-01T18:00:00"),
        ];

        let ranking = aggregate(&entries, TimestampPolicy::Abort).unwrap();

        let alice = &ranking.employees()[0].stats;
        assert_eq!(alice.working_days(), 1);
        assert_eq!(alice.total_entries(), 2);
        assert_eq!(alice.total_hours(), 8.0);
        assert_eq!(alice.average_hours_per_day(), 8.0);
    }

    /// 日付をまたぐエントリーは開始日時の日付で数えることを確認する。
    #[test]
    fn test_aggregate_working_day_from_start() {
        let entries = vec![
            work("1", "Carol", "2024-01-03T22:00:00Z", "2024-01-04T02:00:00Z"),
            work("2", "Carol", "2024-01-04T01:00:00+09:00", "2024-01-04T03:00:00+09:00"),
        ];

        let ranking = aggregate(&entries, TimestampPolicy::Abort).unwrap();

        // 2件目はUTCで2024-01-03の16:00開始
        assert_eq!(ranking.employees()[0].stats.working_days(), 1);
        assert_eq!(ranking.employees()[0].stats.total_hours(), 6.0);
    }

    /// 入力が空の場合は空のランキングと0の合計値になることを確認する。
    #[test]
    fn test_aggregate_empty() {
        let ranking = aggregate(&[], TimestampPolicy::Abort).unwrap();

        assert!(ranking.is_empty());
        assert!(ranking.top_performer().is_none());
        assert_eq!(ranking.totals().total_hours, 0.0);
        assert_eq!(ranking.totals().employee_count, 0);
        assert_eq!(ranking.totals().average_hours_per_employee, 0.0);
    }

    /// 集計対象外のエントリーは読み飛ばされることを確認する。
    #[rstest]
    #[case::no_name(entry("1", None, Some("2024-01-01T09:00"), Some("2024-01-01T10:00")))]
    #[case::no_start(entry("1", Some("Alice"), None, Some("2024-01-01T10:00")))]
    #[case::no_end(entry("1", Some("Alice"), Some("2024-01-01T09:00"), None))]
    #[case::deleted(deleted("1", "Alice", "2024-01-01T09:00", "2024-01-01T10:00"))]
    #[case::zero_duration(work("1", "Alice", "2024-01-01T09:00", "2024-01-01T09:00"))]
    #[case::negative_duration(work("1", "Alice", "2024-01-01T10:00", "2024-01-01T09:00"))]
    #[case::deleted_with_invalid_time(deleted("1", "Alice", "not a time", "2024-01-01T10:00"))]
    #[case::no_name_with_invalid_time(entry("1", None, Some("not a time"), Some("also not")))]
    fn test_aggregate_skips_invalid_entry(#[case] input: TimeEntry) {
        let ranking = aggregate(&[input], TimestampPolicy::Abort).unwrap();

        assert!(ranking.is_empty());
    }

    /// Abortの場合は日時として解釈できないタイムスタンプでエラーになることを確認する。
    #[rstest]
    #[case::invalid_start(work("42", "Alice", "01/02/2024 9am", "2024-01-01T10:00"))]
    #[case::invalid_end(work("42", "Alice", "2024-01-01T09:00", "soon"))]
    fn test_aggregate_abort_on_invalid_timestamp(#[case] input: TimeEntry) {
        let entries = vec![
            work("1", "Bob", "2024-01-01T09:00", "2024-01-01T10:00"),
            input,
        ];

        let err = aggregate(&entries, TimestampPolicy::Abort).unwrap_err();

        assert!(format!("{:#}", err).contains("entry 42"));
    }

    /// Skipの場合は日時として解釈できないエントリーだけが読み飛ばされることを確認する。
    #[test]
    fn test_aggregate_skip_invalid_timestamp() {
        let entries = vec![
            work("1", "Bob", "2024-01-01T09:00", "2024-01-01T10:00"),
            work("2", "Alice", "yesterday", "2024-01-01T10:00"),
            work("3", "Alice", "2024-01-01T09:00", "2024-01-01T11:00"),
        ];

        let ranking = aggregate(&entries, TimestampPolicy::Skip).unwrap();

        let names: Vec<_> = ranking.employees().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(ranking.employees()[0].stats.total_entries(), 1);
    }

    /// 合計時間が同じ従業員は最初に現れた順に並ぶことを確認する。
    #[test]
    fn test_aggregate_ties_keep_insertion_order() {
        let entries = vec![
            work("1", "Zoe", "2024-01-01T09:00", "2024-01-01T11:00"),
            work("2", "Adam", "2024-01-01T09:00", "2024-01-01T12:00"),
            work("3", "Mia", "2024-01-01T09:00", "2024-01-01T11:00"),
            work("4", "Eve", "2024-01-01T09:00", "2024-01-01T11:00"),
        ];

        let ranking = aggregate(&entries, TimestampPolicy::Abort).unwrap();

        let names: Vec<_> = ranking.employees().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Adam", "Zoe", "Mia", "Eve"]);
    }

    /// 従業員名は大文字小文字を区別して集計することを確認する。
    #[test]
    fn test_aggregate_case_sensitive_names() {
        let ranking = aggregate(&mixed_entries(), TimestampPolicy::Abort).unwrap();

        let names: Vec<_> = ranking.employees().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol", "alice"]);
    }

    /// 集計結果が満たすべき性質を確認する。
    #[test]
    fn test_aggregate_properties() {
        let ranking = aggregate(&mixed_entries(), TimestampPolicy::Abort).unwrap();

        for employee in ranking.employees() {
            assert!(employee.stats.total_hours() > 0.0);
            assert!(employee.stats.total_entries() >= 1);
            assert!(employee.stats.working_days() <= employee.stats.total_entries());
        }
        assert!(ranking
            .employees()
            .windows(2)
            .all(|pair| pair[0].stats.total_hours() >= pair[1].stats.total_hours()));
        assert!(ranking.employees().iter().all(|e| e.name != "Dave"));

        // 有効なエントリー: 8 + 10.5 + 1.25 + 4 + 1
        let expected_hours = 24.75;
        assert!((ranking.totals().total_hours - expected_hours).abs() < 1e-9);
        assert_eq!(ranking.totals().employee_count, 4);
        assert!((ranking.totals().average_hours_per_employee - expected_hours / 4.0).abs() < 1e-9);
    }

    /// 論理削除されたエントリーは集計に含まれないことを確認する。
    #[test]
    fn test_aggregate_excludes_deleted_hours() {
        let ranking = aggregate(&mixed_entries(), TimestampPolicy::Abort).unwrap();

        let bob = ranking.employees().iter().find(|e| e.name == "Bob").unwrap();
        assert_eq!(bob.stats.total_hours(), 10.5);
        assert_eq!(bob.stats.total_entries(), 1);
    }
}
