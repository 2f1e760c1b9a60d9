/// エンドポイントから取得した1件のタイムエントリー。
///
/// 値が存在しない、または空文字列のフィールドは`None`として扱う。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeEntry {
    pub id: Option<String>,
    pub employee_name: Option<String>,
    pub start_time_utc: Option<String>,
    pub end_time_utc: Option<String>,
    pub entry_notes: Option<String>,
    pub deleted_on: Option<String>,
}

impl TimeEntry {
    /// 論理削除されたエントリーかどうかを返す。
    pub fn is_deleted(&self) -> bool {
        self.deleted_on.is_some()
    }

    /// ログ出力用のid。idがない場合は`-`を返す。
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}
