use chrono::Local;

use crate::aggregate::{EmployeeSummary, Ranking};
use crate::datetime;

/// 合計時間がこの値未満の従業員を強調表示する既定の閾値。
pub const DEFAULT_LOW_HOURS_THRESHOLD: f64 = 100.0;

/// 上位として強調表示する順位。
const TOP_RANKS: usize = 3;

/// ランキングを検索、並べ替えができる単体のHTMLとして出力する。
///
/// # Examples
///
/// ```
/// let html = HtmlReport::new(&ranking).low_hours_threshold(80.0).render();
/// ```
pub struct HtmlReport<'a> {
    ranking: &'a Ranking,
    low_hours_threshold: f64,
}

impl<'a> HtmlReport<'a> {
    /// 新しい`HtmlReport`を返す。
    pub fn new(ranking: &'a Ranking) -> Self {
        Self {
            ranking,
            low_hours_threshold: DEFAULT_LOW_HOURS_THRESHOLD,
        }
    }

    /// 強調表示する合計時間の閾値を設定する。
    pub fn low_hours_threshold(mut self, threshold: f64) -> Self {
        self.low_hours_threshold = threshold;
        self
    }

    /// HTMLを生成する。
    pub fn render(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str("<title>Employee Time Tracking Report</title>\n");
        html.push_str("<style>");
        html.push_str(STYLES);
        html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");

        html.push_str(&self.header());
        html.push_str(&self.stat_cards());
        html.push_str(&self.table());

        html.push_str("<div class=\"footer\">Employee Time Tracking System | ");
        html.push_str("Data processed and secured</div>\n");
        html.push_str("</div>\n<script>");
        html.push_str(SCRIPT);
        html.push_str("</script>\n</body>\n</html>\n");
        html
    }

    fn header(&self) -> String {
        let generated_at = datetime::now()
            .with_timezone(&Local)
            .format("%B %d, %Y at %H:%M");
        format!(
            "<div class=\"header\">\n<h1>Employee Time Tracking Report</h1>\n\
             <div class=\"subtitle\">Generated on {}</div>\n</div>\n",
            generated_at
        )
    }

    fn stat_cards(&self) -> String {
        let totals = self.ranking.totals();
        let mut cards = String::from("<div class=\"stats-grid\">\n");
        cards.push_str(&stat_card(
            &totals.employee_count.to_string(),
            "Total Employees",
        ));
        cards.push_str(&stat_card(&rounded(totals.total_hours, 1), "Total Hours"));
        cards.push_str(&stat_card(
            &rounded(totals.average_hours_per_employee, 1),
            "Average Hours",
        ));
        if let Some(top) = self.ranking.top_performer() {
            cards.push_str(&format!(
                "<div class=\"stat-card\"><div class=\"stat-number\">{}</div>\
                 <div class=\"stat-label\">Top Performer</div>\
                 <div class=\"stat-detail\">{}</div></div>\n",
                rounded(top.stats.total_hours(), 1),
                escape_html(&top.name)
            ));
        }
        cards.push_str("</div>\n");
        cards
    }

    fn table(&self) -> String {
        let mut table = String::from("<div class=\"table-container\">\n");
        table.push_str("<div class=\"search-container\">\n");
        table.push_str(
            "<input type=\"text\" class=\"search-input\" id=\"searchInput\" \
             placeholder=\"Search employees...\">\n",
        );
        table.push_str("<span class=\"search-icon\">&#128269;</span>\n</div>\n");
        table.push_str("<div class=\"table-wrapper\">\n<table id=\"employeeTable\">\n");
        table.push_str("<thead>\n<tr>\n");
        for (index, title) in COLUMNS.iter().enumerate() {
            table.push_str(&format!(
                "<th onclick=\"sortTable({})\">{}</th>\n",
                index, title
            ));
        }
        table.push_str("</tr>\n</thead>\n<tbody>\n");

        if self.ranking.is_empty() {
            table.push_str(&format!(
                "<tr class=\"no-results\"><td colspan=\"{}\">No time entries to report</td></tr>\n",
                COLUMNS.len()
            ));
        }
        for (index, employee) in self.ranking.employees().iter().enumerate() {
            table.push_str(&self.row(index + 1, employee));
        }

        table.push_str("</tbody>\n</table>\n</div>\n</div>\n");
        table
    }

    fn row(&self, rank: usize, employee: &EmployeeSummary) -> String {
        let stats = &employee.stats;
        let row_class = if stats.total_hours() < self.low_hours_threshold {
            "low-hours"
        } else if rank <= TOP_RANKS {
            "high-performer"
        } else {
            ""
        };
        let badge_class = if rank <= TOP_RANKS {
            "rank-badge top3"
        } else {
            "rank-badge"
        };

        format!(
            "<tr class=\"{}\">\n\
             <td><span class=\"{}\">{}</span></td>\n\
             <td class=\"employee-name\">{}</td>\n\
             <td class=\"hours-cell\">{}</td>\n\
             <td>{}</td>\n\
             <td>{}</td>\n\
             <td>{}</td>\n\
             </tr>\n",
            row_class,
            badge_class,
            rank,
            escape_html(&employee.name),
            rounded(stats.total_hours(), 2),
            stats.total_entries(),
            stats.working_days(),
            rounded(stats.average_hours_per_day(), 2)
        )
    }
}

const COLUMNS: [&str; 6] = [
    "Rank",
    "Employee Name",
    "Total Hours",
    "Time Entries",
    "Working Days",
    "Avg Hours/Day",
];

fn stat_card(number: &str, label: &str) -> String {
    format!(
        "<div class=\"stat-card\"><div class=\"stat-number\">{}</div>\
         <div class=\"stat-label\">{}</div></div>\n",
        number, label
    )
}

/// 小数点以下`digits`桁に丸め、末尾の0を付けずに表示する。
///
/// ちょうど中間の値は偶数側に丸める。
fn rounded(value: f64, digits: i32) -> String {
    let scale = 10f64.powi(digits);
    let value = (value * scale).round_ties_even() / scale;
    // -0を0として表示する
    (value + 0.0).to_string()
}

/// HTMLの特殊文字をエスケープする。
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const STYLES: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    min-height: 100vh;
    padding: 20px;
}
.container {
    max-width: 1200px;
    margin: 0 auto;
    background: white;
    border-radius: 15px;
    box-shadow: 0 20px 40px rgba(0,0,0,0.1);
    overflow: hidden;
}
.header {
    background: linear-gradient(135deg, #2c3e50 0%, #34495e 100%);
    color: white;
    padding: 30px;
    text-align: center;
}
.header h1 { font-size: 2.5em; margin-bottom: 10px; font-weight: 300; }
.header .subtitle { opacity: 0.9; font-size: 1.1em; }
.stats-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
    gap: 20px;
    padding: 30px;
    background: #f8f9fa;
}
.stat-card {
    background: white;
    padding: 25px;
    border-radius: 10px;
    text-align: center;
    box-shadow: 0 5px 15px rgba(0,0,0,0.08);
    transition: transform 0.3s ease;
}
.stat-card:hover { transform: translateY(-5px); }
.stat-number { font-size: 2.5em; font-weight: bold; color: #2c3e50; margin-bottom: 10px; }
.stat-label { color: #7f8c8d; font-size: 0.9em; text-transform: uppercase; letter-spacing: 1px; }
.stat-detail { color: #2c3e50; margin-top: 6px; font-weight: 600; }
.table-container { padding: 0 30px 30px 30px; }
.search-container { margin-bottom: 20px; position: relative; }
.search-input {
    width: 100%;
    padding: 15px 50px 15px 20px;
    border: 2px solid #e0e0e0;
    border-radius: 25px;
    font-size: 16px;
    outline: none;
    transition: border-color 0.3s ease;
}
.search-input:focus { border-color: #667eea; }
.search-icon { position: absolute; right: 20px; top: 50%; transform: translateY(-50%); color: #999; }
.table-wrapper { overflow-x: auto; border-radius: 10px; box-shadow: 0 5px 15px rgba(0,0,0,0.08); }
table { width: 100%; border-collapse: collapse; background: white; min-width: 600px; }
th {
    background: linear-gradient(135deg, #2c3e50 0%, #34495e 100%);
    color: white;
    padding: 20px;
    text-align: left;
    font-weight: 600;
    text-transform: uppercase;
    letter-spacing: 1px;
    font-size: 0.9em;
    cursor: pointer;
}
th:hover { background: linear-gradient(135deg, #34495e 0%, #2c3e50 100%); }
td { padding: 18px 20px; border-bottom: 1px solid #eee; }
tr:hover { background-color: #f8f9fa; }
.employee-name { font-weight: 600; color: #2c3e50; }
.hours-cell { font-weight: 600; color: #27ae60; }
.low-hours { background-color: #fff5f5 !important; border-left: 4px solid #e74c3c; }
.low-hours .hours-cell { color: #e74c3c; }
.high-performer { background-color: #f0fff4 !important; border-left: 4px solid #27ae60; }
.rank-badge {
    display: inline-block;
    width: 30px;
    height: 30px;
    border-radius: 50%;
    background: #667eea;
    color: white;
    text-align: center;
    line-height: 30px;
    font-weight: bold;
    font-size: 0.9em;
}
.rank-badge.top3 { background: linear-gradient(135deg, #ffd700 0%, #ffed4e 100%); color: #333; }
.footer { background: #f8f9fa; padding: 20px 30px; text-align: center; color: #7f8c8d; border-top: 1px solid #eee; }
.no-results td { text-align: center; padding: 40px; color: #7f8c8d; font-style: italic; }
@media (max-width: 768px) {
    .header h1 { font-size: 2em; }
    .stats-grid { grid-template-columns: 1fr; padding: 20px; }
    .table-container { padding: 0 20px 20px 20px; }
    td, th { padding: 12px 15px; }
}
"#;

// 列0は昇順の数値、列1は文字列、列2以降は降順の数値として並べ替える
const SCRIPT: &str = r#"
document.getElementById('searchInput').addEventListener('keyup', function () {
    const searchTerm = this.value.toLowerCase();
    const rows = document.querySelectorAll('#employeeTable tbody tr');
    rows.forEach(function (row) {
        const cells = row.getElementsByTagName('td');
        if (cells.length < 2) {
            return;
        }
        const name = cells[1].textContent.toLowerCase();
        row.style.display = name.includes(searchTerm) ? '' : 'none';
    });
});

function sortTable(columnIndex) {
    const tbody = document.querySelector('#employeeTable tbody');
    const rows = Array.from(tbody.getElementsByTagName('tr'))
        .filter(function (row) { return row.getElementsByTagName('td').length > 1; });

    rows.sort(function (a, b) {
        const aText = a.getElementsByTagName('td')[columnIndex].textContent;
        const bText = b.getElementsByTagName('td')[columnIndex].textContent;
        if (columnIndex === 1) {
            return aText.localeCompare(bText);
        }
        const aValue = parseFloat(aText) || 0;
        const bValue = parseFloat(bText) || 0;
        return columnIndex === 0 ? aValue - bValue : bValue - aValue;
    });

    rows.forEach(function (row) { tbody.appendChild(row); });
    rows.forEach(function (row, index) {
        const badge = row.querySelector('.rank-badge');
        if (badge) {
            badge.textContent = index + 1;
            badge.className = index < 3 ? 'rank-badge top3' : 'rank-badge';
        }
    });
}

window.addEventListener('load', function () {
    document.body.style.opacity = '0';
    document.body.style.transition = 'opacity 0.5s ease-in-out';
    setTimeout(function () { document.body.style.opacity = '1'; }, 100);
});
"#;
