//! Terminal output utilities

use console::style;
use promoter_core::{CapturedRequests, PromotionRequest};
use promoter_engine::Report;
use tabled::{settings::Style, Table, Tabled};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "#")]
    index: usize,
    op: String,
    tag: String,
    digest: String,
    #[tabled(rename = "previous")]
    digest_old: String,
}

impl RequestRow {
    fn new(index: usize, request: &PromotionRequest) -> Self {
        Self {
            index,
            op: request.tag_op.to_string(),
            tag: request.dest_ref(),
            digest: request.digest.to_string(),
            digest_old: request
                .digest_old
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct CapturedRow {
    op: String,
    tag: String,
    digest: String,
    count: usize,
}

/// Print an ordered request list
pub fn requests_table(requests: &[PromotionRequest]) {
    let rows: Vec<RequestRow> = requests
        .iter()
        .enumerate()
        .map(|(i, r)| RequestRow::new(i + 1, r))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
}

/// Print the requests recorded by a dry run
pub fn captured_table(captured: &CapturedRequests) {
    let rows: Vec<CapturedRow> = captured
        .iter()
        .map(|(request, count)| CapturedRow {
            op: request.tag_op.to_string(),
            tag: request.dest_ref(),
            digest: request.digest.to_string(),
            count: *count,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
}

/// Print the verdict of a run; failures themselves are logged by the engine
pub fn report(report: &Report) {
    if report.is_success() {
        success(&format!("{} requests completed", report.total()));
    } else {
        error(&format!("Promotion {}", report.verdict()));
    }
}
