//! PDF export of service reports.
//!
//! Documents are assembled directly with lopdf using the standard Type1
//! Helvetica fonts, so no font files are embedded. Text is written in
//! WinAnsi encoding; characters outside Latin-1 are replaced by `?`.

use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use resume_shared::constants::CURRENCY;
use resume_store::{DateRange, Report};

use crate::error::ServerError;

/// A4 portrait, in points.
const PORTRAIT: (i64, i64) = (595, 842);
/// A4 landscape, in points.
const LANDSCAPE: (i64, i64) = (842, 595);
const MARGIN: i64 = 40;
const ROW_HEIGHT: i64 = 16;
const SUMMARY_ROWS_PER_PAGE: usize = 28;
const NOTES_PREVIEW_CHARS: usize = 30;
const NOTES_LINE_CHARS: usize = 90;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Summary table columns: header and left edge.
const COLUMNS: [(&str, i64); 10] = [
    ("Date", MARGIN),
    ("Section", 110),
    ("Preacher", 210),
    ("Total", 360),
    ("Men", 410),
    ("Women", 455),
    ("Children", 505),
    ("Youth", 560),
    ("Offering", 610),
    ("Notes", 700),
];

/// `1234567.4` becomes `1 234 567 XOF`.
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} {CURRENCY}")
}

fn display_date(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn section_label(report: &Report) -> String {
    report
        .submitted_by
        .clone()
        .unwrap_or_else(|| format!("#{}", report.section_id))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

/// Greedy word wrap.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7e | 0xa0..=0xff => u32::from(c) as u8,
            _ => b'?',
        })
        .collect()
}

/// Content stream operations of one page.
#[derive(Default)]
struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn text(&mut self, font: &str, size: i64, x: i64, y: i64, text: &str) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rule(&mut self, x1: i64, x2: i64, y: i64) {
        self.ops.extend([
            Operation::new("w", vec![Object::Real(0.5)]),
            Operation::new("m", vec![x1.into(), y.into()]),
            Operation::new("l", vec![x2.into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Title and generation stamp; returns the next free baseline.
    fn header(&mut self, title: &str, generated_at: NaiveDateTime, height: i64) -> i64 {
        let top = height - MARGIN - 10;
        self.text(BOLD, 18, MARGIN, top, title);
        self.text(
            REGULAR,
            9,
            MARGIN,
            top - 16,
            &format!("Generated on {}", generated_at.format("%d/%m/%Y at %H:%M")),
        );
        top - 44
    }
}

fn pdf_error(e: impl std::fmt::Display) -> ServerError {
    ServerError::Internal(format!("PDF generation failed: {e}"))
}

fn assemble(pages: Vec<Page>, (width, height): (i64, i64)) -> Result<Vec<u8>, ServerError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content { operations: page.ops }
            .encode()
            .map_err(pdf_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width.into(), height.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}

/// One portrait page describing a single report.
pub fn render_report(report: &Report, generated_at: NaiveDateTime) -> Result<Vec<u8>, ServerError> {
    let mut page = Page::default();
    let mut y = page.header("Service Report", generated_at, PORTRAIT.1);

    page.text(
        BOLD,
        12,
        MARGIN,
        y,
        &format!("Service date: {}", display_date(report.date)),
    );
    y -= 2 * ROW_HEIGHT;

    page.text(BOLD, 13, MARGIN, y, "Service details");
    y -= 6;
    page.rule(MARGIN, PORTRAIT.0 - MARGIN, y);
    y -= ROW_HEIGHT;

    let details = [
        ("Section", section_label(report)),
        ("Preacher", report.preacher.clone()),
        ("Total attendees", report.total_attendees.to_string()),
        ("Men", report.men.to_string()),
        ("Women", report.women.to_string()),
        ("Children", report.children.to_string()),
        ("Youth", report.youth.to_string()),
        ("Offering", format_currency(report.offering)),
        (
            "Submitted on",
            report.submitted_at.format("%d/%m/%Y %H:%M").to_string(),
        ),
    ];
    for (label, value) in &details {
        page.text(BOLD, 10, MARGIN, y, label);
        page.text(REGULAR, 10, MARGIN + 160, y, value);
        y -= ROW_HEIGHT;
    }

    if let Some(notes) = report.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        y -= ROW_HEIGHT;
        page.text(BOLD, 13, MARGIN, y, "Notes");
        y -= 6;
        page.rule(MARGIN, PORTRAIT.0 - MARGIN, y);
        y -= ROW_HEIGHT;
        for line in wrap(notes, NOTES_LINE_CHARS) {
            if y < MARGIN {
                break;
            }
            page.text(REGULAR, 10, MARGIN, y, &line);
            y -= ROW_HEIGHT;
        }
    }

    assemble(vec![page], PORTRAIT)
}

/// Landscape table of reports, paginated, with totals after the last row.
pub fn render_summary(
    reports: &[Report],
    range: DateRange,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ServerError> {
    let period = match (range.start, range.end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "Period: {} to {}",
            start.map(display_date).unwrap_or_else(|| "...".into()),
            end.map(display_date).unwrap_or_else(|| "...".into()),
        )),
    };

    let chunks: Vec<&[Report]> = if reports.is_empty() {
        vec![reports]
    } else {
        reports.chunks(SUMMARY_ROWS_PER_PAGE).collect()
    };
    let page_count = chunks.len();

    let mut pages = Vec::with_capacity(page_count);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let mut page = Page::default();
        let mut y = page.header("Report Summary", generated_at, LANDSCAPE.1);
        if let Some(period) = &period {
            page.text(REGULAR, 10, MARGIN, y, period);
            y -= ROW_HEIGHT;
        }

        for (title, x) in COLUMNS {
            page.text(BOLD, 10, x, y, title);
        }
        y -= 6;
        page.rule(MARGIN, LANDSCAPE.0 - MARGIN, y);
        y -= ROW_HEIGHT;

        for report in chunk {
            let notes = report
                .notes
                .as_deref()
                .map(|n| truncate(n, NOTES_PREVIEW_CHARS))
                .unwrap_or_default();
            let cells = [
                display_date(report.date),
                truncate(&section_label(report), 16),
                truncate(&report.preacher, 24),
                report.total_attendees.to_string(),
                report.men.to_string(),
                report.women.to_string(),
                report.children.to_string(),
                report.youth.to_string(),
                format_currency(report.offering),
                notes,
            ];
            for ((_, x), cell) in COLUMNS.iter().zip(cells.iter()) {
                page.text(REGULAR, 9, *x, y, cell);
            }
            y -= ROW_HEIGHT;
        }

        if reports.is_empty() {
            page.text(REGULAR, 10, MARGIN, y, "No reports for this period.");
            y -= ROW_HEIGHT;
        }

        if index + 1 == page_count {
            let total_offering: f64 = reports.iter().map(|r| r.offering).sum();
            let total_attendees: i64 = reports.iter().map(|r| r.total_attendees).sum();
            y -= 6;
            page.rule(MARGIN, LANDSCAPE.0 - MARGIN, y + ROW_HEIGHT - 4);
            page.text(
                BOLD,
                10,
                MARGIN,
                y,
                &format!(
                    "Total: {} reports | Offering: {} | Attendees: {}",
                    reports.len(),
                    format_currency(total_offering),
                    total_attendees
                ),
            );
        }

        page.text(
            REGULAR,
            8,
            LANDSCAPE.0 - MARGIN - 60,
            MARGIN / 2,
            &format!("Page {} / {}", index + 1, page_count),
        );
        pages.push(page);
    }

    assemble(pages, LANDSCAPE)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn report(id: i64, date: &str, preacher: &str, offering: f64) -> Report {
        Report {
            id,
            section_id: 3,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            preacher: preacher.to_string(),
            total_attendees: 40,
            men: 10,
            women: 15,
            children: 10,
            youth: 5,
            offering,
            currency: CURRENCY.to_string(),
            notes: Some("Culte de louange et d'adoration, baptêmes".to_string()),
            submitted_by: Some("section-nord".to_string()),
            submitted_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "0 XOF");
        assert_eq!(format_currency(950.0), "950 XOF");
        assert_eq!(format_currency(1000.0), "1 000 XOF");
        assert_eq!(format_currency(1234567.4), "1 234 567 XOF");
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("un deux trois quatre cinq", 10);
        assert_eq!(lines, vec!["un deux", "trois", "quatre", "cinq"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn latin1_text_is_kept_and_the_rest_replaced() {
        assert_eq!(win_ansi("Évangile"), b"\xc9vangile".to_vec());
        assert_eq!(win_ansi("a\u{2014}b"), b"a?b".to_vec());
    }

    #[test]
    fn single_report_is_one_page() {
        let bytes = render_report(&report(1, "2024-03-10", "Pasteur Kouassi", 1500.0), generated_at())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
        assert!(contains(&bytes, b"Pasteur Kouassi"));
        assert!(contains(&bytes, b"1 500 XOF"));
        assert!(contains(&bytes, b"10/03/2024"));
    }

    #[test]
    fn summary_paginates_and_totals() {
        let reports: Vec<Report> = (1..=(SUMMARY_ROWS_PER_PAGE as i64 + 2))
            .map(|i| report(i, "2024-03-10", &format!("Orateur {i}"), 100.0))
            .collect();
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 3, 1),
            end: None,
        };

        let bytes = render_summary(&reports, range, generated_at()).unwrap();
        assert_eq!(page_count(&bytes), 2);
        assert!(contains(&bytes, b"Period: 01/03/2024 to ..."));
        assert!(contains(&bytes, b"Total: 30 reports | Offering: 3 000 XOF"));
    }

    #[test]
    fn empty_summary_still_renders() {
        let bytes = render_summary(&[], DateRange::all(), generated_at()).unwrap();
        assert_eq!(page_count(&bytes), 1);
        assert!(contains(&bytes, b"No reports for this period."));
    }
}
