use csv::StringRecord;
use sqlx::PgPool;

use crate::db;
use crate::models::NewMonthlyStat;

use super::fields::{self, DateMode, FieldError};
use super::IngestError;

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "calendar_month",
    "impressions",
    "engagements",
    "outbound_clicks",
    "saves",
];

/// Positions of the required columns within the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    calendar_month: usize,
    impressions: usize,
    engagements: usize,
    outbound_clicks: usize,
    saves: usize,
}

impl Columns {
    fn locate(header: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| header.iter().position(|h| h == name);

        match (
            find("calendar_month"),
            find("impressions"),
            find("engagements"),
            find("outbound_clicks"),
            find("saves"),
        ) {
            (
                Some(calendar_month),
                Some(impressions),
                Some(engagements),
                Some(outbound_clicks),
                Some(saves),
            ) => {
                Ok(Self {
                    calendar_month,
                    impressions,
                    engagements,
                    outbound_clicks,
                    saves,
                })
            }
            _ => Err(IngestError::MissingColumns),
        }
    }
}

/// Sorted, comma-joined list used in the missing-columns message.
pub fn required_columns_label() -> String {
    let mut columns = REQUIRED_COLUMNS.to_vec();
    columns.sort_unstable();
    columns.join(", ")
}

fn parse_record(
    record: &StringRecord,
    columns: Columns,
    mode: DateMode,
) -> Result<NewMonthlyStat, FieldError> {
    let raw_month = record
        .get(columns.calendar_month)
        .ok_or_else(|| FieldError::MissingValue("calendar_month".to_string()))?;
    // Short rows leave trailing counters blank, which reads as zero.
    let counter =
        |index: usize, name: &str| fields::parse_int_field(record.get(index).unwrap_or(""), name);

    Ok(NewMonthlyStat {
        calendar_month: fields::parse_calendar_month(raw_month, mode)?,
        impressions: counter(columns.impressions, "impressions")?,
        engagements: counter(columns.engagements, "engagements")?,
        outbound_clicks: counter(columns.outbound_clicks, "outbound_clicks")?,
        saves: counter(columns.saves, "saves")?,
    })
}

/// Parse every data row in order. The first bad row aborts the whole file.
///
/// Line numbers count the header as line 1, so the first data row is line 2.
pub fn parse_rows(text: &str, mode: DateMode) -> Result<Vec<NewMonthlyStat>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header = reader.headers().map_err(|_| IngestError::MissingColumns)?.clone();
    let columns = Columns::locate(&header)?;

    let mut rows = Vec::new();
    let mut line: u64 = 1;
    let mut record = StringRecord::new();

    loop {
        line += 1;
        let more = reader.read_record(&mut record).map_err(|e| IngestError::Row {
            line,
            message: e.to_string(),
        })?;
        if !more {
            break;
        }

        let stat = parse_record(&record, columns, mode).map_err(|e| IngestError::Row {
            line,
            message: e.to_string(),
        })?;
        rows.push(stat);
    }

    Ok(rows)
}

/// Parse the file and store every row in one transaction.
///
/// Nothing is written unless every row parses and every insert succeeds.
pub async fn run(pool: &PgPool, text: &str, mode: DateMode) -> Result<u64, IngestError> {
    let rows = parse_rows(text, mode)?;

    let mut tx = pool.begin().await?;
    for row in &rows {
        if let Err(e) = db::monthly_stats::insert(&mut *tx, row).await {
            tx.rollback().await?;
            return Err(e.into());
        }
    }
    tx.commit().await?;

    Ok(rows.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "calendar_month,impressions,engagements,outbound_clicks,saves";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quoted_thousands_are_parsed() {
        let text = format!("{HEADER}\n2024-01-01,\"1,313\",10,2,0\n");
        let rows = parse_rows(&text, DateMode::Strict).unwrap();

        assert_eq!(
            rows,
            vec![NewMonthlyStat {
                calendar_month: date(2024, 1, 1),
                impressions: 1313,
                engagements: 10,
                outbound_clicks: 2,
                saves: 0,
            }]
        );
    }

    #[test]
    fn first_bad_row_reports_its_line() {
        let text = format!(
            "{HEADER}\n2024-01-01,100,10,2,0\n2024-02-01,abc,10,2,0\n2024-03-01,zzz,1,1,1\n"
        );
        match parse_rows(&text, DateMode::Strict) {
            Err(IngestError::Row { line, message }) => {
                assert_eq!(line, 3);
                assert_eq!(message, "Invalid integer for impressions: \"abc\"");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn row_error_message_embeds_line_number() {
        let text = format!("{HEADER}\n01/01-01/31,1,1,1,1\n");
        let err = parse_rows(&text, DateMode::Range { default_year: None }).unwrap_err();
        assert!(err.to_string().starts_with("Error parsing CSV on line 2: Missing year"));
    }

    #[test]
    fn range_mode_collapses_to_start_day() {
        let text = format!(
            "{HEADER}\n01/01-01/31 2024,1,2,3,4\n02/01-02/29,5,6,7,8\n2024-03-01,9,10,11,12\n"
        );
        let rows = parse_rows(&text, DateMode::Range { default_year: Some(2024) }).unwrap();
        let months: Vec<_> = rows.iter().map(|r| r.calendar_month).collect();
        assert_eq!(months, vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]);
    }

    #[test]
    fn strict_mode_rejects_ranges() {
        let text = format!("{HEADER}\n01/01-01/31 2024,1,2,3,4\n");
        assert!(matches!(
            parse_rows(&text, DateMode::Strict),
            Err(IngestError::Row { line: 2, .. })
        ));
    }

    #[test]
    fn column_order_and_extra_columns_do_not_matter() {
        let text = "saves,notes,calendar_month,outbound_clicks,engagements,impressions\n\
                    4,hello,2024-05-01,3,2,1\n";
        let rows = parse_rows(text, DateMode::Strict).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].impressions, 1);
        assert_eq!(rows[0].engagements, 2);
        assert_eq!(rows[0].outbound_clicks, 3);
        assert_eq!(rows[0].saves, 4);
    }

    #[test]
    fn missing_columns_are_listed_sorted() {
        let text = "calendar_month,impressions,saves\n2024-01-01,1,1\n";
        let err = parse_rows(text, DateMode::Strict).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns));
        assert_eq!(
            err.to_string(),
            "CSV must contain columns: calendar_month, engagements, impressions, outbound_clicks, saves"
        );
    }

    #[test]
    fn empty_payload_has_no_columns() {
        assert!(matches!(
            parse_rows("", DateMode::Strict),
            Err(IngestError::MissingColumns)
        ));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        assert!(parse_rows(HEADER, DateMode::Strict).unwrap().is_empty());
    }

    #[test]
    fn blank_counters_and_short_rows_read_as_zero() {
        let text = format!("{HEADER}\n2024-01-01,,\" \",5\n");
        let rows = parse_rows(&text, DateMode::Strict).unwrap();
        assert_eq!(rows[0].impressions, 0);
        assert_eq!(rows[0].engagements, 0);
        assert_eq!(rows[0].outbound_clicks, 5);
        assert_eq!(rows[0].saves, 0);
    }

    #[test]
    fn crlf_line_endings() {
        let text = format!("{HEADER}\r\n2024-01-01,1,2,3,4\r\n2024-02-01,5,6,7,8\r\n");
        assert_eq!(parse_rows(&text, DateMode::Strict).unwrap().len(), 2);
    }

    #[test]
    fn label_is_sorted() {
        assert_eq!(
            required_columns_label(),
            "calendar_month, engagements, impressions, outbound_clicks, saves"
        );
    }
}
