// ==========================================
// 店铺营收分级引擎 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: Vec<UploadRow>（行号按文件数据行计数，空行跳过但占号）
// ==========================================

use crate::domain::report::{RawCell, UploadRow};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为上传行（首行为表头）
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<UploadRow>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 由表头与单元格组装上传行（无表头的列丢弃）
fn assemble_row(row_number: usize, headers: &[String], cells: impl Iterator<Item = RawCell>) -> UploadRow {
    let mut row = UploadRow::new(row_number);
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.cells.insert(header.clone(), cell);
    }
    row
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<UploadRow>> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 读取表头（去掉 UTF-8 BOM）
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let cells = record.iter().map(|value| {
                let value = value.trim();
                if value.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(value.to_string())
                }
            });
            let row = assemble_row(idx + 1, &headers, cells);

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "CSV 解析完成");
        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

fn excel_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                RawCell::Empty
            } else {
                RawCell::Text(trimmed.to_string())
            }
        }
        // 日期格式单元格保留序列值，交给日期解析
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => RawCell::Text(s.trim().to_string()),
        Data::DurationIso(s) => RawCell::Unsupported(s.clone()),
        Data::Bool(b) => RawCell::Unsupported(b.to_string()),
        Data::Error(e) => RawCell::Unsupported(format!("{:?}", e)),
    }
}

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<UploadRow>> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut data_rows = range.rows();
        let header_row = data_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无表头行".to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, data_row) in data_rows.enumerate() {
            let row = assemble_row(idx + 1, &headers, data_row.iter().map(excel_cell));
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        debug!(file = %file_path.display(), sheet = %sheet_name, rows = rows.len(), "Excel 解析完成");
        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<UploadRow>> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_rows(path),
            "xlsx" | "xls" => ExcelParser.parse_rows(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let file = csv_file(
            "Mã Shop,Tổng giá trị hàng hóa (₫),Tỷ lệ chuyển đổi\n\
             S001,\"1,500,000\",6%\n\
             S002,,3%\n",
        );
        let rows = CsvParser.parse_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[0].get("Mã Shop"), Some(&RawCell::Text("S001".to_string())));
        assert_eq!(
            rows[0].get("Tổng giá trị hàng hóa (₫)"),
            Some(&RawCell::Text("1,500,000".to_string()))
        );
        assert_eq!(rows[1].get("Tổng giá trị hàng hóa (₫)"), Some(&RawCell::Empty));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows_keeps_numbering() {
        let file = csv_file("\u{feff}Mã Shop,Số người mua\nS001,3\n , \nS002,4\n");
        let rows = CsvParser.parse_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].get("Mã Shop").is_some());
        assert_eq!(rows[1].row_number, 3);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let err = CsvParser.parse_rows(Path::new("/tmp/khong_ton_tai_123.csv")).unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = UniversalFileParser.parse(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_excel_cell_conversion() {
        assert_eq!(excel_cell(&Data::Int(12)), RawCell::Number(12.0));
        assert_eq!(excel_cell(&Data::Float(1.5)), RawCell::Number(1.5));
        assert_eq!(excel_cell(&Data::String("  ".to_string())), RawCell::Empty);
        assert!(matches!(excel_cell(&Data::Bool(true)), RawCell::Unsupported(_)));
        assert_eq!(
            excel_cell(&Data::DateTimeIso(" 2025-09-01 ".to_string())),
            RawCell::Text("2025-09-01".to_string())
        );
    }

    fn report_fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/comprehensive_report.xlsx")
    }

    #[test]
    fn test_excel_parser_reads_workbook() {
        let rows = ExcelParser.parse_rows(&report_fixture()).unwrap();

        // 第 4 行为空行：跳过但占号
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.row_number).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(rows[0].get("Mã Shop"), Some(&RawCell::Text("S001".to_string())));
        assert_eq!(rows[0].get("Tổng giá trị hàng hóa (₫)"), Some(&RawCell::Number(1_500_000.0)));
        // 日期格式单元格 → 序列值
        assert_eq!(rows[0].get("Ngày"), Some(&RawCell::Number(45901.0)));
        assert_eq!(rows[1].get("Ngày"), Some(&RawCell::Text("15/09/2025".to_string())));
    }

    #[test]
    fn test_excel_dates_normalize_to_calendar_days() {
        use crate::importer::column_mapping::ColumnMap;
        use crate::importer::report_normalizer::ReportNormalizer;
        use chrono::NaiveDate;

        let rows = UniversalFileParser.parse(report_fixture()).unwrap();
        let (normalized, diagnostics) = ReportNormalizer::new(ColumnMap::standard().unwrap()).normalize_rows(&rows);

        let dates: Vec<_> = normalized.iter().map(|r| r.revenue_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 9, 1),
                NaiveDate::from_ymd_opt(2025, 9, 15),
                NaiveDate::from_ymd_opt(2025, 9, 10),
            ]
        );
        assert_eq!(normalized[0].metrics.total_orders, 12);
        assert_eq!(normalized[1].metrics.total_revenue, 250_000);
        assert_eq!(normalized[2].shop_id.as_deref(), Some("S002"));
        assert!(diagnostics.is_empty());
    }
}
