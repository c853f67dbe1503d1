// ==========================================
// 店铺营收分级引擎 - 导入层
// ==========================================
// 职责: 外部报表导入,生成月度营收与综合报表
// 支持: Excel, CSV, 前端提交的 JSON 行
// ==========================================

// 模块声明
pub mod column_mapping;
pub mod error;
pub mod file_parser;
pub mod report_importer_impl;
pub mod report_importer_trait;
pub mod report_normalizer;
pub mod upload_merger;
pub mod value_parser;

// 重导出核心类型
pub use column_mapping::{ColumnMap, ColumnSpec, ReportField, ValueKind, STANDARD_COLUMNS};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use report_importer_impl::ReportImporterImpl;
pub use report_importer_trait::{ImportRequest, ReportImporter};
pub use report_normalizer::ReportNormalizer;
pub use upload_merger::{MergeOptions, MergedUpload, UploadMerger};
pub use value_parser::{
    parse_integer, parse_integer_checked, parse_number, parse_number_checked, parse_percentage,
    parse_percentage_checked, CellParseIssue,
};
