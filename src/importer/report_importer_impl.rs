// ==========================================
// 店铺营收分级引擎 - 报表导入器实现
// ==========================================
// 职责: 整合导入流程，从上传内容到数据库
// 流程: 解析 → 映射 → 规范化 → 合并 → 落库
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::config_keys;
use crate::domain::report::{DiagnosticLevel, ImportBatch, ImportOutcome, UploadRow};
use crate::engine::revenue_aggregator::RevenueAggregator;
use crate::importer::column_mapping::ColumnMap;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::report_importer_trait::{ImportRequest, ReportImporter};
use crate::importer::report_normalizer::ReportNormalizer;
use crate::importer::upload_merger::{MergeOptions, UploadMerger};
use crate::repository::ReportImportRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ReportImporterImpl - 报表导入器实现
// ==========================================
pub struct ReportImporterImpl<R, C>
where
    R: ReportImportRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: UniversalFileParser,
    merger: UploadMerger,
    aggregator: RevenueAggregator,
}

fn config_error(key: &str, err: Box<dyn std::error::Error + Send + Sync>) -> ImportError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message: err.to_string(),
    }
}

impl<R, C> ReportImporterImpl<R, C>
where
    R: ReportImportRepository,
    C: ImportConfigReader,
{
    pub fn new(import_repo: R, config: C) -> Self {
        Self {
            import_repo,
            config,
            file_parser: UniversalFileParser,
            merger: UploadMerger::new(),
            aggregator: RevenueAggregator::new(),
        }
    }

    /// 读取本次导入的配置并构造映射表
    async fn load_settings(&self) -> ImportResult<(ColumnMap, bool, usize)> {
        let reject = self
            .config
            .get_reject_out_of_period_rows()
            .await
            .map_err(|e| config_error(config_keys::REJECT_OUT_OF_PERIOD_ROWS, e))?;
        let aliases = self
            .config
            .get_column_aliases()
            .await
            .map_err(|e| config_error(config_keys::COLUMN_ALIASES, e))?;
        let max_diagnostics = self
            .config
            .get_max_diagnostics_per_batch()
            .await
            .map_err(|e| config_error(config_keys::MAX_DIAGNOSTICS_PER_BATCH, e))?;

        let columns = ColumnMap::standard()?.with_aliases(&aliases)?;
        Ok((columns, reject, max_diagnostics))
    }
}

fn normalize_request(mut request: ImportRequest) -> ImportRequest {
    request.default_shop_id = request
        .default_shop_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    request
}

#[async_trait]
impl<R, C> ReportImporter for ReportImporterImpl<R, C>
where
    R: ReportImportRepository + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path, request), fields(period = %request.period))]
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        request: ImportRequest,
    ) -> ImportResult<ImportOutcome> {
        let path: PathBuf = file_path.as_ref().to_path_buf();
        info!(file = %path.display(), "开始解析报表文件");

        // 阶段 0: 文件读取与解析
        let rows = self.file_parser.parse(&path)?;
        debug!(rows = rows.len(), "文件解析完成");

        let mut request = request;
        if request.file_name.is_none() {
            request.file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string());
        }
        self.import_rows(rows, request).await
    }

    #[instrument(skip(self, rows, request), fields(period = %request.period, batch_id = tracing::field::Empty))]
    async fn import_rows(&self, rows: Vec<UploadRow>, request: ImportRequest) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        let request = normalize_request(request);

        // 阶段 1: 过滤空行
        let rows: Vec<UploadRow> = rows.into_iter().filter(|row| !row.is_blank()).collect();
        if rows.is_empty() {
            warn!("上传内容无数据行");
            return Err(ImportError::EmptyUpload);
        }
        let total_rows = rows.len();
        info!(total_rows, "开始导入综合报表");

        // 阶段 2: 配置与映射表
        let (columns, reject_out_of_period_rows, max_diagnostics) = self.load_settings().await?;

        // 阶段 3: 单元格规范化
        let normalizer = ReportNormalizer::new(columns);
        let (normalized, mut diagnostics) = normalizer.normalize_rows(&rows);
        debug!(diagnostics = diagnostics.len(), "规范化完成");

        // 阶段 4: 按店铺合并
        let merged = self.merger.merge(
            normalized,
            &MergeOptions {
                period: request.period,
                default_shop_id: request.default_shop_id.clone(),
                reject_out_of_period_rows,
            },
        );
        diagnostics.extend(merged.diagnostics);

        let mut revenues = merged.revenues;
        let mut reports = merged.reports;
        for revenue in &mut revenues {
            revenue.source_batch_id = Some(batch_id.clone());
            let outcome = self.aggregator.project_shop(revenue);
            debug!(shop_id = %revenue.shop_id, projected = outcome.projected_revenue, "店铺月度营收");
        }
        for report in &mut reports {
            report.source_batch_id = Some(batch_id.clone());
        }

        // 阶段 5: 诊断整理（按行号稳定排序，超限截断）
        diagnostics.sort_by_key(|d| d.row_number);
        let warning_count = diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count();
        let diagnostics_truncated = diagnostics.len() > max_diagnostics;
        if diagnostics_truncated {
            warn!(total = diagnostics.len(), kept = max_diagnostics, "诊断条数超过上限，已截断");
            diagnostics.truncate(max_diagnostics);
        }

        // 阶段 6: 落库（单事务）
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            period: request.period,
            file_name: request.file_name.clone(),
            total_rows,
            imported_shops: revenues.len(),
            skipped_rows: merged.skipped_rows,
            warning_count,
            imported_at: Utc::now(),
            elapsed_ms: start_time.elapsed().as_millis() as i64,
        };
        let saved = self.import_repo.save_import(&batch, &revenues, &reports).await?;

        info!(
            batch_id = %batch_id,
            shops = saved,
            skipped = batch.skipped_rows,
            warnings = warning_count,
            elapsed_ms = batch.elapsed_ms,
            "综合报表导入完成"
        );

        Ok(ImportOutcome {
            batch,
            revenues,
            reports,
            diagnostics,
            diagnostics_truncated,
        })
    }

    async fn batch_import(&self, jobs: Vec<(PathBuf, ImportRequest)>) -> Vec<Result<ImportOutcome, String>> {
        use futures::future::join_all;

        info!(count = jobs.len(), "开始批量导入文件");

        let import_tasks = jobs.into_iter().map(|(path, request)| {
            let path_str = path.display().to_string();
            async move {
                match self.import_file(path, request).await {
                    Ok(outcome) => {
                        info!(file = %path_str, shops = outcome.batch.imported_shops, "文件导入成功");
                        Ok(outcome)
                    }
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            }
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}
