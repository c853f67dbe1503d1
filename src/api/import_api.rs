// ==========================================
// 店铺营收分级引擎 - 报表导入 API
// ==========================================
// 职责: 封装综合报表导入（文件 / JSON 行）与批次查询
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::dashboard_api::parse_period;
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::report::{ImportBatch, ImportDiagnostic, ImportOutcome, UploadRow};
use crate::importer::{ImportRequest, ReportImporter, ReportImporterImpl};
use crate::repository::ShopRevenueRepository;

/// 批次列表默认条数
const DEFAULT_BATCH_LIST_LIMIT: usize = 20;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 导入批次ID
    pub batch_id: String,
    /// 目标月份（YYYY-MM）
    pub period: String,
    /// 上传数据行数（不含空行）
    pub total_rows: usize,
    /// 覆盖写入的店铺数
    pub imported_shops: usize,
    pub skipped_rows: usize,
    pub warning_count: usize,
    /// 诊断明细（按行号排序，可能被截断）
    pub diagnostics: Vec<ImportDiagnostic>,
    pub diagnostics_truncated: bool,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

impl From<ImportOutcome> for ImportApiResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            batch_id: outcome.batch.batch_id,
            period: outcome.batch.period.to_string(),
            total_rows: outcome.batch.total_rows,
            imported_shops: outcome.batch.imported_shops,
            skipped_rows: outcome.batch.skipped_rows,
            warning_count: outcome.batch.warning_count,
            diagnostics: outcome.diagnostics,
            diagnostics_truncated: outcome.diagnostics_truncated,
            elapsed_ms: outcome.batch.elapsed_ms,
        }
    }
}

/// 导入API
pub struct ImportApi {
    importer: ReportImporterImpl<ShopRevenueRepository, ConfigManager>,
    revenue_repo: Arc<ShopRevenueRepository>,
}

impl ImportApi {
    /// 基于共享连接创建 ImportApi
    pub fn new(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let importer = ReportImporterImpl::new(ShopRevenueRepository::from_connection(conn.clone()), config);
        Ok(Self {
            importer,
            revenue_repo: Arc::new(ShopRevenueRepository::from_connection(conn)),
        })
    }

    fn build_request(period: &str, default_shop_id: Option<&str>) -> ApiResult<ImportRequest> {
        let mut request = ImportRequest::new(parse_period(period)?);
        if let Some(shop_id) = default_shop_id {
            request = request.with_default_shop(shop_id);
        }
        Ok(request)
    }

    /// 从文件导入综合报表（.csv / .xlsx）
    ///
    /// 同一 (店铺, 月份) 重复导入时后写覆盖
    pub async fn import_file(
        &self,
        file_path: &str,
        period: &str,
        default_shop_id: Option<&str>,
    ) -> ApiResult<ImportApiResponse> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        let request = Self::build_request(period, default_shop_id)?;
        let path = PathBuf::from(file_path);

        let outcome = self.importer.import_file(path, request).await.map_err(|e| {
            warn!(file = %file_path, error = %e, "报表导入失败");
            ApiError::from(e)
        })?;
        info!(
            batch_id = %outcome.batch.batch_id,
            imported_shops = outcome.batch.imported_shops,
            "报表文件导入完成"
        );
        Ok(outcome.into())
    }

    /// 导入前端直接提交的 JSON 行
    ///
    /// 每个元素必须是 JSON 对象（列标签 → 值）；行号按提交顺序从 1 开始
    pub async fn import_json_rows(
        &self,
        rows: Vec<serde_json::Value>,
        period: &str,
        default_shop_id: Option<&str>,
    ) -> ApiResult<ImportApiResponse> {
        let request = Self::build_request(period, default_shop_id)?;

        let mut upload_rows = Vec::with_capacity(rows.len());
        for (index, value) in rows.into_iter().enumerate() {
            match value {
                serde_json::Value::Object(object) => {
                    upload_rows.push(UploadRow::from_json_object(index + 1, object));
                }
                other => {
                    return Err(ApiError::InvalidInput(format!(
                        "第{}行不是JSON对象: {}",
                        index + 1,
                        other
                    )));
                }
            }
        }

        let outcome = self.importer.import_rows(upload_rows, request).await?;
        Ok(outcome.into())
    }

    /// 批量导入多个文件（同一月份，并发执行）
    pub async fn batch_import_files(
        &self,
        file_paths: Vec<String>,
        period: &str,
    ) -> ApiResult<Vec<Result<ImportApiResponse, String>>> {
        let request = Self::build_request(period, None)?;
        let jobs = file_paths
            .into_iter()
            .map(|path| (PathBuf::from(path), request.clone()))
            .collect();

        Ok(self
            .importer
            .batch_import(jobs)
            .await
            .into_iter()
            .map(|result| result.map(ImportApiResponse::from))
            .collect())
    }

    /// 查询最近的导入批次（可按月份过滤）
    pub fn list_recent_batches(&self, period: Option<&str>, limit: Option<usize>) -> ApiResult<Vec<ImportBatch>> {
        let period = period.map(parse_period).transpose()?;
        let limit = limit.unwrap_or(DEFAULT_BATCH_LIST_LIMIT);
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.revenue_repo.list_recent_batches(period, limit)?)
    }

    /// 查询单个批次
    pub fn get_batch(&self, batch_id: &str) -> ApiResult<ImportBatch> {
        self.revenue_repo
            .find_batch(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("导入批次(id={})不存在", batch_id)))
    }
}
