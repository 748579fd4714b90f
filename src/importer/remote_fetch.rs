// ==========================================
// SMART CALDA - 远程表格下载
// ==========================================
// 职责: 单次 GET 下载工作簿并解析
// 红线: 不重试；非 2xx 直接报错
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{ExcelParser, Workbook};
use std::time::Duration;
use tracing::{error, info, instrument};

/// 下载超时
pub const REMOTE_FETCH_TIMEOUT_SECS: u64 = 30;

pub struct RemoteWorkbookFetcher {
    client: reqwest::Client,
}

impl RemoteWorkbookFetcher {
    pub fn new() -> ImportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REMOTE_FETCH_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    /// 下载原始字节
    #[instrument(skip(self))]
    pub async fn fetch_bytes(&self, url: &str) -> ImportResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "远程表格下载失败");
            return Err(ImportError::RemoteFetchError(format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await?;
        info!(bytes = bytes.len(), "远程表格下载完成");
        Ok(bytes.to_vec())
    }

    /// 下载并解析工作簿
    pub async fn fetch_workbook(&self, url: &str) -> ImportResult<Workbook> {
        let bytes = self.fetch_bytes(url).await?;
        ExcelParser.parse_bytes(bytes)
    }
}
