use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use inspector_domain::Report;
use inspector_errors::{InspectorError, InspectorResult};

/// 报告文件存储，文件路径为 `<root>/<报告名>`
#[derive(Debug, Clone)]
pub struct ReportStorage {
    root: PathBuf,
}

impl ReportStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub async fn save(&self, report: &Report) -> InspectorResult<PathBuf> {
        if report.name().is_empty() {
            return Err(InspectorError::storage("报告名称不能为空"));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path(report.name());
        let data = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, data).await?;
        debug!("报告已写入 {}", path.display());
        Ok(path)
    }

    pub async fn load(&self, name: &str) -> InspectorResult<Report> {
        let path = self.path(name);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(InspectorError::not_found("报告文件", path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// 删除报告文件，文件不存在时视为成功
    pub async fn remove(&self, name: &str) -> InspectorResult<()> {
        match tokio::fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
