use thiserror::Error;


#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("集群API错误: {0}")]
    ClusterApi(String),
    #[error("资源未找到: {kind} {name}")]
    NotFound { kind: String, name: String },
    #[error("资源已存在: {kind} {name}")]
    AlreadyExists { kind: String, name: String },
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("时间格式错误: {0}")]
    TimeFormat(String),
    #[error("存储错误: {0}")]
    Storage(String),
    #[error("集群初始化失败: {cluster} - {message}")]
    ClusterBootstrap { cluster: String, message: String },
    #[error("巡检任务未找到: {name}")]
    TaskNotFound { name: String },
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type InspectorResult<T> = Result<T, InspectorError>;

impl InspectorError {
    pub fn cluster_api<S: Into<String>>(msg: S) -> Self {
        Self::ClusterApi(msg.into())
    }
    pub fn not_found<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }
    pub fn already_exists<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }
    pub fn bootstrap<C: Into<String>, M: Into<String>>(cluster: C, message: M) -> Self {
        Self::ClusterBootstrap {
            cluster: cluster.into(),
            message: message.into(),
        }
    }
    pub fn task_not_found<S: Into<String>>(name: S) -> Self {
        Self::TaskNotFound { name: name.into() }
    }
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InspectorError::NotFound { .. } | InspectorError::TaskNotFound { .. }
        )
    }
    pub fn is_already_exists(&self) -> bool {
        matches!(self, InspectorError::AlreadyExists { .. })
    }
    /// 后端暂时性错误，下一轮调和时会重新评估
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InspectorError::ClusterApi(_) | InspectorError::Io(_) | InspectorError::Storage(_)
        )
    }
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InspectorError::Serialization(_)
                | InspectorError::Configuration(_)
                | InspectorError::Internal(_)
        )
    }
}

impl From<serde_json::Error> for InspectorError {
    fn from(err: serde_json::Error) -> Self {
        InspectorError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for InspectorError {
    fn from(err: anyhow::Error) -> Self {
        InspectorError::Internal(err.to_string())
    }
}

impl From<chrono::ParseError> for InspectorError {
    fn from(err: chrono::ParseError) -> Self {
        InspectorError::TimeFormat(err.to_string())
    }
}
