use std::collections::HashMap;
use std::sync::Arc;

use inspector_domain::{OpaResult, Report, ResultItem, RuleCategory};
use inspector_errors::InspectorResult;

/// 从单个 Job 的原始输出中提取结果片段并合并进报告
pub trait ResultExtractor: Send + Sync {
    fn extract(
        &self,
        node_name: Option<&str>,
        payload: &[u8],
        report: &mut Report,
    ) -> InspectorResult<()>;
}

/// 策略检查输出预统计的计数与资源列表
pub struct OpaResultExtractor;

impl ResultExtractor for OpaResultExtractor {
    fn extract(
        &self,
        _node_name: Option<&str>,
        payload: &[u8],
        report: &mut Report,
    ) -> InspectorResult<()> {
        let result: OpaResult = serde_json::from_slice(payload)?;
        report.spec.opa_result.merge(result);
        Ok(())
    }
}

/// 输出为结果项列表的类别，结果项缺少节点名时补上产生它的节点
pub struct ItemResultExtractor {
    category: RuleCategory,
}

impl ItemResultExtractor {
    pub fn new(category: RuleCategory) -> Self {
        Self { category }
    }
}

impl ResultExtractor for ItemResultExtractor {
    fn extract(
        &self,
        node_name: Option<&str>,
        payload: &[u8],
        report: &mut Report,
    ) -> InspectorResult<()> {
        let mut items: Vec<ResultItem> = serde_json::from_slice(payload)?;
        if let Some(node) = node_name.filter(|n| !n.is_empty()) {
            for item in items.iter_mut().filter(|i| i.node_name.is_none()) {
                item.node_name = Some(node.to_string());
            }
        }
        report
            .spec
            .results
            .entry(self.category)
            .or_default()
            .extend(items);
        Ok(())
    }
}

/// 类别到结果提取器的映射，启动时构建
#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<RuleCategory, Arc<dyn ResultExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for category in RuleCategory::ALL {
            match category {
                RuleCategory::Opa => registry.register(category, Arc::new(OpaResultExtractor)),
                _ => registry.register(category, Arc::new(ItemResultExtractor::new(category))),
            }
        }
        registry
    }

    pub fn register(&mut self, category: RuleCategory, extractor: Arc<dyn ResultExtractor>) {
        self.extractors.insert(category, extractor);
    }

    pub fn get(&self, category: RuleCategory) -> Option<&dyn ResultExtractor> {
        self.extractors.get(&category).map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
