use std::collections::BTreeMap;

use inspector_domain::{Level, Report};

/// 统计报告中各严重级别的数量
///
/// 以策略检查预统计的计数为初始值，再逐个扫描各类别中命中（`assert`）的结果项：
/// 声明了级别的按其级别计数，未声明的记为 danger。
pub fn count_levels(report: &Report) -> BTreeMap<Level, usize> {
    let opa = &report.spec.opa_result;
    let mut levels = BTreeMap::new();
    levels.insert(Level::Danger, opa.dangerous);
    levels.insert(Level::Warning, opa.warning);
    levels.insert(Level::Ignore, opa.ignore);

    for item in report.spec.results.values().flatten() {
        if !item.assert {
            continue;
        }
        *levels.entry(item.level.unwrap_or(Level::Danger)).or_insert(0) += 1;
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_domain::{ResultItem, RuleCategory};

    fn item(assert: bool, level: Option<Level>) -> ResultItem {
        ResultItem {
            name: "check".to_string(),
            assert,
            level,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_to_danger_and_adds_seed() {
        let mut report = Report::default();
        report.spec.opa_result.dangerous = 1;
        report.spec.results.insert(
            RuleCategory::Sysctl,
            vec![
                item(true, Some(Level::Warning)),
                item(true, Some(Level::Warning)),
                item(true, None),
            ],
        );
        report.spec.results.insert(
            RuleCategory::Systemd,
            vec![item(true, Some(Level::Warning)), item(true, None)],
        );

        let levels = count_levels(&report);
        assert_eq!(levels[&Level::Danger], 3);
        assert_eq!(levels[&Level::Warning], 3);
        assert_eq!(levels[&Level::Ignore], 0);
    }

    #[test]
    fn test_items_without_assert_are_ignored() {
        let mut report = Report::default();
        report.spec.results.insert(
            RuleCategory::NodeInfo,
            vec![item(false, Some(Level::Danger)), item(false, None)],
        );
        let levels = count_levels(&report);
        assert_eq!(levels.values().sum::<usize>(), 0);
    }
}
