// Aggregation & rate engine.
//
// Every chart on the dashboard is one of these functions applied to a
// filtered table. Sums are integer; each percentage goes through
// `rate_percent`/`round2`, so a zero denominator is a 0.00 rate and every
// figure carries exactly two decimals (half away from zero).
use crate::types::{
    CanonicalTable, EntityField, EntityRate, HeatmapCell, ParetoRow, PeriodField, PeriodRate,
    QtyField, RateMetric, ShareRow,
};
use crate::util::{rate_percent, round2};
use std::collections::BTreeMap;

/// Number of entries shown on the "top defective models" chart.
pub const DEFAULT_TOP_LIMIT: usize = 3;

/// Rate over the whole table.
pub fn overall_rate(table: &CanonicalTable, numerator: QtyField, denominator: QtyField) -> RateMetric {
    let (num, den) = table.records.iter().fold((0i64, 0i64), |(n, d), r| {
        (n + r.qty(numerator), d + r.qty(denominator))
    });
    RateMetric::new(num, den)
}

/// One rate per distinct period value, ascending by period.
///
/// Only periods present in the table appear; absent months or weeks are
/// not zero-filled.
pub fn group_rate_by_period(
    table: &CanonicalTable,
    period: PeriodField,
    numerator: QtyField,
    denominator: QtyField,
) -> Vec<PeriodRate> {
    let mut groups: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    for r in &table.records {
        let e = groups.entry(r.period(period)).or_insert((0, 0));
        e.0 += r.qty(numerator);
        e.1 += r.qty(denominator);
    }
    groups
        .into_iter()
        .map(|(period, (num, den))| PeriodRate {
            period,
            metric: RateMetric::new(num, den),
        })
        .collect()
}

/// One rate per distinct entity value, ascending by entity name.
pub fn group_rate_by_entity(
    table: &CanonicalTable,
    group: EntityField,
    numerator: QtyField,
    denominator: QtyField,
) -> Vec<EntityRate> {
    let mut groups: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for r in &table.records {
        let e = groups.entry(r.entity(group)).or_insert((0, 0));
        e.0 += r.qty(numerator);
        e.1 += r.qty(denominator);
    }
    groups
        .into_iter()
        .map(|(entity, (num, den))| EntityRate {
            entity: entity.to_string(),
            metric: RateMetric::new(num, den),
        })
        .collect()
}

/// The `limit` entities with the highest rate.
///
/// Groups are visited in ascending key order and the sort is stable, so
/// equal rates keep that order and the result is fully deterministic.
pub fn top_entities(
    table: &CanonicalTable,
    group: EntityField,
    numerator: QtyField,
    denominator: QtyField,
    limit: usize,
) -> Vec<EntityRate> {
    let mut ranked = group_rate_by_entity(table, group, numerator, denominator);
    ranked.sort_by(|a, b| b.metric.rate.total_cmp(&a.metric.rate));
    ranked.truncate(limit);
    ranked
}

/// Column positions of `defect_columns` in the table; unknown names are dropped.
fn defect_indices<'a>(table: &CanonicalTable, defect_columns: &'a [String]) -> Vec<(usize, &'a str)> {
    defect_columns
        .iter()
        .filter_map(|name| {
            table
                .defect_columns
                .iter()
                .position(|c| c == name)
                .map(|idx| (idx, name.as_str()))
        })
        .collect()
}

/// Total count per defect type across all rows, in `defect_columns` order.
pub fn defect_totals(table: &CanonicalTable, defect_columns: &[String]) -> Vec<(String, i64)> {
    defect_indices(table, defect_columns)
        .into_iter()
        .map(|(idx, name)| {
            let total: i64 = table
                .records
                .iter()
                .map(|r| r.defects.get(idx).copied().unwrap_or(0))
                .sum();
            (name.to_string(), total)
        })
        .collect()
}

/// Defect types by count descending with the running cumulative share.
///
/// Types whose total is not positive are left out, so the last row's
/// cumulative percent is 100.00. No defects at all gives an empty result.
pub fn pareto_distribution(table: &CanonicalTable, defect_columns: &[String]) -> Vec<ParetoRow> {
    let mut totals: Vec<(String, i64)> = defect_totals(table, defect_columns)
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    let grand_total: i64 = totals.iter().map(|(_, c)| c).sum();
    if grand_total == 0 {
        return Vec::new();
    }
    // Stable: equal counts keep column order.
    totals.sort_by(|a, b| b.1.cmp(&a.1));

    let mut running = 0i64;
    totals
        .into_iter()
        .map(|(defect_type, count)| {
            running += count;
            ParetoRow {
                defect_type,
                count,
                cumulative_percent: round2(running as f64 / grand_total as f64 * 100.0),
            }
        })
        .collect()
}

/// Each defect type's share of all defects, in column order.
///
/// The total counts every type, negative corrections included. Types with
/// a positive count are listed even when their share rounds to 0.00, so the
/// rows line up with the Pareto output. A total that is not positive gives
/// an empty result.
pub fn defect_share(table: &CanonicalTable, defect_columns: &[String]) -> Vec<ShareRow> {
    let totals = defect_totals(table, defect_columns);
    let grand_total: i64 = totals.iter().map(|(_, c)| c).sum();
    if grand_total <= 0 {
        return Vec::new();
    }
    totals
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(defect_type, count)| ShareRow {
            defect_type,
            count,
            percent: rate_percent(count, grand_total),
        })
        .collect()
}

/// Per-model defect rate for every defect type, as sparse cells.
///
/// The rate is the model's total for that defect over the model's total
/// `denominator` quantity. Only cells with a positive rate are returned,
/// ordered by model then defect column.
pub fn heatmap_matrix(
    table: &CanonicalTable,
    defect_columns: &[String],
    denominator: QtyField,
) -> Vec<HeatmapCell> {
    let indices = defect_indices(table, defect_columns);
    let mut by_model: BTreeMap<&str, (Vec<i64>, i64)> = BTreeMap::new();
    for r in &table.records {
        let e = by_model
            .entry(r.model.as_str())
            .or_insert_with(|| (vec![0; indices.len()], 0));
        for (slot, (idx, _)) in indices.iter().enumerate() {
            e.0[slot] += r.defects.get(*idx).copied().unwrap_or(0);
        }
        e.1 += r.qty(denominator);
    }

    let mut cells = Vec::new();
    for (model, (counts, den)) in by_model {
        for ((_, defect_type), count) in indices.iter().zip(counts) {
            let rate = rate_percent(count, den);
            if rate > 0.0 {
                cells.push(HeatmapCell {
                    model: model.to_string(),
                    defect_type: defect_type.to_string(),
                    rate,
                });
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;
    use crate::types::InspectionRecord;

    fn rec(model: &str, week: i64, inspected: i64, reject: i64, defects: Vec<i64>) -> InspectionRecord {
        InspectionRecord {
            subcontractor: "S".to_string(),
            year: 2024,
            month: (week - 1) / 4 + 1,
            week,
            model: model.to_string(),
            inspected_qty: inspected,
            reject_qty: reject,
            return_qty: 0,
            target_qty: 0,
            date: None,
            defects,
        }
    }

    fn table(records: Vec<InspectionRecord>) -> CanonicalTable {
        let mut t = CanonicalTable::new(
            Category::Upper,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        );
        t.records = records;
        t
    }

    #[test]
    fn weekly_rate_with_zero_inspection_week_is_zero() {
        let t = table(vec![rec("M", 1, 100, 5, vec![0, 0, 0]), rec("M", 2, 0, 0, vec![0, 0, 0])]);
        let weekly = group_rate_by_period(&t, PeriodField::Week, QtyField::Reject, QtyField::Inspected);
        let pairs: Vec<(i64, f64)> = weekly.iter().map(|p| (p.period, p.metric.rate)).collect();
        assert_eq!(pairs, vec![(1, 5.0), (2, 0.0)]);
    }

    #[test]
    fn periods_are_distinct_and_not_zero_filled() {
        let t = table(vec![
            rec("M", 9, 10, 1, vec![0, 0, 0]),
            rec("M", 1, 10, 1, vec![0, 0, 0]),
            rec("N", 9, 30, 1, vec![0, 0, 0]),
        ]);
        let weekly = group_rate_by_period(&t, PeriodField::Week, QtyField::Reject, QtyField::Inspected);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].period, 1);
        assert_eq!(weekly[1].period, 9);
        assert_eq!(weekly[1].metric, RateMetric { numerator: 2, denominator: 40, rate: 5.0 });
    }

    #[test]
    fn top_entities_sorts_by_rate_and_truncates() {
        let t = table(vec![
            rec("Z", 1, 100, 10, vec![0, 0, 0]),
            rec("B", 1, 100, 1, vec![0, 0, 0]),
            rec("A", 1, 100, 10, vec![0, 0, 0]),
            rec("C", 1, 0, 3, vec![0, 0, 0]),
            rec("D", 1, 50, 25, vec![0, 0, 0]),
        ]);
        let top = top_entities(&t, EntityField::Model, QtyField::Reject, QtyField::Inspected, 3);
        let names: Vec<&str> = top.iter().map(|e| e.entity.as_str()).collect();
        // A and Z tie at 10%; ascending key order decides.
        assert_eq!(names, vec!["D", "A", "Z"]);

        let all = top_entities(&t, EntityField::Model, QtyField::Reject, QtyField::Inspected, 10);
        assert_eq!(all.len(), 5);
        assert_eq!(all.last().unwrap().entity, "C");
        assert_eq!(all.last().unwrap().metric.rate, 0.0);
    }

    #[test]
    fn top_entities_on_empty_table_is_empty() {
        let t = table(vec![]);
        assert!(top_entities(&t, EntityField::Model, QtyField::Reject, QtyField::Inspected, 3).is_empty());
    }

    #[test]
    fn pareto_matches_worked_example() {
        let t = table(vec![rec("M", 1, 10, 1, vec![6, 0, 5]), rec("M", 2, 10, 1, vec![4, 0, 0])]);
        let cols = t.defect_columns.clone();
        let pareto = pareto_distribution(&t, &cols);
        assert_eq!(
            pareto,
            vec![
                ParetoRow { defect_type: "A".into(), count: 10, cumulative_percent: 66.67 },
                ParetoRow { defect_type: "C".into(), count: 5, cumulative_percent: 100.0 },
            ]
        );
    }

    #[test]
    fn pareto_ties_keep_column_order() {
        let t = table(vec![rec("M", 1, 10, 1, vec![1, 3, 3])]);
        let cols = t.defect_columns.clone();
        let order: Vec<String> = pareto_distribution(&t, &cols).into_iter().map(|p| p.defect_type).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn no_defects_means_empty_pareto_and_share() {
        let t = table(vec![rec("M", 1, 10, 0, vec![0, 0, 0])]);
        let cols = t.defect_columns.clone();
        assert!(pareto_distribution(&t, &cols).is_empty());
        assert!(defect_share(&t, &cols).is_empty());
        assert!(heatmap_matrix(&t, &cols, QtyField::Inspected).is_empty());
    }

    #[test]
    fn defect_share_excludes_zero_types_and_sums_to_hundred() {
        let t = table(vec![rec("M", 1, 10, 1, vec![1, 0, 2])]);
        let cols = t.defect_columns.clone();
        let share = defect_share(&t, &cols);
        assert_eq!(share.len(), 2);
        assert_eq!(share[0].percent, 33.33);
        assert_eq!(share[1].percent, 66.67);
        let sum: f64 = share.iter().map(|s| s.percent).sum();
        assert!((sum - 100.0).abs() < 0.011);
    }

    #[test]
    fn tiny_share_is_kept_when_pareto_lists_it() {
        let t = table(vec![rec("M", 1, 10, 1, vec![30000, 1, 0])]);
        let cols = t.defect_columns.clone();
        let pareto: Vec<String> = pareto_distribution(&t, &cols).into_iter().map(|p| p.defect_type).collect();
        let share = defect_share(&t, &cols);
        let names: Vec<&str> = share.iter().map(|s| s.defect_type.as_str()).collect();
        assert_eq!(pareto, vec!["A", "B"]);
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(share[0].percent, 100.0);
        assert_eq!(share[1].count, 1);
        assert_eq!(share[1].percent, 0.0);
    }

    #[test]
    fn share_total_counts_negative_corrections() {
        let t = table(vec![rec("M", 1, 10, 1, vec![4, -1, 1])]);
        let cols = t.defect_columns.clone();
        let share = defect_share(&t, &cols);
        let pairs: Vec<(&str, f64)> = share.iter().map(|s| (s.defect_type.as_str(), s.percent)).collect();
        // total is 4 - 1 + 1 = 4
        assert_eq!(pairs, vec![("A", 100.0), ("C", 25.0)]);

        let negative = table(vec![rec("M", 1, 10, 1, vec![1, -3, 0])]);
        assert!(defect_share(&negative, &cols).is_empty());
    }

    #[test]
    fn heatmap_is_sparse_and_zero_denominator_safe() {
        let t = table(vec![
            rec("M1", 1, 200, 3, vec![2, 0, 1]),
            rec("M1", 2, 200, 1, vec![1, 0, 0]),
            rec("M2", 1, 0, 4, vec![4, 0, 0]),
        ]);
        let cols = t.defect_columns.clone();
        let cells = heatmap_matrix(&t, &cols, QtyField::Inspected);
        assert_eq!(
            cells,
            vec![
                HeatmapCell { model: "M1".into(), defect_type: "A".into(), rate: 0.75 },
                HeatmapCell { model: "M1".into(), defect_type: "C".into(), rate: 0.25 },
            ]
        );
    }

    #[test]
    fn subset_of_defect_columns_is_respected() {
        let t = table(vec![rec("M", 1, 10, 1, vec![5, 5, 5])]);
        let only_b = vec!["B".to_string(), "missing".to_string()];
        let pareto = pareto_distribution(&t, &only_b);
        assert_eq!(pareto.len(), 1);
        assert_eq!(pareto[0].cumulative_percent, 100.0);
    }

    #[test]
    fn overall_rate_of_empty_table_is_zero() {
        let m = overall_rate(&table(vec![]), QtyField::Reject, QtyField::Inspected);
        assert_eq!(m, RateMetric { numerator: 0, denominator: 0, rate: 0.0 });
    }
}
