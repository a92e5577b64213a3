//! Plain-text rendering of optimization results and histograms

use std::collections::BTreeMap;

use canteiro_core::{BottleneckKind, OptimizationResult};
use canteiro_solver::{histogram_stats, overload_periods};
use chrono::NaiveDate;

const BAR_WIDTH: u32 = 50;

fn kind_label(kind: BottleneckKind) -> &'static str {
    match kind {
        BottleneckKind::WorkforceOverload => "mão de obra",
        BottleneckKind::EquipmentConflict => "equipamento",
        BottleneckKind::PhaseSequencing => "sequenciamento",
    }
}

/// Human-readable summary of an optimization run
pub fn render_result(result: &OptimizationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Otimização: {}\n", result.original_schedule.name));
    out.push_str(&format!(
        "  Tarefas: {} ({} divididas)\n",
        result.optimized_tasks.len(),
        result.splits.len()
    ));
    out.push_str(&format!(
        "  Duração: {} -> {} dias\n",
        result.original_duration, result.optimized_duration
    ));
    out.push_str(&format!(
        "  Pico de trabalhadores: {} -> {} (ganho {:.1}%)\n",
        result.peak_workers_before, result.peak_workers_after, result.efficiency_gain
    ));

    if !result.bottlenecks.is_empty() {
        out.push_str(&format!("\nGargalos ({}):\n", result.bottlenecks.len()));
        for b in &result.bottlenecks {
            let status = if b.resolved { " [resolvido]" } else { "" };
            out.push_str(&format!(
                "  [{}] {}: {}{}\n",
                kind_label(b.kind),
                b.date_range,
                b.reason,
                status
            ));
        }
    }

    if !result.adjustments.is_empty() {
        out.push_str(&format!("\nAjustes ({}):\n", result.adjustments.len()));
        for a in &result.adjustments {
            out.push_str(&format!(
                "  #{} {} -> {} (+{} dias): {}\n",
                a.task_uid,
                a.original_start,
                a.new_start,
                a.days_shifted(),
                a.reason
            ));
        }
    }

    if !result.splits.is_empty() {
        out.push_str(&format!("\nDivisões ({}):\n", result.splits.len()));
        for s in &result.splits {
            out.push_str(&format!(
                "  #{} -> #{} + #{}\n",
                s.original_uid, s.part1_uid, s.part2_uid
            ));
        }
    }

    out.push_str("\nSugestões:\n");
    for s in &result.suggestions {
        out.push_str(&format!("  - {}: {}\n", s.title, s.description));
    }

    out
}

/// One bar per active day; days above `limit` are flagged
pub fn render_histogram(histogram: &BTreeMap<NaiveDate, u32>, limit: u32) -> String {
    let stats = histogram_stats(histogram);
    if stats.peak_workers == 0 {
        return "Nenhuma tarefa ativa.\n".to_string();
    }

    let mut out = String::new();
    for (date, &workers) in histogram {
        let len =
            (u64::from(workers) * u64::from(BAR_WIDTH)).div_ceil(u64::from(stats.peak_workers));
        let bar = "#".repeat(usize::try_from(len).unwrap_or(0));
        let flag = if workers > limit { " !" } else { "" };
        out.push_str(&format!("{date} {workers:>4} {bar}{flag}\n"));
    }

    let peak_day = stats
        .peak_day
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    out.push_str(&format!(
        "\nPico: {} trabalhadores em {} | média {:.1} | {} dias ativos | limite {}\n",
        stats.peak_workers, peak_day, stats.average_workers, stats.active_days, limit
    ));
    for period in overload_periods(histogram, limit) {
        out.push_str(&format!(
            "Acima do limite: {} a {} (pico {})\n",
            period.start, period.end, period.peak
        ));
    }
    out
}
