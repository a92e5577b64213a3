//! Localized remediation suggestions (pt-BR)

use std::collections::BTreeSet;

use canteiro_core::{
    Adjustment, Bottleneck, BottleneckKind, Constraints, ProjectResources, SplitRecord, Suggestion,
};

/// Turn the run's findings into suggestions for the site manager.
///
/// With no bottlenecks at all a single baseline suggestion is returned.
pub fn generate_suggestions(
    bottlenecks: &[Bottleneck],
    adjustments: &[Adjustment],
    splits: &[SplitRecord],
    resources: &ProjectResources,
    constraints: &Constraints,
) -> Vec<Suggestion> {
    if bottlenecks.is_empty() {
        return vec![Suggestion::new(
            "Cronograma otimizado",
            "Nenhum gargalo encontrado: o cronograma respeita os limites de mão de obra, equipamentos e sequenciamento de fases.",
        )];
    }

    let mut suggestions = Vec::new();

    let overloads: Vec<&Bottleneck> = bottlenecks
        .iter()
        .filter(|b| b.kind == BottleneckKind::WorkforceOverload)
        .collect();
    if let Some(peak) = overloads.iter().map(|b| b.peak).max() {
        let available = resources.total_labor();
        let mut description = format!(
            "{} período(s) acima do limite de {} trabalhadores, com pico de {}. Redistribua as equipes entre pavimentos ou escalone turnos.",
            overloads.len(),
            constraints.max_workers_per_floor,
            peak
        );
        if available > 0 {
            description.push_str(&format!(
                " Mão de obra disponível no projeto: {available} trabalhadores."
            ));
        }
        suggestions.push(Suggestion::new("Redistribuir equipes", description));
    }

    let mut seen_equipment = BTreeSet::new();
    for bottleneck in bottlenecks
        .iter()
        .filter(|b| b.kind == BottleneckKind::EquipmentConflict)
    {
        let Some(name) = bottleneck.equipment.as_deref() else {
            continue;
        };
        if !seen_equipment.insert(name.to_lowercase()) {
            continue;
        }
        let mut description = format!(
            "{} é disputado por {} tarefas simultâneas em {}. Escalone o uso entre as fases ou alugue uma unidade adicional.",
            name, bottleneck.peak, bottleneck.date_range
        );
        if let Some(owned) = resources.equipment_quantity(name) {
            description.push_str(&format!(" Unidades disponíveis: {owned}."));
        }
        suggestions.push(Suggestion::new(format!("Compartilhar {name}"), description));
    }

    for bottleneck in bottlenecks
        .iter()
        .filter(|b| b.kind == BottleneckKind::PhaseSequencing && !b.resolved)
    {
        let phases: Vec<String> = bottleneck.phases.iter().map(ToString::to_string).collect();
        suggestions.push(Suggestion::new(
            format!("Resequenciar {}", phases.join(" → ")),
            format!(
                "Não há folga suficiente para respeitar o intervalo entre as fases. Revise as dependências ou aceite a extensão do prazo. {}",
                bottleneck.reason
            ),
        ));
    }

    if !adjustments.is_empty() || !splits.is_empty() {
        let shifted: BTreeSet<_> = adjustments.iter().map(|a| a.task_uid).collect();
        suggestions.push(Suggestion::new(
            "Ajustes aplicados",
            format!(
                "{} tarefa(s) deslocada(s) dentro da folga e {} tarefa(s) dividida(s) em duas partes. Revise as novas datas com as equipes.",
                shifted.len(),
                splits.len()
            ),
        ));
    }

    suggestions
}
