use crate::error::Result;
use crate::events::WindowId;
use crate::services::ledger::{Applier, Ledger, MATCH_OFFSET};
use crate::services::rule_table::RuleTable;
use crate::services::transport::Transport;
use crate::trace_if_enabled;
use std::collections::HashSet;
use tracing::{debug, info};

/// Полное совпадение пути правила с окном
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullMatch {
    pub rule: usize,
    pub window: WindowId,
    /// Окно-затравка, от которого начинался спуск
    pub seed: WindowId,
}

#[derive(Debug, Clone, Copy)]
struct FrontierWindow {
    window: WindowId,
    seed: WindowId,
}

/// State of one multi-round walk down the window tree.
///
/// Each [`MatchPass::step`] handles one depth: all WM_CLASS requests for the
/// frontier go out before any reply is read, surviving candidates are kept in
/// their original order, and the children of partially matched windows form
/// the next frontier.
#[derive(Debug)]
pub struct MatchPass {
    depth: usize,
    candidates: Vec<usize>,
    frontier: Vec<FrontierWindow>,
}

impl MatchPass {
    pub fn new(rules: &RuleTable, seeds: &[WindowId]) -> Self {
        Self {
            depth: 0,
            candidates: (0..rules.len()).collect(),
            frontier: seeds
                .iter()
                .map(|&window| FrontierWindow { window, seed: window })
                .collect(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.frontier.is_empty() || self.candidates.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn step<T: Transport>(&mut self, rules: &RuleTable, transport: &mut T) -> Result<Vec<FullMatch>> {
        let windows: Vec<WindowId> = self.frontier.iter().map(|entry| entry.window).collect();
        let classes = transport.query_classes(&windows)?;

        let mut alive = vec![false; self.candidates.len()];
        let mut matches = Vec::new();
        let mut descend = Vec::new();
        let mut descend_seen = HashSet::new();

        for (entry, class) in self.frontier.iter().zip(classes) {
            let Some(class) = class else {
                trace_if_enabled!("Окно 0x{:x} без WM_CLASS, пропускаем", entry.window);
                continue;
            };

            for (slot, &rule_index) in self.candidates.iter().enumerate() {
                let Some(rule) = rules.get(rule_index) else {
                    continue;
                };
                if rule.path.label(self.depth) != Some(class.label()) {
                    continue;
                }

                alive[slot] = true;
                if rule.path.is_last(self.depth) {
                    debug!("Правило '{}' совпало с окном 0x{:x} {}", rule.path, entry.window, class);
                    matches.push(FullMatch {
                        rule: rule_index,
                        window: entry.window,
                        seed: entry.seed,
                    });
                } else if descend_seen.insert(entry.window) {
                    descend.push(*entry);
                }
            }
        }

        self.candidates = self
            .candidates
            .iter()
            .zip(&alive)
            .filter(|(_, &confirmed)| confirmed)
            .map(|(&rule_index, _)| rule_index)
            .collect();

        self.frontier = if descend.is_empty() {
            Vec::new()
        } else {
            let parents: Vec<WindowId> = descend.iter().map(|entry| entry.window).collect();
            let children = transport.query_children(&parents)?;

            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for (parent, kids) in descend.iter().zip(children) {
                for window in kids {
                    if seen.insert(window) {
                        next.push(FrontierWindow { window, seed: parent.seed });
                    }
                }
            }
            next
        };

        self.depth += 1;
        Ok(matches)
    }
}

/// Итог прохода сопоставления
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub matches: usize,
    /// Затравки, от которых найдено хотя бы одно полное совпадение (без повторов)
    pub matched_seeds: Vec<WindowId>,
}

/// Run a full matcher pass from `seeds`, handing every full match to the ledger.
pub fn run_pass<T: Transport>(
    rules: &RuleTable,
    ledger: &mut Ledger,
    transport: &mut T,
    seeds: &[WindowId],
) -> Result<PassReport> {
    let mut report = PassReport::default();
    if rules.is_empty() || seeds.is_empty() {
        return Ok(report);
    }

    let applier = Applier::new(MATCH_OFFSET);
    let mut pass = MatchPass::new(rules, seeds);
    while !pass.is_done() {
        for found in pass.step(rules, transport)? {
            if let Some(rule) = rules.get(found.rule) {
                applier.apply_all(ledger, transport, found.window, &rule.actions)?;
            }
            report.matches += 1;
            if !report.matched_seeds.contains(&found.seed) {
                report.matched_seeds.push(found.seed);
            }
        }
    }
    transport.flush()?;

    if report.matches > 0 {
        info!(
            "Проход по {} окнам: {} совпадений, глубина {}",
            seeds.len(),
            report.matches,
            pass.depth()
        );
    }
    Ok(report)
}
