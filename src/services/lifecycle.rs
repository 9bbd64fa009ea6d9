use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{LifecycleKind, WindowEvent, WindowId};
use crate::services::actions::{Action, ServerGrab};
use crate::services::ledger::Ledger;
use crate::services::matcher::{run_pass, PassReport};
use crate::services::rule_table::{ClassPath, RuleTable};
use crate::services::transport::Transport;
use std::collections::HashMap;
use tracing::{debug, info};

/// Поведение сессии, настраиваемое из конфигурации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// ReparentNotify считается сигналом Unmap для окна
    pub reparent_as_unmap: bool,
    /// Начальный обход выполняется под захватом сервера
    pub grab_during_scan: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reparent_as_unmap: true,
            grab_during_scan: true,
        }
    }
}

/// Окна, уже сопоставленные один раз: представитель -> затравка
#[derive(Debug, Default)]
pub struct MatchedSet {
    representatives: HashMap<WindowId, WindowId>,
}

impl MatchedSet {
    pub fn contains(&self, representative: WindowId) -> bool {
        self.representatives.contains_key(&representative)
    }

    pub fn insert(&mut self, representative: WindowId, seed: WindowId) {
        self.representatives.insert(representative, seed);
    }

    /// Забыть окно, записанное как представитель или как затравка
    pub fn forget(&mut self, window: WindowId) -> bool {
        let before = self.representatives.len();
        self.representatives
            .retain(|&representative, &mut seed| representative != window && seed != window);
        before != self.representatives.len()
    }

    pub fn len(&self) -> usize {
        self.representatives.len()
    }
}

/// Окно вместе со всеми потомками и выбранным представителем
#[derive(Debug, Clone, PartialEq, Eq)]
struct WindowFamily {
    representative: WindowId,
    members: Vec<WindowId>,
}

/// The single owner of the engine state and of the protocol session.
///
/// Rule ingestion, the startup scan and event dispatch all take `&mut self`,
/// so callers sharing a session across tasks serialize them behind one lock.
pub struct Session<T: Transport> {
    transport: T,
    rules: RuleTable,
    ledger: Ledger,
    matched: MatchedSet,
    options: SessionOptions,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        info!("Инициализация сессии: {:?}", options);
        Self {
            transport,
            rules: RuleTable::new(),
            ledger: Ledger::new(),
            matched: MatchedSet::default(),
            options,
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.len()
    }

    /// Добавить правило; при ошибке состояние не меняется
    pub fn add_rule(&mut self, labels: Vec<String>, actions: Vec<Action>) -> Result<()> {
        let path = ClassPath::new(labels)?;
        self.rules.add(path, actions)
    }

    /// Сопоставить уже существующие окна и отметить найденных представителей
    pub fn start_scan(&mut self) -> Result<PassReport> {
        info!("Начальный обход дерева окон ({} правил)", self.rules.len());

        let (report, representatives) = if self.options.grab_during_scan {
            let mut grab = ServerGrab::new(&mut self.transport)?;
            scan(&self.rules, &mut self.ledger, &mut *grab)?
        } else {
            scan(&self.rules, &mut self.ledger, &mut self.transport)?
        };

        for (representative, seed) in representatives {
            self.matched.insert(representative, seed);
        }

        info!(
            "Начальный обход завершён: {} совпадений, {} окон отмечено, {} действий ожидают событий",
            report.matches,
            self.matched.len(),
            self.ledger.len()
        );
        Ok(report)
    }

    /// Разобрать всё, что сейчас есть в очереди соединения
    pub fn dispatch_events(&mut self) -> Result<usize> {
        let events = self.transport.poll_events()?;
        let count = events.len();
        for event in events {
            self.handle_event(event)?;
        }
        if count > 0 {
            self.transport.flush()?;
        }
        Ok(count)
    }

    pub fn handle_event(&mut self, event: WindowEvent) -> Result<()> {
        debug_if_enabled!("Событие: {}", event);

        match event {
            WindowEvent::Map { window } => {
                let family = self.family(window)?;
                self.ledger
                    .flush(&mut self.transport, LifecycleKind::Map, &family.members)?;

                if self.matched.contains(family.representative) {
                    debug_if_enabled!(
                        "Окно 0x{:x} уже сопоставлено (представитель 0x{:x})",
                        window,
                        family.representative
                    );
                    return Ok(());
                }

                run_pass(&self.rules, &mut self.ledger, &mut self.transport, &[window])?;
                self.matched.insert(family.representative, window);
            }
            WindowEvent::Unmap { window } => {
                let family = self.family(window)?;
                self.ledger
                    .flush(&mut self.transport, LifecycleKind::Unmap, &family.members)?;
            }
            WindowEvent::Reparent { window, parent } => {
                if !self.options.reparent_as_unmap {
                    debug!("Reparent 0x{:x} -> 0x{:x} игнорируется", window, parent);
                    return Ok(());
                }
                let family = self.family(window)?;
                self.ledger
                    .flush(&mut self.transport, LifecycleKind::Unmap, &family.members)?;
            }
            WindowEvent::Destroy { window } => {
                if self.matched.forget(window) {
                    debug!("Окно 0x{:x} уничтожено, сопоставление сброшено", window);
                }
            }
            WindowEvent::Other => {}
        }
        Ok(())
    }

    /// Окно, все его потомки (по уровням, запросы каждого уровня пакетом)
    /// и представитель: первый ребёнок, если он есть
    fn family(&mut self, window: WindowId) -> Result<WindowFamily> {
        let mut members = vec![window];
        let mut representative = window;
        let mut level = vec![window];
        let mut top = true;

        while !level.is_empty() {
            let next: Vec<WindowId> = self
                .transport
                .query_children(&level)?
                .into_iter()
                .flatten()
                .collect();
            if top {
                if let Some(&first) = next.first() {
                    representative = first;
                }
                top = false;
            }
            members.extend_from_slice(&next);
            level = next;
        }

        Ok(WindowFamily {
            representative,
            members,
        })
    }
}

/// Обход детей всех корней; возвращает пары (представитель, затравка)
/// для затравок с хотя бы одним совпадением
fn scan<U: Transport>(
    rules: &RuleTable,
    ledger: &mut Ledger,
    transport: &mut U,
) -> Result<(PassReport, Vec<(WindowId, WindowId)>)> {
    let roots = transport.roots();
    let seeds: Vec<WindowId> = transport
        .query_children(&roots)?
        .into_iter()
        .flatten()
        .collect();
    debug!("Корней: {}, окон верхнего уровня: {}", roots.len(), seeds.len());

    let report = run_pass(rules, ledger, transport, &seeds)?;
    if report.matched_seeds.is_empty() {
        return Ok((report, Vec::new()));
    }

    let representatives = transport
        .query_children(&report.matched_seeds)?
        .into_iter()
        .zip(&report.matched_seeds)
        .map(|(children, &seed)| (children.first().copied().unwrap_or(seed), seed))
        .collect();
    Ok((report, representatives))
}
