use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{LifecycleKind, WindowId};
use crate::services::actions::Action;
use crate::services::transport::Transport;
use smallvec::SmallVec;
use tracing::{debug, info};

/// Offset for a fresh matcher pass: every pending entry is "in front".
pub const MATCH_OFFSET: usize = 0;

/// Offset while flushing: the firing entry sits at index 0 and is skipped.
pub const FLUSH_OFFSET: usize = 1;

/// Ключ записи: какое событие и для какого окна ожидается
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub kind: LifecycleKind,
    pub window: WindowId,
}

#[derive(Debug)]
struct LedgerEntry {
    key: LedgerKey,
    deferred: SmallVec<[(WindowId, Action); 4]>,
}

/// Ordered store of actions waiting for a Map/Unmap to be observed.
///
/// Entries are created when a Map/Unmap action is sent and removed only when
/// the matching lifecycle event flushes them. Nothing expires: an entry whose
/// event never arrives stays until the process exits.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn keys(&self) -> Vec<LedgerKey> {
        self.entries.iter().map(|entry| entry.key).collect()
    }

    /// Количество отложенных действий в записи с данным ключом (первой такой)
    #[cfg(test)]
    pub fn deferred_len(&self, key: LedgerKey) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.deferred.len())
    }

    fn open(&mut self, key: LedgerKey) {
        debug_if_enabled!("Открыта запись {} для окна 0x{:x}", key.kind, key.window);
        self.entries.push(LedgerEntry {
            key,
            deferred: SmallVec::new(),
        });
    }

    /// Запись, в которую надо отложить действие для окна, если она есть
    fn in_front(&mut self, offset: usize, window: WindowId) -> Option<&mut LedgerEntry> {
        self.entries
            .iter_mut()
            .skip(offset)
            .find(|entry| entry.key.window == window)
    }

    /// Flush the first entry of `kind` keyed on any window of `equivalent`.
    ///
    /// The firing entry is moved to the front, its deferred actions are applied
    /// with [`FLUSH_OFFSET`] and only then is it removed. At most one entry is
    /// flushed per call. Returns whether anything fired.
    pub fn flush<T: Transport>(
        &mut self,
        transport: &mut T,
        kind: LifecycleKind,
        equivalent: &[WindowId],
    ) -> Result<bool> {
        let Some(position) = self
            .entries
            .iter()
            .position(|entry| entry.key.kind == kind && equivalent.contains(&entry.key.window))
        else {
            return Ok(false);
        };

        self.entries[..=position].rotate_right(1);
        let deferred = std::mem::take(&mut self.entries[0].deferred);
        info!(
            "{} для 0x{:x}: применяем {} отложенных действий",
            kind,
            self.entries[0].key.window,
            deferred.len()
        );

        let outcome = self.apply_deferred(transport, deferred);
        self.entries.remove(0);
        outcome.map(|()| true)
    }

    fn apply_deferred<T: Transport>(
        &mut self,
        transport: &mut T,
        deferred: SmallVec<[(WindowId, Action); 4]>,
    ) -> Result<()> {
        let applier = Applier::new(FLUSH_OFFSET);
        for (window, action) in deferred {
            applier.apply(self, transport, window, action)?;
        }
        Ok(())
    }
}

/// Применяет действия через журнал: всё, что стоит за ожидаемым Map/Unmap
/// того же окна, откладывается до этого события.
#[derive(Debug, Clone, Copy)]
pub struct Applier {
    offset: usize,
}

impl Applier {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    pub fn apply<T: Transport>(
        &self,
        ledger: &mut Ledger,
        transport: &mut T,
        window: WindowId,
        action: Action,
    ) -> Result<()> {
        if let Some(entry) = ledger.in_front(self.offset, window) {
            debug!(
                "{} для 0x{:x} отложено до {} 0x{:x}",
                action, window, entry.key.kind, entry.key.window
            );
            entry.deferred.push((window, action));
            return Ok(());
        }

        if let Some(kind) = action.execute(transport, window)? {
            ledger.open(LedgerKey { kind, window });
        }
        Ok(())
    }

    /// Применить список действий правила к одному окну по порядку
    pub fn apply_all<T: Transport>(
        &self,
        ledger: &mut Ledger,
        transport: &mut T,
        window: WindowId,
        actions: &[Action],
    ) -> Result<()> {
        for action in actions {
            self.apply(ledger, transport, window, action.clone())?;
        }
        Ok(())
    }
}
