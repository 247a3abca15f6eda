//! Shared state between the bridge tasks.
//!
//! * [`ParameterCache`]: raw BMS data written by the poller and read by the
//!   responder and any external consumer, split into a fast and a slow
//!   partition.
//! * [`EscStatusTable`]: raw data of unsolicited ESC Status frames, written by
//!   the responder and read only by external consumers.
//!
//! Both wrap their state in an [`embassy_sync::blocking_mutex::Mutex`]. Every
//! access is a short synchronous closure, so a reader can never observe an
//! entry halfway through an overwrite and no `.await` ever happens while the
//! lock is held. Firmware typically places them in a `static`; no allocation
//! is performed.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{
    raw::{CriticalSectionRawMutex, RawMutex},
    Mutex,
};
use heapless::FnvIndexMap;

use crate::core::Payload;
use crate::error::CacheError;

/// Identifiers per cache partition. Covers the whole BMS catalog.
pub const PARTITION_CAPACITY: usize = 32;

/// Distinct ESC Status identifiers remembered.
pub const ESC_STATUS_CAPACITY: usize = 16;

//==================================================================================PARTITION
/// Refresh-rate partition of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Partition {
    /// Refreshed every poller cycle.
    Fast,
    /// Refreshed every `slow_divider` cycles.
    Slow,
}

/// Raw parameter data and the time it was last read from the BMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub data: Payload,
    pub refreshed_at_ms: u64,
}

impl CacheEntry {
    /// Age at `now_ms`; zero if the clock reads earlier than the refresh.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.refreshed_at_ms)
    }
}

type EntryMap = FnvIndexMap<u8, CacheEntry, PARTITION_CAPACITY>;

struct PartitionState {
    entries: EntryMap,
    /// Set on every store, cleared by `take_updated`.
    updated: bool,
}

impl PartitionState {
    const fn new() -> Self {
        Self {
            entries: EntryMap::new(),
            updated: false,
        }
    }
}

struct CacheState {
    fast: PartitionState,
    slow: PartitionState,
    last_update_ms: Option<u64>,
}

impl CacheState {
    fn partition(&self, partition: Partition) -> &PartitionState {
        match partition {
            Partition::Fast => &self.fast,
            Partition::Slow => &self.slow,
        }
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut PartitionState {
        match partition {
            Partition::Fast => &mut self.fast,
            Partition::Slow => &mut self.slow,
        }
    }
}

//==================================================================================PARAMETER_CACHE
/// Latest raw BMS data per parameter, one map per partition.
///
/// Entries are only ever inserted or overwritten; absence means the parameter
/// was never read successfully since startup.
pub struct ParameterCache<M: RawMutex = CriticalSectionRawMutex> {
    state: Mutex<M, RefCell<CacheState>>,
}

impl<M: RawMutex> Default for ParameterCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> ParameterCache<M> {
    /// Empty cache; usable in a `static` initialiser.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(CacheState {
                fast: PartitionState::new(),
                slow: PartitionState::new(),
                last_update_ms: None,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Overwrite (or create) the entry of `parameter` in `partition`.
    pub fn store(
        &self,
        partition: Partition,
        parameter: u8,
        data: &[u8],
        now_ms: u64,
    ) -> Result<(), CacheError> {
        let data =
            Payload::from_slice(data).map_err(|_| CacheError::PayloadTooLong { len: data.len() })?;
        let entry = CacheEntry {
            data,
            refreshed_at_ms: now_ms,
        };

        self.with_state(|state| {
            let target = state.partition_mut(partition);
            target
                .entries
                .insert(parameter, entry)
                .map_err(|_| CacheError::PartitionFull { parameter })?;
            target.updated = true;
            state.last_update_ms = Some(now_ms);
            Ok(())
        })
    }

    /// Copy of the entry of `parameter` in `partition`.
    pub fn get(&self, partition: Partition, parameter: u8) -> Option<CacheEntry> {
        self.with_state(|state| state.partition(partition).entries.get(&parameter).cloned())
    }

    /// Look in the fast partition first, then in the slow one.
    pub fn lookup(&self, parameter: u8) -> Option<CacheEntry> {
        self.with_state(|state| {
            state
                .fast
                .entries
                .get(&parameter)
                .or_else(|| state.slow.entries.get(&parameter))
                .cloned()
        })
    }

    /// Time of the most recent store into either partition.
    pub fn last_update_ms(&self) -> Option<u64> {
        self.with_state(|state| state.last_update_ms)
    }

    /// Whether `partition` changed since the previous call; clears the flag.
    pub fn take_updated(&self, partition: Partition) -> bool {
        self.with_state(|state| core::mem::take(&mut state.partition_mut(partition).updated))
    }

    /// Number of parameters stored in `partition`.
    pub fn len(&self, partition: Partition) -> usize {
        self.with_state(|state| state.partition(partition).entries.len())
    }

    pub fn is_empty(&self, partition: Partition) -> bool {
        self.len(partition) == 0
    }

    /// Visit every entry of `partition` under the lock.
    ///
    /// `f` must stay short: the other task cannot touch the cache meanwhile.
    pub fn for_each(&self, partition: Partition, mut f: impl FnMut(u8, &CacheEntry)) {
        self.with_state(|state| {
            for (parameter, entry) in state.partition(partition).entries.iter() {
                f(*parameter, entry);
            }
        })
    }
}

//==================================================================================ESC_STATUS
struct EscStatusState {
    entries: FnvIndexMap<u8, Payload, ESC_STATUS_CAPACITY>,
    updated: bool,
}

/// Latest payload of each Status frame the ESC broadcast.
pub struct EscStatusTable<M: RawMutex = CriticalSectionRawMutex> {
    state: Mutex<M, RefCell<EscStatusState>>,
}

impl<M: RawMutex> Default for EscStatusTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> EscStatusTable<M> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(EscStatusState {
                entries: FnvIndexMap::new(),
                updated: false,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EscStatusState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Remember `data` for `parameter` and flag the table as updated.
    pub fn record(&self, parameter: u8, data: &[u8]) -> Result<(), CacheError> {
        let data =
            Payload::from_slice(data).map_err(|_| CacheError::PayloadTooLong { len: data.len() })?;

        self.with_state(|state| {
            state
                .entries
                .insert(parameter, data)
                .map_err(|_| CacheError::PartitionFull { parameter })?;
            state.updated = true;
            Ok(())
        })
    }

    pub fn get(&self, parameter: u8) -> Option<Payload> {
        self.with_state(|state| state.entries.get(&parameter).cloned())
    }

    /// Whether new Status data arrived since the previous call; clears the flag.
    pub fn take_updated(&self) -> bool {
        self.with_state(|state| core::mem::take(&mut state.updated))
    }

    pub fn len(&self) -> usize {
        self.with_state(|state| state.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
