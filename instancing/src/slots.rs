//! Slot allocation, deferred removal and compaction.
//!
//! The slot pool keeps the ordered member list (`members[i]` occupies slot
//! `i` in every channel), an identity index for constant-time lookup, and
//! the set of members waiting to be removed. Removal is two-phase: a mark
//! costs nothing and leaves the slot in place until the next compaction,
//! unless an add reuses the slot first.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::channel::Channel;
use crate::error::PoolError;
use crate::member::MemberId;

/// How an added member obtained its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A new slot at the end of the active range.
    Appended,
    /// The slot of the oldest member pending removal.
    Reused,
    /// The member was already active and keeps its slot.
    Existing,
}

/// Result of [`SlotPool::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub slot: usize,
    pub kind: SlotKind,
}

/// Slot bookkeeping shared by every channel of a pool.
#[derive(Debug, Clone, Default)]
pub struct SlotPool {
    members: Vec<MemberId>,
    index: HashMap<MemberId, usize>,
    pending_order: VecDeque<MemberId>,
    pending: HashSet<MemberId>,
    capacity: usize,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots, including those pending removal.
    pub fn active_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in slot order.
    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    /// Members pending removal, oldest mark first.
    pub fn pending_removals(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.pending_order.iter().copied()
    }

    pub fn has_pending_removals(&self) -> bool {
        !self.pending_order.is_empty()
    }

    pub fn is_pending(&self, member: MemberId) -> bool {
        self.pending.contains(&member)
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.index.contains_key(&member)
    }

    pub fn slot_of(&self, member: MemberId) -> Result<usize, PoolError> {
        self.index
            .get(&member)
            .copied()
            .ok_or(PoolError::MemberNotFound(member))
    }

    /// Assigns a slot to `member`.
    ///
    /// Reuses the slot of the oldest pending removal if there is one, else
    /// appends. A member that is already active keeps its slot, and if it
    /// was itself marked for removal the mark is withdrawn.
    pub fn add(&mut self, member: MemberId) -> Result<SlotAssignment, PoolError> {
        if let Some(&slot) = self.index.get(&member) {
            if self.pending.remove(&member) {
                self.pending_order.retain(|m| *m != member);
            }
            return Ok(SlotAssignment {
                slot,
                kind: SlotKind::Existing,
            });
        }

        while let Some(stale) = self.pending_order.pop_front() {
            self.pending.remove(&stale);
            if let Some(slot) = self.index.remove(&stale) {
                self.members[slot] = member;
                self.index.insert(member, slot);
                return Ok(SlotAssignment {
                    slot,
                    kind: SlotKind::Reused,
                });
            }
        }

        if self.members.len() >= self.capacity {
            return Err(PoolError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let slot = self.members.len();
        self.members.push(member);
        self.index.insert(member, slot);
        Ok(SlotAssignment {
            slot,
            kind: SlotKind::Appended,
        })
    }

    /// Marks an active member for removal at the next compaction.
    ///
    /// Returns `Ok(false)` if the member was already marked.
    pub fn mark_for_removal(&mut self, member: MemberId) -> Result<bool, PoolError> {
        if !self.index.contains_key(&member) {
            return Err(PoolError::MemberNotFound(member));
        }
        if !self.pending.insert(member) {
            return Ok(false);
        }
        self.pending_order.push_back(member);
        debug_assert_eq!(self.pending.len(), self.pending_order.len());
        Ok(true)
    }

    /// Evicts every pending member in one stable pass.
    ///
    /// Survivors keep their relative order and slide left over the removed
    /// slots in the member list and in every channel. Returns the number of
    /// members removed.
    pub fn compact(&mut self, channels: &mut [Channel]) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let mut removed = 0;
        for cursor in 0..self.members.len() {
            let member = self.members[cursor];
            if self.pending.contains(&member) {
                self.index.remove(&member);
                removed += 1;
                continue;
            }
            if removed > 0 {
                let target = cursor - removed;
                self.members[target] = member;
                self.index.insert(member, target);
                for channel in channels.iter_mut() {
                    channel.copy_slot(cursor, target);
                }
            }
        }

        let active = self.members.len() - removed;
        self.members.truncate(active);
        for channel in channels.iter_mut() {
            channel.set_active_count(active);
        }
        self.pending.clear();
        self.pending_order.clear();
        removed
    }

    /// Changes the slot ceiling without touching any assignment.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), PoolError> {
        if capacity < self.members.len() {
            return Err(PoolError::InvalidCapacity {
                requested: capacity,
                active: self.members.len(),
            });
        }
        self.capacity = capacity;
        Ok(())
    }
}
