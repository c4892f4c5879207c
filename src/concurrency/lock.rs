//! Lock records and per-page holder state.

use std::collections::HashSet;

use crate::common::{Permission, TransactionId};

/// One transaction's hold on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lock {
    pub tid: TransactionId,
    pub perm: Permission,
}

/// Who holds a page.
///
/// Shared and exclusive holders can't be mixed: the variant itself rules
/// out a ReadWrite holder coexisting with ReadOnly holders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    /// One or more ReadOnly holders. Never empty.
    Shared(HashSet<TransactionId>),
    /// Exactly one ReadWrite holder.
    Exclusive(TransactionId),
}

impl LockState {
    /// Permission `tid` holds under this state, if any.
    pub fn mode_of(&self, tid: TransactionId) -> Option<Permission> {
        match self {
            LockState::Unlocked => None,
            LockState::Shared(holders) if holders.contains(&tid) => Some(Permission::ReadOnly),
            LockState::Shared(_) => None,
            LockState::Exclusive(holder) if *holder == tid => Some(Permission::ReadWrite),
            LockState::Exclusive(_) => None,
        }
    }

    /// Expand into individual lock records.
    pub fn locks(&self) -> Vec<Lock> {
        match self {
            LockState::Unlocked => Vec::new(),
            LockState::Shared(holders) => holders
                .iter()
                .map(|&tid| Lock {
                    tid,
                    perm: Permission::ReadOnly,
                })
                .collect(),
            LockState::Exclusive(tid) => vec![Lock {
                tid: *tid,
                perm: Permission::ReadWrite,
            }],
        }
    }

    /// Number of transactions holding the page.
    pub fn holder_count(&self) -> usize {
        match self {
            LockState::Unlocked => 0,
            LockState::Shared(holders) => holders.len(),
            LockState::Exclusive(_) => 1,
        }
    }

    #[inline]
    pub fn is_unlocked(&self) -> bool {
        matches!(self, LockState::Unlocked)
    }
}
