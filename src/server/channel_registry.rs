use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::connection_handle::ConnectionHandle;
use crate::protocol::{ChannelCode, ConnectionId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {connection_id} already belongs to channel `{current}`")]
    AlreadyInOtherChannel {
        connection_id: ConnectionId,
        current: ChannelCode,
    },
}

/// Result of a successful [`ChannelRegistry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First member of a new channel
    Created,
    /// Added to an existing channel
    Joined,
    /// Already a member of this channel; nothing changed
    AlreadyMember,
}

impl JoinOutcome {
    pub fn is_new_membership(self) -> bool {
        !matches!(self, Self::AlreadyMember)
    }
}

/// Result of a [`ChannelRegistry::leave`] that removed a membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub code: ChannelCode,
    /// The departing handle was the last member and the channel is gone
    pub channel_removed: bool,
}

#[derive(Default)]
struct RegistryInner {
    // Members in join order.
    channels: HashMap<ChannelCode, Vec<ConnectionHandle>>,
    memberships: HashMap<ConnectionId, ChannelCode>,
}

/// Channel code to member set, guarded by a single mutex.
///
/// No channel with zero members is ever stored, and a connection is a member
/// of at most one channel. The lock is never held across an await.
#[derive(Default)]
pub struct ChannelRegistry {
    inner: Mutex<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Poisoning is ignored: every critical section leaves both maps consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self, code: &str, handle: &ConnectionHandle) -> Result<JoinOutcome, RegistryError> {
        self.join_with(code, handle, |_| {})
    }

    /// Join and, still under the lock, hand the previous members to `on_joined`.
    ///
    /// `on_joined` runs only when a new membership was created. Anything it
    /// enqueues is ordered consistently with every other join and leave.
    pub fn join_with<F>(
        &self,
        code: &str,
        handle: &ConnectionHandle,
        on_joined: F,
    ) -> Result<JoinOutcome, RegistryError>
    where
        F: FnOnce(&[ConnectionHandle]),
    {
        let mut inner = self.lock();
        let id = handle.id();

        if let Some(current) = inner.memberships.get(&id) {
            if current == code {
                return Ok(JoinOutcome::AlreadyMember);
            }
            return Err(RegistryError::AlreadyInOtherChannel {
                connection_id: id,
                current: current.clone(),
            });
        }

        let RegistryInner {
            channels,
            memberships,
        } = &mut *inner;

        let outcome = if channels.contains_key(code) {
            JoinOutcome::Joined
        } else {
            JoinOutcome::Created
        };
        let members = channels.entry(code.to_string()).or_default();
        on_joined(members.as_slice());
        members.push(handle.clone());
        memberships.insert(id, code.to_string());

        Ok(outcome)
    }

    /// Remove the handle from its channel. Not being a member is not an error.
    pub fn leave(&self, handle: &ConnectionHandle) -> Option<Departure> {
        self.leave_with(handle, |_, _| {})
    }

    /// Leave and, still under the lock, hand the remaining members to `on_left`.
    ///
    /// `on_left` is skipped when the handle belonged to no channel or was the last member.
    pub fn leave_with<F>(&self, handle: &ConnectionHandle, on_left: F) -> Option<Departure>
    where
        F: FnOnce(&str, &[ConnectionHandle]),
    {
        let mut inner = self.lock();
        let id = handle.id();
        let code = inner.memberships.remove(&id)?;

        let remaining = match inner.channels.get_mut(&code) {
            Some(members) => {
                members.retain(|member| member.id() != id);
                members.len()
            }
            None => 0,
        };

        let channel_removed = remaining == 0;
        if channel_removed {
            inner.channels.remove(&code);
        } else if let Some(members) = inner.channels.get(&code) {
            on_left(code.as_str(), members.as_slice());
        }

        Some(Departure {
            code,
            channel_removed,
        })
    }

    /// Snapshot of the members of `code`, in join order. Empty for unknown codes.
    pub fn members_of(&self, code: &str) -> Vec<ConnectionHandle> {
        self.lock().channels.get(code).cloned().unwrap_or_default()
    }

    pub fn channel_of(&self, id: &ConnectionId) -> Option<ChannelCode> {
        self.lock().memberships.get(id).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.lock().channels.len()
    }

    /// Connections currently joined to any channel.
    pub fn member_count(&self) -> usize {
        self.lock().memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().channels.is_empty()
    }

    pub fn channel_codes(&self) -> Vec<ChannelCode> {
        self.lock().channels.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn handle() -> (ConnectionHandle, mpsc::Receiver<Arc<ServerMessage>>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn join_creates_channel_and_is_idempotent() {
        let registry = ChannelRegistry::new();
        let (a, _ra) = handle();

        assert_eq!(registry.join("ABC", &a), Ok(JoinOutcome::Created));
        assert_eq!(registry.join("ABC", &a), Ok(JoinOutcome::AlreadyMember));
        assert_eq!(registry.members_of("ABC").len(), 1);
        assert_eq!(registry.channel_of(&a.id()).as_deref(), Some("ABC"));
    }

    #[test]
    fn join_rejects_second_channel() {
        let registry = ChannelRegistry::new();
        let (a, _ra) = handle();

        registry.join("ABC", &a).unwrap();
        let err = registry.join("XYZ", &a).unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyInOtherChannel {
                connection_id: a.id(),
                current: "ABC".to_string()
            }
        );
        assert!(registry.members_of("XYZ").is_empty());
        assert_eq!(registry.channel_count(), 1);
    }

    #[test]
    fn members_keep_join_order() {
        let registry = ChannelRegistry::new();
        let (a, _ra) = handle();
        let (b, _rb) = handle();
        let (c, _rc) = handle();

        registry.join("XYZ", &a).unwrap();
        assert_eq!(registry.join("XYZ", &b), Ok(JoinOutcome::Joined));
        registry.join("XYZ", &c).unwrap();

        let ids: Vec<_> = registry.members_of("XYZ").iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn last_leave_removes_channel() {
        let registry = ChannelRegistry::new();
        let (a, _ra) = handle();
        let (b, _rb) = handle();

        registry.join("ABC", &a).unwrap();
        registry.join("ABC", &b).unwrap();

        let first = registry.leave(&a).unwrap();
        assert!(!first.channel_removed);
        assert_eq!(registry.channel_count(), 1);

        let second = registry.leave(&b).unwrap();
        assert!(second.channel_removed);
        assert!(registry.is_empty());
        assert_eq!(registry.member_count(), 0);

        assert!(registry.leave(&b).is_none());
    }

    #[test]
    fn callbacks_see_other_members_only() {
        let registry = ChannelRegistry::new();
        let (a, _ra) = handle();
        let (b, _rb) = handle();

        let mut seen = Vec::new();
        registry
            .join_with("ABC", &a, |members| seen.push(members.len()))
            .unwrap();
        registry
            .join_with("ABC", &b, |members| {
                seen.push(members.len());
                assert_eq!(members[0].id(), a.id());
            })
            .unwrap();
        // Idempotent rejoin does not call back.
        registry
            .join_with("ABC", &b, |_| seen.push(99))
            .unwrap();
        assert_eq!(seen, vec![0, 1]);

        let mut remaining = Vec::new();
        registry.leave_with(&a, |code, members| {
            assert_eq!(code, "ABC");
            remaining.extend(members.iter().map(|m| m.id()));
        });
        assert_eq!(remaining, vec![b.id()]);

        let mut called = false;
        registry.leave_with(&b, |_, _| called = true);
        assert!(!called);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(usize, usize),
        Leave(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, 0..3usize).prop_map(|(h, c)| Op::Join(h, c)),
            (0..6usize).prop_map(Op::Leave),
        ]
    }

    proptest! {
        #[test]
        fn registry_invariants_hold_for_any_sequence(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let registry = ChannelRegistry::new();
            let handles: Vec<_> = (0..6).map(|_| handle()).collect();
            let codes = ["A", "B", "C"];

            for op in ops {
                match op {
                    Op::Join(h, c) => {
                        let _ = registry.join(codes[c], &handles[h].0);
                    }
                    Op::Leave(h) => {
                        registry.leave(&handles[h].0);
                    }
                }

                let mut total = 0;
                for code in registry.channel_codes() {
                    let members = registry.members_of(&code);
                    prop_assert!(!members.is_empty(), "empty channel {} persisted", code);
                    for member in &members {
                        prop_assert_eq!(registry.channel_of(&member.id()), Some(code.clone()));
                    }
                    let mut ids: Vec<_> = members.iter().map(|m| m.id()).collect();
                    ids.sort();
                    ids.dedup();
                    prop_assert_eq!(ids.len(), members.len());
                    total += members.len();
                }
                prop_assert_eq!(total, registry.member_count());
            }
        }
    }
}
