//! Turn scheduler: the cyclic speed-ordered queue of combatants.
//!
//! # Ordering
//!
//! A build takes every living combatant, sorts by speed descending and breaks
//! ties with one random draw per combatant. Tie-breaks are drawn again on
//! every rebuild, so equal-speed combatants may swap places between cycles.
//!
//! # Lifecycle
//!
//! - [`TurnScheduler::next_actor`] pops the head, silently discarding dead
//!   entries. When the queue runs dry it is rebuilt from the combatants that
//!   are alive at that moment.
//! - [`TurnScheduler::requeue`] pushes a living actor to the tail once its
//!   turn is over. Dead actors are dropped.
//!
//! Dead entries are never removed eagerly; they are skipped the next time
//! they reach the head.

use std::collections::VecDeque;

use rand::Rng;

use crate::combatant::{Combatant, CombatantId};

/// Speed-ordered turn queue.
///
/// The scheduler stores ids only; liveness and speed are read from the
/// combatant slice passed to each call, indexed by [`CombatantId::index`].
#[derive(Debug, Clone, Default)]
pub struct TurnScheduler {
    queue: VecDeque<CombatantId>,
    rebuilds: u32,
}

impl TurnScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the queue with all living combatants in speed order.
    pub fn build_initial_order<R: Rng + ?Sized>(&mut self, combatants: &[Combatant], rng: &mut R) {
        let mut keyed: Vec<(CombatantId, u32, u64)> = combatants
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| (c.id(), c.speed(), rng.gen()))
            .collect();

        keyed.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        self.queue = keyed.into_iter().map(|(id, _, _)| id).collect();
        self.rebuilds += 1;

        tracing::debug!(
            rebuild = self.rebuilds,
            order = ?self.queue,
            "turn order built"
        );
    }

    /// Pops the next living actor, rebuilding the queue if it runs dry.
    ///
    /// Returns `None` only if no combatant is alive at all.
    pub fn next_actor<R: Rng + ?Sized>(
        &mut self,
        combatants: &[Combatant],
        rng: &mut R,
    ) -> Option<CombatantId> {
        if let Some(id) = self.pop_living(combatants) {
            return Some(id);
        }
        self.build_initial_order(combatants, rng);
        self.pop_living(combatants)
    }

    /// Returns a living actor to the tail of the queue.
    pub fn requeue(&mut self, actor: CombatantId, combatants: &[Combatant]) {
        if is_alive(combatants, actor) {
            self.queue.push_back(actor);
        } else {
            tracing::trace!(%actor, "dead actor not requeued");
        }
    }

    /// Upcoming actors in queue order. May include not-yet-skipped dead entries.
    pub fn upcoming(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.queue.iter().copied()
    }

    /// Number of queued entries, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no entries are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// How many times the order has been built.
    #[must_use]
    pub const fn rebuild_count(&self) -> u32 {
        self.rebuilds
    }

    fn pop_living(&mut self, combatants: &[Combatant]) -> Option<CombatantId> {
        while let Some(id) = self.queue.pop_front() {
            if is_alive(combatants, id) {
                return Some(id);
            }
            tracing::trace!(%id, "skipping defeated combatant");
        }
        None
    }
}

fn is_alive(combatants: &[Combatant], id: CombatantId) -> bool {
    combatants.get(id.index()).is_some_and(Combatant::is_alive)
}
