use std::{collections::BTreeSet, ops::Range};

use crate::message::{GroupDrop, Order};

/// Pending groups for a single subscription, released according to the negotiated [Order].
///
/// Groups arrive in any order; [GroupQueue::pop] decides which one is presented next.
#[derive(Debug)]
pub struct GroupQueue<T> {
	order: Order,

	// In arrival order, so [Order::Any] is just a FIFO.
	pending: Vec<(u64, T)>,

	// The sequence of the last group that was popped.
	popped: Option<u64>,

	// Ranges marked as permanently absent by a GroupDrop.
	dropped: Vec<Range<u64>>,

	// Every sequence that arrived, even if it wasn't queued.
	arrived: BTreeSet<u64>,
}

impl<T> GroupQueue<T> {
	pub fn new(order: Order) -> Self {
		Self {
			order,
			pending: Vec::new(),
			popped: None,
			dropped: Vec::new(),
			arrived: BTreeSet::new(),
		}
	}

	pub fn order(&self) -> Order {
		self.order
	}

	/// Change the order, which applies to every group still pending.
	pub fn set_order(&mut self, order: Order) {
		self.order = order;
	}

	/// Queue a group, returning it back if it was rejected.
	///
	/// A group is rejected if it was dropped, is already pending, or (when ascending) is not newer than the last popped group.
	pub fn push(&mut self, sequence: u64, group: T) -> Result<(), T> {
		self.arrived.insert(sequence);

		if self.is_dropped(sequence) {
			return Err(group);
		}

		if self.order == Order::Ascending && self.popped.is_some_and(|popped| sequence <= popped) {
			return Err(group);
		}

		if self.pending.iter().any(|(pending, _)| *pending == sequence) {
			return Err(group);
		}

		self.pending.push((sequence, group));
		Ok(())
	}

	/// Remove the next group to present.
	pub fn pop(&mut self) -> Option<(u64, T)> {
		let index = match self.order {
			Order::Any => 0,
			Order::Ascending => self.position(|a, b| a < b)?,
			Order::Descending => self.position(|a, b| a > b)?,
		};

		if index >= self.pending.len() {
			return None;
		}

		let (sequence, group) = self.pending.remove(index);
		self.popped = Some(sequence);

		Some((sequence, group))
	}

	// The index of the sequence that wins every comparison.
	fn position(&self, better: impl Fn(u64, u64) -> bool) -> Option<usize> {
		let mut best: Option<(usize, u64)> = None;

		for (index, (sequence, _)) in self.pending.iter().enumerate() {
			match best {
				Some((_, current)) if !better(*sequence, current) => {}
				_ => best = Some((index, *sequence)),
			}
		}

		best.map(|(index, _)| index)
	}

	/// Mark the range as absent, discarding any pending groups within it.
	///
	/// Returns the number of pending groups that were discarded.
	pub fn drop_range(&mut self, drop: &GroupDrop) -> usize {
		let range = drop.sequence..drop.end();
		if range.is_empty() {
			return 0;
		}

		let before = self.pending.len();
		self.pending.retain(|(sequence, _)| !range.contains(sequence));
		self.dropped.push(range);

		before - self.pending.len()
	}

	pub fn is_dropped(&self, sequence: u64) -> bool {
		self.dropped.iter().any(|range| range.contains(&sequence))
	}

	/// Returns true if every sequence in the range arrived or was dropped.
	///
	/// When ascending, anything at or before the last popped group counts as arrived, as it would be stale anyway.
	pub fn is_complete(&self, range: Range<u64>) -> bool {
		let mut sequence = range.start;
		if self.order == Order::Ascending {
			if let Some(popped) = self.popped {
				sequence = sequence.max(popped.saturating_add(1));
			}
		}

		while sequence < range.end {
			if let Some(dropped) = self.dropped.iter().find(|dropped| dropped.contains(&sequence)) {
				sequence = dropped.end;
			} else if self.arrived.contains(&sequence) {
				sequence += 1;
			} else {
				return false;
			}
		}

		true
	}

	/// Discard every pending group.
	pub fn clear(&mut self) {
		self.pending.clear();
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}
