// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time-ordered merge of pending chunks and already-decoded messages.
//!
//! The seeking reader doesn't decompress every chunk up front: it seeds the
//! queue with one entry per candidate [`ChunkIndex`], then as each chunk is
//! popped and decompressed, the messages inside it are pushed back in as
//! individual entries. A min-heap over a single ordering key keeps both
//! kinds of entry merged into one time-ordered stream.
//!
//! Ordering: primary key is the timestamp (`log_time` for a message;
//! `message_start_time`, or `message_end_time` when iterating in reverse,
//! for a pending chunk). Ties break on `chunk_start_offset` — the file
//! position the entry's chunk begins at — and, between two messages from
//! the same chunk, on `message_offset_in_chunk` (the order they were
//! written to that chunk's message index). With `log_time_order` off, no
//! reordering happens at all: entries come out FIFO, in push order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::records::{Channel, ChunkIndex, Message, Schema};

/// One thing waiting to be handed back to the caller: either a chunk that
/// still needs to be fetched and decompressed, or a message already
/// decoded from a chunk (or read loose from the data section).
#[derive(Debug, Clone)]
pub enum QueueItem {
    PendingChunk(ChunkIndex),
    Message {
        schema: Option<Schema>,
        channel: Channel,
        message: Message,
        /// File offset of the chunk this message came from (0 for a
        /// message read outside of any chunk).
        chunk_start_offset: u64,
        /// Position of this message within its chunk's message index,
        /// used only to break ties against other messages from the same
        /// chunk sharing a `log_time`.
        message_offset_in_chunk: u64,
    },
}

impl QueueItem {
    fn primary_time(&self, reverse: bool) -> u64 {
        match self {
            QueueItem::PendingChunk(idx) => {
                if reverse {
                    idx.message_end_time
                } else {
                    idx.message_start_time
                }
            }
            QueueItem::Message { message, .. } => message.log_time,
        }
    }

    fn chunk_start_offset(&self, reverse: bool) -> u64 {
        match self {
            QueueItem::PendingChunk(idx) => {
                if reverse {
                    idx.chunk_start_offset + idx.chunk_length
                } else {
                    idx.chunk_start_offset
                }
            }
            QueueItem::Message {
                chunk_start_offset, ..
            } => *chunk_start_offset,
        }
    }

    fn message_offset(&self) -> u64 {
        match self {
            QueueItem::PendingChunk(_) => 0,
            QueueItem::Message {
                message_offset_in_chunk,
                ..
            } => *message_offset_in_chunk,
        }
    }
}

struct Entry {
    item: QueueItem,
    reverse: bool,
}

impl Entry {
    fn key(&self) -> (u64, u64, u64) {
        (
            self.item.primary_time(self.reverse),
            self.item.chunk_start_offset(self.reverse),
            self.item.message_offset(),
        )
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the comparison so `pop()`
        // yields the smallest key (earliest time) first. When iterating
        // in reverse-chronological order, flip again so `pop()` yields
        // the largest key (latest time) first.
        let ord = other.key().cmp(&self.key());
        if self.reverse {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// A merge queue over [`QueueItem`]s. In `log_time_order` mode it behaves
/// as a time-ordered min-heap (or max-heap, when `reverse` is set);
/// otherwise it degrades to a plain FIFO queue in push order.
pub struct MergeQueue {
    log_time_order: bool,
    reverse: bool,
    heap: BinaryHeap<Entry>,
    fifo: VecDeque<QueueItem>,
}

impl MergeQueue {
    pub fn new(log_time_order: bool, reverse: bool) -> Self {
        Self {
            log_time_order,
            reverse,
            heap: BinaryHeap::new(),
            fifo: VecDeque::new(),
        }
    }

    pub fn push(&mut self, item: QueueItem) {
        if self.log_time_order {
            self.heap.push(Entry {
                item,
                reverse: self.reverse,
            });
        } else {
            self.fifo.push_back(item);
        }
    }

    pub fn pop(&mut self) -> Option<QueueItem> {
        if self.log_time_order {
            self.heap.pop().map(|e| e.item)
        } else {
            self.fifo.pop_front()
        }
    }

    pub fn is_empty(&self) -> bool {
        if self.log_time_order {
            self.heap.is_empty()
        } else {
            self.fifo.is_empty()
        }
    }

    pub fn len(&self) -> usize {
        if self.log_time_order {
            self.heap.len()
        } else {
            self.fifo.len()
        }
    }
}
