//! MPE-style member-channel allocation.
//!
//! In an MPE lower zone one master channel carries zone-wide messages and
//! the member channels each carry a single note with its own pitch bend.
//! The allocator hands out member channels least-recently-freed first so a
//! just-released channel's lingering bend has the longest possible time to
//! become irrelevant before reuse.

use std::collections::VecDeque;

use log::warn;

/// MPE lower-zone shape: master channel plus a block of member channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneLayout {
    /// 0-based channel reserved for zone-wide setup messages.
    pub master_channel: u8,
    /// Number of member channels following the master.
    pub member_count: u8,
    /// Per-note pitch bend range in semitones.
    pub per_note_bend_range: u8,
}

impl ZoneLayout {
    /// A lower zone: master on channel 0, members on 1..=`member_count`,
    /// MPE's default 48-semitone per-note bend range.
    pub fn lower(member_count: u8) -> Self {
        ZoneLayout {
            master_channel: 0,
            member_count: member_count.clamp(1, 15),
            per_note_bend_range: 48,
        }
    }

    /// Override the per-note pitch bend range.
    pub fn with_bend_range(mut self, semitones: u8) -> Self {
        self.per_note_bend_range = semitones;
        self
    }

    /// The member channels, excluding the master.
    pub fn member_channels(&self) -> std::ops::RangeInclusive<u8> {
        1..=self.member_count
    }
}

impl Default for ZoneLayout {
    fn default() -> Self {
        ZoneLayout::lower(15)
    }
}

/// Tracks which member channels are free and hands them out
/// least-recently-freed first.
#[derive(Clone, Debug)]
pub struct ChannelAllocator {
    layout: ZoneLayout,
    free: VecDeque<u8>,
    in_use: VecDeque<u8>,
}

impl ChannelAllocator {
    /// A fully free pool for the given zone.
    pub fn new(layout: ZoneLayout) -> Self {
        ChannelAllocator {
            layout,
            free: layout.member_channels().collect(),
            in_use: VecDeque::new(),
        }
    }

    /// The zone this pool serves.
    pub fn layout(&self) -> &ZoneLayout {
        &self.layout
    }

    /// Take a member channel. When the pool is exhausted the longest-held
    /// channel is reused; the new note then shares it.
    pub fn allocate(&mut self) -> u8 {
        if let Some(channel) = self.free.pop_front() {
            self.in_use.push_back(channel);
            return channel;
        }
        let channel = self
            .in_use
            .pop_front()
            .expect("zone has at least one member channel");
        self.in_use.push_back(channel);
        warn!("member channels exhausted, reusing channel {channel}");
        channel
    }

    /// Return a channel to the back of the free queue. Releasing a channel
    /// that is not held is a no-op.
    pub fn release(&mut self, channel: u8) {
        if let Some(position) = self.in_use.iter().position(|&c| c == channel) {
            self.in_use.remove(position);
            self.free.push_back(channel);
        }
    }

    /// Make every member channel available again.
    pub fn reset(&mut self) {
        self.free = self.layout.member_channels().collect();
        self.in_use.clear();
    }
}
