//! Per-frame visibility and sorting counters

use std::collections::VecDeque;

use super::bsp::BspStats;

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct FrameStats {
    /// Rooms on the render list
    pub rooms_listed: u32,
    /// Rooms reached but not listed because the list was full
    pub rooms_dropped: u32,
    pub frustums: u32,
    /// Portals that faced away or clipped to nothing
    pub portals_rejected: u32,
    /// Visible portals lost to a full frustum arena
    pub frustums_dropped: u32,
    pub static_meshes_visible: u32,
    pub entities_visible: u32,
    pub bsp: BspStats,
    pub draw_commands: u32,
    pub draw_batches: u32,
}

impl FrameStats {
    /// Anything lost to a capacity limit this frame
    pub fn has_drops(&self) -> bool {
        self.rooms_dropped > 0 || self.frustums_dropped > 0 || self.bsp.dropped > 0
    }
}

/// Rolling window of recent frames
pub struct StatsHistory {
    frames: VecDeque<FrameStats>,
    max_history: usize,
}

impl StatsHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(max_history),
            max_history: max_history.max(1),
        }
    }

    pub fn push(&mut self, stats: FrameStats) {
        if self.frames.len() >= self.max_history {
            self.frames.pop_front();
        }
        self.frames.push_back(stats);
    }

    pub fn latest(&self) -> Option<&FrameStats> {
        self.frames.back()
    }

    /// Mean number of listed rooms over the window
    pub fn average_rooms(&self) -> f32 {
        self.average(|s| s.rooms_listed)
    }

    /// Mean number of transparent polygons drawn over the window
    pub fn average_draw_commands(&self) -> f32 {
        self.average(|s| s.draw_commands)
    }

    fn average(&self, field: impl Fn(&FrameStats) -> u32) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.frames.iter().map(|s| field(s) as u64).sum();
        sum as f32 / self.frames.len() as f32
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_window() {
        let mut history = StatsHistory::new(2);
        for rooms in [2, 4, 6] {
            history.push(FrameStats { rooms_listed: rooms, ..Default::default() });
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().rooms_listed, 6);
        assert!((history.average_rooms() - 5.0).abs() < 1e-6);
        assert_eq!(StatsHistory::new(4).average_draw_commands(), 0.0);
    }

    #[test]
    fn test_drops_and_json() {
        let mut stats = FrameStats::default();
        assert!(!stats.has_drops());
        stats.bsp.dropped = 1;
        assert!(stats.has_drops());

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["bsp"]["dropped"], 1);
        assert_eq!(json["rooms_listed"], 0);
    }
}
